pub mod bitarray;
