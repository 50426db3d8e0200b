pub mod pool;
pub mod task;
