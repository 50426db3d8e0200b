//! Chunks, their stored layouts, and the storage that reads and writes
//! them.

pub mod io;
pub mod version;
pub mod blockstate;
pub mod chunk;
pub mod fixer;
pub mod codec;
pub mod storage;
pub mod save;
pub mod scanner;
