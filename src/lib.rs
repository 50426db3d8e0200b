pub mod nbt;
pub mod world;
pub mod ioext;
pub mod data;
pub mod error;
pub mod math;
pub mod macros;
pub mod util;
pub mod compression;

pub use flate2;

pub use error::McError;
pub use error::McResult;
