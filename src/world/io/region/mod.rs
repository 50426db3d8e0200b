//! The Anvil region container.
//!
//! A region file stores up to 32x32 chunks. It begins with an 8KiB
//! header: 1024 four-byte sector entries (a 24-bit offset and an 8-bit
//! count, both in 4KiB sectors) followed by 1024 four-byte timestamps.
//! Each chunk blob starts on a sector boundary with a u32 length, a
//! compression scheme byte, then the compressed payload.

pub mod header;
pub mod sector;
pub mod timestamp;
pub mod coord;
pub mod info;
pub mod compressionscheme;
pub mod managedsector;
pub mod sectormanager;
pub mod regionfile;
pub mod cache;

pub mod prelude {
	pub use super::{
		header::*,
		sector::*,
		timestamp::*,
		coord::*,
		info::*,
		compressionscheme::*,
		managedsector::*,
		sectormanager::*,
		regionfile::*,
		cache::*,
	};
}

/// Size in bytes of the header at the start of every region file.
pub const HEADER_SIZE: u64 = 4096 * 2;

/// Tests if a value is a multiple of 4096.
pub const fn is_multiple_of_4096(n: u64) -> bool {
	(n & 4095) == 0
}

/// Counts the number of 4KiB sectors required to accomodate `size` bytes.
pub const fn required_sectors(size: u64) -> u64 {
	(size >> 12) + !is_multiple_of_4096(size) as u64
}

/// Returns the 4KiB pad size for the given size.
/// The pad size is the number of bytes required
/// to add to the size in order to make it a
/// multiple of 4096.
pub const fn pad_size(size: u64) -> u64 {
	(4096 - (size & 4095)) & 4095
}
