use std::path::PathBuf;

use thiserror::Error;

use crate::nbt::{
	NbtError,
	tagpath::{TagPath, TagPathError},
};
use crate::world::io::region::coord::RegionPosition;

/// The master error type.
#[derive(Debug, Error)]
pub enum McError {
	#[error("{0}")]
	Custom(String),
	#[error("IO Error: {0}")]
	IoError(#[from] std::io::Error),
	#[error("NBT Error: {0}")]
	Nbt(#[from] NbtError),
	#[error("Tag path error: {0}")]
	TagPath(#[from] TagPathError),
	#[error("Invalid Compression value: {0}")]
	InvalidCompressionScheme(u8),
	#[error("Compression failed: {0}")]
	Compress(#[from] flate2::CompressError),
	#[error("Decompression failed: {0}")]
	Decompress(#[from] flate2::DecompressError),
	#[error("Compressed stream ended before it was complete.")]
	TruncatedStream,
	#[error("Decompressed data exceeded the limit of {0} bytes.")]
	DecompressedTooLarge(usize),
	#[error("Bit width {0} is outside of the range 1..=32.")]
	InvalidBitWidth(u32),
	#[error("Buffer of {actual} words is too small, {required} words are required.")]
	BufferTooSmall {
		required: usize,
		actual: usize,
	},
	#[error("Index {index} is out of bounds for length {len}.")]
	IndexOutOfBounds {
		index: usize,
		len: usize,
	},
	#[error("Value {value} does not fit in {bits} bits.")]
	ValueOutOfRange {
		value: u32,
		bits: u32,
	},
	#[error("Region {region}, chunk {index}: {kind}")]
	RegionCorruption {
		region: RegionPosition,
		index: usize,
		kind: CorruptionKind,
	},
	#[error("Region file is too small to contain a header.")]
	InvalidRegionFile,
	#[error("Attempted to write chunk data that takes up more that 255 4KiB blocks.")]
	ChunkTooLarge,
	#[error("Failed to allocate RegionSector.")]
	RegionAllocationFailure,
	#[error("No codec is registered for version {0} or earlier.")]
	UnresolvableVersion(String),
	#[error("Two codecs were registered for version {0}.")]
	DuplicateCodec(String),
	#[error("Failed to decode `{path}` (data version {version}): {reason}")]
	Decode {
		version: i32,
		path: TagPath,
		reason: String,
	},
	#[error("Unsupported operation: {0}")]
	Unsupported(&'static str),
	#[error("All {0} values of the pool are in use.")]
	PoolExhausted(usize),
	#[error("Task was cancelled before it started.")]
	Cancelled,
	#[error("Task panicked: {0}")]
	TaskPanicked(String),
	#[error("The task result was already taken.")]
	ResultTaken,
	#[error("World Directory not found. {0}")]
	WorldDirectoryNotFound(PathBuf),
}

/// The ways that a region file entry can be broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CorruptionKind {
	#[error("sector offset {0} points into the header")]
	OverlapsHeader(u64),
	#[error("sector {offset} is past the end of the file ({file_len} bytes)")]
	PastEndOfFile {
		offset: u64,
		file_len: u64,
	},
	#[error("sector entry has a size of zero")]
	ZeroSectorCount,
	#[error("chunk has a length of zero")]
	ZeroLength,
	#[error("chunk length {length} does not fit in {sectors} sectors")]
	LengthExceedsSectors {
		length: u32,
		sectors: u64,
	},
	#[error("chunk data is cut off by the end of the file")]
	Truncated,
	#[error("unknown compression scheme {0}")]
	UnknownCompression(u8),
	#[error("sectors overlap with chunk {0}")]
	Overlapping(usize),
}

impl McError {
	pub fn range_check<T, R>(value: T, range: R) -> Result<(),McError>
	where
	T: PartialOrd + Sized + std::fmt::Debug,
	R: std::ops::RangeBounds<T> + std::fmt::Debug {
		if range.contains(&value) {
			Ok(())
		} else {
			Err(McError::Custom(format!("{value:?} is not in the range {range:?}")))
		}
	}

	#[inline(always)]
	pub fn custom<T, S: AsRef<str>>(msg: S) -> Result<T,Self> {
		Err(McError::Custom(msg.as_ref().to_owned()))
	}

	/// True for errors that describe damaged data rather than a failed operation.
	/// Callers use this to decide between skipping a chunk and aborting.
	pub fn is_corruption(&self) -> bool {
		matches!(self,
			McError::RegionCorruption { .. }
			| McError::InvalidRegionFile
			| McError::Nbt(_)
			| McError::Decompress(_)
			| McError::TruncatedStream
			| McError::DecompressedTooLarge(_)
			| McError::Decode { .. }
		)
	}
}

pub type McResult<T> = Result<T,McError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn range_check_test() {
		assert!(McError::range_check(5, 1..=32).is_ok());
		assert!(McError::range_check(33, 1..=32).is_err());
	}

	#[test]
	fn corruption_classification() {
		let err = McError::RegionCorruption {
			region: RegionPosition::new(0, -1),
			index: 3,
			kind: CorruptionKind::ZeroLength,
		};
		assert!(err.is_corruption());
		assert_eq!(err.to_string(), "Region r.0.-1.mca, chunk 3: chunk has a length of zero");
		assert!(!McError::Unsupported("writing").is_corruption());
	}
}
