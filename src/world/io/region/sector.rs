use std::{
	io::{
		Read, Write,
		SeekFrom,
	},
	ops::Range,
};

use crate::{
	ioext::*,
	McResult,
	error::CorruptionKind,
};

use super::{HEADER_SIZE, required_sectors};

/// Offset and size are packed together, which is also how they are
/// stored in the region header.
/// |Offset:3|Size:1|
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct RegionSector(u32);

impl RegionSector {
	/// The largest number of 4KiB sectors a single chunk can use.
	pub const MAX_COUNT: u64 = 255;
	/// The largest sector offset that fits in 24 bits.
	pub const MAX_OFFSET: u64 = 0xFF_FFFF;

	/// Provide offset and size in 4KiB chunks.
	pub fn new(offset: u32, size: u8) -> Self {
		Self((offset << 8) | size as u32)
	}

	/// Creates a new empty RegionSector.
	pub const fn empty() -> Self {
		Self(0)
	}

	/// The 4KiB sector offset.
	/// Multiply this by `4096` to get the seek offset.
	pub fn sector_offset(&self) -> u64 {
		(self.0 >> 8) as u64
	}

	/// The 4KiB sector offset that marks the end of this sector and the start of
	/// the next.
	pub fn sector_end_offset(&self) -> u64 {
		self.sector_offset() + self.sector_count()
	}

	/// The 4KiB sector count.
	pub fn sector_count(&self) -> u64 {
		(self.0 & 0xFF) as u64
	}

	/// The offset in bytes that this sector begins
	/// at in the region file.
	pub fn offset(&self) -> u64 {
		self.sector_offset() * 4096
	}

	/// The offset in bytes that this sector ends at in the region file.
	pub fn end_offset(&self) -> u64 {
		self.sector_end_offset() * 4096
	}

	/// The size in bytes that this sector occupies.
	pub fn size(&self) -> u64 {
		self.sector_count() * 4096
	}

	/// Determines if this is an "empty" sector, meaning that no chunk
	/// is stored for its slot.
	pub fn is_empty(&self) -> bool {
		self.0 == 0
	}

	/// Tests if two sectors intersect.
	pub fn intersects(self, rhs: Self) -> bool {
		self.sector_offset() < rhs.sector_end_offset()
		&& rhs.sector_offset() < self.sector_end_offset()
	}

	/// Checks that a non-empty entry can be read from a file of
	/// `file_len` bytes.
	pub fn check(&self, file_len: u64) -> Result<(), CorruptionKind> {
		if self.offset() < HEADER_SIZE {
			Err(CorruptionKind::OverlapsHeader(self.sector_offset()))
		} else if self.sector_count() == 0 {
			Err(CorruptionKind::ZeroSectorCount)
		} else if self.offset() + 5 > file_len {
			Err(CorruptionKind::PastEndOfFile { offset: self.sector_offset(), file_len })
		} else {
			Ok(())
		}
	}

	/// The number of sectors needed for a blob of `size` bytes, if it
	/// fits in a single entry.
	pub fn count_for(size: u64) -> Option<u8> {
		let count = required_sectors(size);
		(count <= Self::MAX_COUNT).then_some(count as u8)
	}

	/// Splits off `sector_count` sectors from the start of this sector.
	/// The left side is the requested size, the right side is the remainder.
	pub fn split_left(&self, sector_count: u8) -> Option<(Self, Self)> {
		if (sector_count as u64) <= self.sector_count() {
			let lhs_start = self.sector_offset() as u32;
			let rhs_count = (self.sector_count() as u8) - sector_count;
			Some((
				RegionSector::new(lhs_start, sector_count),
				RegionSector::new(lhs_start + sector_count as u32, rhs_count),
			))
		} else {
			None
		}
	}
}

impl From<Range<u32>> for RegionSector {
	fn from(value: Range<u32>) -> Self {
		RegionSector::new(value.start, (value.end - value.start) as u8)
	}
}

impl Readable for RegionSector {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(Self(reader.read_value()?))
	}
}

impl Writable for RegionSector {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_value(self.0)
	}
}

impl Seekable for RegionSector {
	/// A [SeekFrom] that points to this [RegionSector]
	fn seeker(&self) -> SeekFrom {
		SeekFrom::Start(self.offset())
	}
}
