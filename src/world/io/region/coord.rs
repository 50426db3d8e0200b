use std::{
	fmt::Display,
	io::SeekFrom,
	path::Path,
};

use crate::for_each_int_type;

/// A region file contains up to 1024 chunks, which is 32x32 chunks.
/// This struct represents a chunk coordinate within a region file.
/// The coordinate can be an absolute coordinate and it will be
/// normalized to relative coordinates.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct RegionCoord(u16);

impl RegionCoord {
	/// Create a new RegionCoord.
	/// The x and z will be mathematically transformed into relative coordinates.
	/// So if the coordinate given to `new()` is `(32, 32)`, the result will be
	/// `(0, 0)`.
	pub fn new(x: u16, z: u16) -> Self {
		Self((x & 31) | ((z & 31) << 5))
	}

	/// Takes absolute chunk coordinates, which may be negative.
	pub fn from_chunk(x: i32, z: i32) -> Self {
		Self::new(x as u16, z as u16)
	}

	pub fn index(&self) -> usize {
		self.0 as usize
	}

	pub fn x(&self) -> i32 {
		(self.0 & 31) as i32
	}

	pub fn z(&self) -> i32 {
		((self.0 >> 5) & 31) as i32
	}

	/// Every coordinate in a region, in table order.
	pub fn all() -> impl Iterator<Item = RegionCoord> {
		(0..1024u16).map(RegionCoord)
	}

	/// Get a [SeekFrom] value that can be used to seek to the location where
	/// this chunk's sector offset is stored in the sector offset table.
	pub fn sector_table_offset(&self) -> SeekFrom {
		SeekFrom::Start(self.0 as u64 * 4)
	}

	/// Get a [SeekFrom] value that can be used to seek to the location where
	/// this chunk's timestamp is stored in the timestamp table.
	pub fn timestamp_table_offset(&self) -> SeekFrom {
		SeekFrom::Start(self.0 as u64 * 4 + 4096)
	}
}

macro_rules! __regioncoord_impl {
	($type:ty) => {
		impl From<($type, $type)> for RegionCoord {
			fn from(value: ($type, $type)) -> Self {
				Self::new(value.0 as u16, value.1 as u16)
			}
		}

		impl From<$type> for RegionCoord {
			fn from(value: $type) -> Self {
				Self((value as u16) & 1023)
			}
		}
	};
}

for_each_int_type!(__regioncoord_impl);

impl Display for RegionCoord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "({}, {})", self.x(), self.z())
	}
}

/// The position of a region in region coordinates. Region `(x, z)`
/// holds chunks `x*32..x*32+32` by `z*32..z*32+32` and is stored in
/// the file `r.{x}.{z}.mca`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct RegionPosition {
	pub x: i32,
	pub z: i32,
}

impl RegionPosition {
	pub const fn new(x: i32, z: i32) -> Self {
		Self { x, z }
	}

	/// The region that contains the chunk at `(x, z)`.
	pub const fn from_chunk(x: i32, z: i32) -> Self {
		Self::new(x >> 5, z >> 5)
	}

	/// The range of region coordinates whose chunks fit in an `i32`.
	pub const MIN: i32 = i32::MIN >> 5;
	pub const MAX: i32 = i32::MAX >> 5;

	/// Whether every chunk of this region has coordinates that fit in
	/// an `i32`.
	pub const fn in_range(&self) -> bool {
		self.x >= Self::MIN && self.x <= Self::MAX
		&& self.z >= Self::MIN && self.z <= Self::MAX
	}

	/// The absolute coordinates of a chunk in this region. The shift
	/// leaves the low bits clear, so this never overflows for regions
	/// that are [in range](RegionPosition::in_range).
	pub fn chunk(&self, coord: RegionCoord) -> (i32, i32) {
		((self.x << 5) | coord.x(), (self.z << 5) | coord.z())
	}

	pub fn file_name(&self) -> String {
		format!("r.{}.{}.mca", self.x, self.z)
	}

	/// Parses names of the form `r.{x}.{z}.mca`. Positions that are not
	/// [in range](RegionPosition::in_range) are rejected.
	pub fn from_file_name(name: &str) -> Option<Self> {
		let mut parts = name
			.strip_prefix("r.")?
			.strip_suffix(".mca")?
			.split('.');
		let x = parts.next()?.parse().ok()?;
		let z = parts.next()?.parse().ok()?;
		if parts.next().is_some() {
			return None;
		}
		let position = Self::new(x, z);
		position.in_range().then_some(position)
	}

	pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
		Self::from_file_name(path.as_ref().file_name()?.to_str()?)
	}
}

impl Display for RegionPosition {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.file_name())
	}
}
