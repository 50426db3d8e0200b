use crate::{
	ioext::*,
	McResult,
	math::bit::{GetBit, SetBit},
};
use super::{
	header::*,
	coord::*,
	sector::*,
	timestamp::*,
	is_multiple_of_4096,
};
use std::{
	path::{PathBuf, Path},
	fs::{
		Metadata,
		File,
	},
	io::{
		BufReader, Seek,
	},
};

/// This is a bitmask containing 1024 bits, one for each chunk in a region.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionBitmask(Box<[u32; 32]>);

/// Info about a region file gathered without decompressing anything:
/// the file metadata, the header, and which chunks are present.
pub struct RegionFileInfo {
	/// The path to the region file.
	pub path: PathBuf,
	/// Metadata information about the region file.
	pub metadata: Metadata,
	/// The region file's header.
	pub header: RegionHeader,
	/// The bitmask that describes which chunks are present in the file.
	pub present_bits: RegionBitmask,
}

impl RegionFileInfo {
	/// Reads the header of the region file at `path`. A chunk counts as
	/// present when its entry points inside the file and its blob has
	/// a non-zero length.
	pub fn load<P: AsRef<Path>>(path: P) -> McResult<Self> {
		let file = File::open(path.as_ref())?;
		let metadata = file.metadata()?;
		let file_len = metadata.len();
		let mut reader = BufReader::with_capacity(4096*2, file);
		let header = RegionHeader::read_from(&mut reader)?;
		let mut bits = RegionBitmask::new();
		for coord in RegionCoord::all() {
			let sector = header.sectors[coord];
			crate::continue_if!(sector.is_empty() || sector.check(file_len).is_err());
			reader.seek(sector.seeker())?;
			let length = u32::read_from(&mut reader)?;
			if length != 0 {
				bits.set(coord, true);
			}
		}
		Ok(Self {
			path: PathBuf::from(path.as_ref()),
			metadata,
			header,
			present_bits: bits,
		})
	}

	/// The path that this RegionFileInfo points to.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// The region position parsed from the file name.
	pub fn position(&self) -> Option<RegionPosition> {
		RegionPosition::from_path(&self.path)
	}

	/// Get a RegionSector for the provided coordinate.
	pub fn get_offset<C: Into<RegionCoord>>(&self, coord: C) -> RegionSector {
		self.header.sectors[coord]
	}

	/// Get the Timestamp for the provided coordinate.
	pub fn get_timestamp<C: Into<RegionCoord>>(&self, coord: C) -> Timestamp {
		self.header.timestamps[coord]
	}

	/// Checks if the chunk exists in the region file.
	pub fn has_chunk<C: Into<RegionCoord>>(&self, coord: C) -> bool {
		self.present_bits.get(coord)
	}

	pub fn chunk_count(&self) -> usize {
		self.present_bits.count()
	}

	/// Coordinates of the chunks that are present, in table order.
	pub fn chunks(&self) -> impl Iterator<Item = RegionCoord> + '_ {
		RegionCoord::all().filter(|&coord| self.present_bits.get(coord))
	}

	/// The last modification time of this file.
	pub fn modified_time(&self) -> std::io::Result<std::time::SystemTime> {
		self.metadata.modified()
	}

	/// Returns the size of the region file.
	pub fn size(&self) -> u64 {
		self.metadata.len()
	}

	/// Returns true if the region file has a size
	/// that is a multiple of 4KiB. Minecraft will
	/// consider the region to be corrupted
	/// otherwise.
	pub fn is_correct_size_multiple(&self) -> bool {
		is_multiple_of_4096(self.size())
	}
}

impl RegionBitmask {
	/// Creates a new bitmask with all bits set to off.
	pub fn new() -> Self {
		Self(Box::new([0; 32]))
	}

	pub fn get<C: Into<RegionCoord>>(&self, coord: C) -> bool {
		let index = coord.into().index();
		self.0[index / 32].get_bit(index % 32)
	}

	pub fn set<C: Into<RegionCoord>>(&mut self, coord: C, on: bool) {
		let index = coord.into().index();
		self.0[index / 32] = self.0[index / 32].set_bit(index % 32, on);
	}

	/// The number of bits that are on.
	pub fn count(&self) -> usize {
		self.0.iter()
			.map(|bits| bits.count_ones() as usize)
			.sum()
	}

	/// Clear all bits (Setting them to 0).
	pub fn clear(&mut self) {
		self.0.fill(0);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::world::io::region::{
		compressionscheme::CompressionScheme,
		regionfile::{RawChunk, RegionFile},
	};

	#[test]
	fn bitmask() {
		let mut mask = RegionBitmask::new();
		mask.set((31u16, 31u16), true);
		mask.set(33u16, true);
		assert!(mask.get(1023u16));
		assert!(mask.get((1u16, 1u16)));
		assert_eq!(mask.count(), 2);
		mask.clear();
		assert_eq!(mask.count(), 0);
	}

	#[test]
	fn info_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("r.3.-4.mca");
		{
			let mut region = RegionFile::open(&path).unwrap();
			let chunk = RawChunk::new(CompressionScheme::ZLib, vec![5; 64]);
			region.write((4u16, 2u16), &chunk).unwrap();
			region.write((0u16, 9u16), &chunk).unwrap();
		}
		let info = RegionFileInfo::load(&path).unwrap();
		assert_eq!(info.position(), Some(RegionPosition::new(3, -4)));
		assert!(info.has_chunk((4u16, 2u16)));
		assert!(!info.has_chunk((2u16, 4u16)));
		assert_eq!(info.chunk_count(), 2);
		assert_eq!(info.chunks().count(), 2);
		assert!(info.is_correct_size_multiple());
		assert!(info.get_timestamp((0u16, 9u16)).to_datetime().is_some());
	}
}
