use std::{
	fs::File,
	io::{
		BufReader,
		ErrorKind,
		Read, Write,
		Seek,
	},
	path::{
		Path, PathBuf,
	},
};

use crate::{
	McResult, McError,
	compression::Compressor,
	error::CorruptionKind,
	ioext::*,
};

use super::{
	HEADER_SIZE,
	pad_size,
	timestamp::*,
	sector::*,
	coord::*,
	sectormanager::*,
	header::*,
	compressionscheme::CompressionScheme,
};

/// A chunk blob as it is stored in a region file: the compression
/// scheme byte and the compressed payload without the sector padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
	pub scheme: CompressionScheme,
	pub payload: Vec<u8>,
}

impl RawChunk {
	pub fn new(scheme: CompressionScheme, payload: Vec<u8>) -> Self {
		Self {
			scheme,
			payload,
		}
	}

	/// Compresses `data` with `scheme`.
	pub fn compress(compressor: &Compressor, scheme: CompressionScheme, data: &[u8]) -> McResult<Self> {
		Ok(Self::new(scheme, compressor.compress(scheme, data)?))
	}

	pub fn decompress(&self, compressor: &Compressor, max_size: usize) -> McResult<Vec<u8>> {
		compressor.decompress(self.scheme, &self.payload, max_size)
	}
}

/// A construct for working with RegionFiles.
/// Allows for reading and writing data from a RegionFile.
pub struct RegionFile {
	position: RegionPosition,
	path: PathBuf,
	header: RegionHeader,
	sector_manager: SectorManager,
	/// This file handle is for both reading and writing.
	file_handle: File,
	file_len: u64,
	writable: bool,
	/// The whole blob (prefix, payload and padding) is assembled here
	/// first so that it can be written with a single call.
	write_buf: Vec<u8>,
}

impl RegionFile {
	/// Opens the region file at `path` for reading and writing. A missing
	/// or empty file is created with an empty header.
	pub fn open<P: AsRef<Path>>(path: P) -> McResult<Self> {
		let path = path.as_ref();
		let file_handle = File::options().write(true).read(true).create(true).open(path)?;
		Self::from_handle(path, file_handle, true)
	}

	/// Opens an existing region file without write access.
	pub fn open_read_only<P: AsRef<Path>>(path: P) -> McResult<Self> {
		let path = path.as_ref();
		let file_handle = File::open(path)?;
		Self::from_handle(path, file_handle, false)
	}

	fn from_handle(path: &Path, mut file_handle: File, writable: bool) -> McResult<Self> {
		// Files with a name that doesn't follow the r.x.z.mca pattern can
		// still be opened, they are reported as region 0, 0.
		let position = RegionPosition::from_path(path).unwrap_or_default();
		let mut file_len = file_handle.metadata()?.len();
		let header = if file_len == 0 {
			if writable {
				file_handle.write_zeroes(HEADER_SIZE)?;
				file_handle.flush()?;
				file_len = HEADER_SIZE;
			}
			RegionHeader::default()
		} else if file_len < HEADER_SIZE {
			return Err(McError::InvalidRegionFile);
		} else {
			let mut reader = BufReader::with_capacity(HEADER_SIZE as usize, (&mut file_handle).take(HEADER_SIZE));
			RegionHeader::read_from(&mut reader)?
		};
		// Broken entries still claim their sectors, so nothing new is
		// written where a damaged entry points.
		let sector_manager = SectorManager::from_used(header.sectors.iter().copied());
		log::debug!("Opened region {position} ({file_len} bytes, writable: {writable})");
		Ok(Self {
			position,
			path: path.to_owned(),
			header,
			sector_manager,
			file_handle,
			file_len,
			writable,
			write_buf: Vec::with_capacity(4096 * 2),
		})
	}

	pub fn position(&self) -> RegionPosition {
		self.position
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	pub fn header(&self) -> &RegionHeader {
		&self.header
	}

	pub fn sector_manager(&self) -> &SectorManager {
		&self.sector_manager
	}

	pub fn is_writable(&self) -> bool {
		self.writable
	}

	/// The length of the file in bytes.
	pub fn file_len(&self) -> u64 {
		self.file_len
	}

	pub fn sector<C: Into<RegionCoord>>(&self, coord: C) -> RegionSector {
		self.header.sectors[coord]
	}

	pub fn timestamp<C: Into<RegionCoord>>(&self, coord: C) -> Timestamp {
		self.header.timestamps[coord]
	}

	/// True if the header has an entry for `coord`. The entry may still
	/// turn out to be corrupt when it is read.
	pub fn contains<C: Into<RegionCoord>>(&self, coord: C) -> bool {
		!self.header.sectors[coord].is_empty()
	}

	/// All coordinates with a header entry.
	pub fn present(&self) -> Vec<RegionCoord> {
		self.header.present().collect()
	}

	fn corruption(&self, coord: RegionCoord, kind: CorruptionKind) -> McError {
		McError::RegionCorruption {
			region: self.position,
			index: coord.index(),
			kind,
		}
	}

	/// Whether the span of the entry at `coord` may be rewritten in place
	/// or freed. Broken spans and spans shared with another entry stay
	/// claimed, so they are never handed out again.
	fn is_reusable(&self, coord: RegionCoord, sector: RegionSector) -> bool {
		if sector.is_empty() || sector.check(self.file_len).is_err() {
			return false;
		}
		let shared = RegionCoord::all()
			.filter(|&other| other != coord)
			.any(|other| self.header.sectors[other].intersects(sector));
		if shared {
			log::warn!("Region {}: chunk {} shares sectors with another chunk", self.position, coord);
		}
		!shared
	}

	/// Seeks to the blob for `coord` and reads the length and scheme.
	/// Returns the payload length (without the scheme byte).
	fn read_prefix(&mut self, coord: RegionCoord) -> McResult<Option<(u64, CompressionScheme)>> {
		let sector = self.header.sectors[coord];
		if sector.is_empty() {
			return Ok(None);
		}
		sector.check(self.file_len).map_err(|kind| self.corruption(coord, kind))?;
		self.file_handle.seek_to(&sector)?;
		let length: u32 = self.file_handle.read_value()?;
		let scheme: u8 = self.file_handle.read_value()?;
		if length == 0 {
			return Err(self.corruption(coord, CorruptionKind::ZeroLength));
		}
		if length as u64 + 4 > sector.size() {
			return Err(self.corruption(coord, CorruptionKind::LengthExceedsSectors {
				length,
				sectors: sector.sector_count(),
			}));
		}
		if sector.offset() + 4 + length as u64 > self.file_len {
			return Err(self.corruption(coord, CorruptionKind::Truncated));
		}
		let scheme = CompressionScheme::from_u8(scheme)
			.ok_or_else(|| self.corruption(coord, CorruptionKind::UnknownCompression(scheme)))?;
		Ok(Some((length as u64 - 1, scheme)))
	}

	/// Reads the blob stored for `coord`. An empty entry gives `None`, a
	/// broken one gives [McError::RegionCorruption] for this slot only.
	pub fn read<C: Into<RegionCoord>>(&mut self, coord: C) -> McResult<Option<RawChunk>> {
		let coord: RegionCoord = coord.into();
		let Some((length, scheme)) = self.read_prefix(coord)? else {
			return Ok(None);
		};
		let mut payload = vec![0u8; length as usize];
		match self.file_handle.read_exact(&mut payload) {
			Ok(()) => Ok(Some(RawChunk::new(scheme, payload))),
			Err(err) if err.kind() == ErrorKind::UnexpectedEof => {
				Err(self.corruption(coord, CorruptionKind::Truncated))
			}
			Err(err) => Err(err.into()),
		}
	}

	/// Writes a blob with the current time as its timestamp.
	pub fn write<C: Into<RegionCoord>>(&mut self, coord: C, chunk: &RawChunk) -> McResult<RegionSector> {
		self.write_timestamped(coord, chunk, Timestamp::utc_now())
	}

	/// Writes a blob for `coord`. The old span is reused when the new blob
	/// fits, otherwise the blob goes to the first free span that is large
	/// enough or the end of the file. The header is only updated after
	/// the blob has been written.
	pub fn write_timestamped<C: Into<RegionCoord>, Ts: Into<Timestamp>>(
		&mut self,
		coord: C,
		chunk: &RawChunk,
		timestamp: Ts,
	) -> McResult<RegionSector> {
		if !self.writable {
			return Err(McError::Unsupported("region file was opened read-only"));
		}
		let coord: RegionCoord = coord.into();
		let timestamp: Timestamp = timestamp.into();
		// The length includes the scheme byte.
		let length = chunk.payload.len() as u64 + 1;
		let blob_size = length + 4;
		let required = RegionSector::count_for(blob_size).ok_or(McError::ChunkTooLarge)?;
		self.write_buf.clear();
		self.write_buf.write_value(length as u32)?;
		self.write_buf.write_value(chunk.scheme)?;
		self.write_buf.extend_from_slice(&chunk.payload);
		self.write_buf.write_zeroes(pad_size(blob_size))?;

		let snapshot = self.sector_manager.clone();
		let old = self.header.sectors[coord];
		let allocation = if self.is_reusable(coord, old) {
			self.sector_manager.reallocate_err(old, required)?
		} else {
			self.sector_manager.allocate_err(required)?
		};
		log::trace!("Region {}: chunk {} -> sectors {}+{}",
			self.position, coord, allocation.sector_offset(), allocation.sector_count());
		match self.commit(coord, allocation, timestamp) {
			Ok(()) => Ok(allocation),
			Err(err) => {
				self.sector_manager = snapshot;
				Err(err)
			}
		}
	}

	fn commit(&mut self, coord: RegionCoord, allocation: RegionSector, timestamp: Timestamp) -> McResult<()> {
		self.file_handle.seek_to(&allocation)?;
		self.file_handle.write_all(&self.write_buf)?;
		// The blob has to be on the disk before the header points at it.
		self.file_handle.sync_data()?;
		self.file_len = self.file_len.max(allocation.end_offset());
		self.write_entry(coord, allocation, timestamp)
	}

	fn write_entry(&mut self, coord: RegionCoord, sector: RegionSector, timestamp: Timestamp) -> McResult<()> {
		self.file_handle.seek(coord.sector_table_offset())?;
		self.file_handle.write_value(sector)?;
		self.file_handle.seek(coord.timestamp_table_offset())?;
		self.file_handle.write_value(timestamp)?;
		self.file_handle.flush()?;
		self.header.sectors[coord] = sector;
		self.header.timestamps[coord] = timestamp;
		Ok(())
	}

	/// Removes the chunk at `coord` and frees its sectors. Returns false if
	/// there was nothing to delete.
	pub fn delete<C: Into<RegionCoord>>(&mut self, coord: C) -> McResult<bool> {
		if !self.writable {
			return Err(McError::Unsupported("region file was opened read-only"));
		}
		let coord: RegionCoord = coord.into();
		let old = self.header.sectors[coord];
		crate::return_if!(old.is_empty() => Ok(false));
		self.write_entry(coord, RegionSector::empty(), Timestamp::default())?;
		if self.is_reusable(coord, old) {
			self.sector_manager.free(old);
		}
		Ok(true)
	}

	/// Checks every entry in the header and reports all of the broken ones.
	/// Nothing is repaired.
	pub fn validate(&mut self) -> McResult<Vec<(RegionCoord, CorruptionKind)>> {
		let mut problems = Vec::new();
		let mut spans = Vec::new();
		for coord in self.header.present().collect::<Vec<_>>() {
			match self.read_prefix(coord) {
				Ok(_) => spans.push((self.header.sectors[coord], coord)),
				Err(McError::RegionCorruption { kind, .. }) => problems.push((coord, kind)),
				Err(err) => return Err(err),
			}
		}
		spans.sort_by_key(|(sector, _)| sector.sector_offset());
		let mut furthest: Option<(RegionSector, RegionCoord)> = None;
		for (sector, coord) in spans {
			match furthest {
				Some((prev, prev_coord)) => {
					if prev.intersects(sector) {
						problems.push((coord, CorruptionKind::Overlapping(prev_coord.index())));
					}
					if sector.sector_end_offset() > prev.sector_end_offset() {
						furthest = Some((sector, coord));
					}
				}
				None => furthest = Some((sector, coord)),
			}
		}
		if !problems.is_empty() {
			log::warn!("Region {} has {} broken entries", self.position, problems.len());
		}
		Ok(problems)
	}

	/// Flushes written data to the disk.
	pub fn flush(&mut self) -> McResult<()> {
		if self.writable {
			self.file_handle.sync_data()?;
		}
		Ok(())
	}
}
