//! Loading and saving whole chunks in a dimension's region directory.

use std::{
	path::{Path, PathBuf},
	sync::Arc,
};

use flate2::Compression;

use crate::{
	compression::Compressor,
	nbt::{
		io::{write_named_tag, NbtLimits, NbtReader},
		Tag,
	},
	util::task::{submit, Executor, Inline, TaskHandle},
	McError, McResult,
};

use super::{
	chunk::{Chunk, Section},
	codec::chunk::{chunk_fixer, ChunkFixer},
	io::region::{
		cache::RegionCache,
		compressionscheme::CompressionScheme,
		coord::RegionPosition,
		regionfile::RawChunk,
	},
	version::DataVersion,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageOptions {
	/// The version that loaded chunks are normalised for. Without one,
	/// a save uses its own data version and a bare directory the latest.
	pub world_version: Option<DataVersion>,
	/// Refuse every write, and never create files.
	pub read_only: bool,
	/// Zlib level from 0 to 9.
	pub compression_level: u32,
	/// The scheme new chunk blobs are written with.
	pub compression_scheme: CompressionScheme,
	pub nbt_limits: NbtLimits,
	/// The largest decompressed chunk that will be parsed.
	pub max_chunk_size: usize,
	/// Idle compression contexts kept for reuse.
	pub pool_capacity: usize,
}

impl Default for StorageOptions {
	fn default() -> Self {
		Self {
			world_version: None,
			read_only: false,
			compression_level: 6,
			compression_scheme: CompressionScheme::ZLib,
			nbt_limits: NbtLimits::default(),
			max_chunk_size: 32 * 1024 * 1024,
			pool_capacity: std::thread::available_parallelism()
				.map(|count| count.get())
				.unwrap_or(4),
		}
	}
}

/// The chunks of one dimension, stored in `<root>/region`.
pub struct AnvilWorldStorage {
	root: PathBuf,
	options: StorageOptions,
	regions: RegionCache,
	compressor: Compressor,
	chunk_fixer: Arc<ChunkFixer>,
	executor: Arc<dyn Executor>,
}

impl AnvilWorldStorage {
	/// Opens the dimension at `root` with the standard codecs. Async
	/// operations run inline until an executor is set with
	/// [AnvilWorldStorage::with_executor].
	pub fn open<P: AsRef<Path>>(root: P, options: StorageOptions) -> McResult<Self> {
		Self::with_parts(root, options, Arc::new(chunk_fixer()?), Arc::new(Inline))
	}

	/// A read-only storage needs `root` to exist already.
	pub fn with_parts<P: AsRef<Path>>(
		root: P,
		options: StorageOptions,
		chunk_fixer: Arc<ChunkFixer>,
		executor: Arc<dyn Executor>,
	) -> McResult<Self> {
		let root = root.as_ref().to_owned();
		if options.read_only && !root.is_dir() {
			return Err(McError::WorldDirectoryNotFound(root));
		}
		log::debug!("opening world storage at {} (version {}, read only: {})",
			root.display(), options.world_version.unwrap_or(DataVersion::LATEST), options.read_only);
		Ok(Self {
			regions: RegionCache::new(root.join("region"), options.read_only),
			compressor: Compressor::new(Compression::new(options.compression_level.min(9)), options.pool_capacity),
			root,
			options,
			chunk_fixer,
			executor,
		})
	}

	pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
		self.executor = executor;
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn options(&self) -> &StorageOptions {
		&self.options
	}

	pub fn world_version(&self) -> DataVersion {
		self.options.world_version.unwrap_or(DataVersion::LATEST)
	}

	pub fn region_cache(&self) -> &RegionCache {
		&self.regions
	}

	pub fn chunk_fixer(&self) -> &ChunkFixer {
		&self.chunk_fixer
	}

	/// Reads the chunk at absolute chunk coordinates, decoded for the
	/// world version. Chunks without a `DataVersion` are treated as the
	/// oldest version.
	pub fn load_chunk(&self, x: i32, z: i32) -> McResult<Option<Chunk>> {
		let Some(raw) = self.regions.read(x, z)? else {
			return Ok(None);
		};
		let bytes = raw.decompress(&self.compressor, self.options.max_chunk_size)?;
		drop(raw);
		let tag = NbtReader::new(bytes.as_slice(), self.options.nbt_limits)
			.read_named_tag()?
			.take_tag();
		drop(bytes);
		let root = match tag {
			Tag::Compound(root) => root,
			other => return Err(McError::Custom(format!("chunk {x} {z} is a {} instead of a Compound", other.title()))),
		};
		let version = root.get("DataVersion")
			.and_then(Tag::as_i64)
			.and_then(|version| i32::try_from(version).ok())
			.map_or(DataVersion::PRE_15W32A, DataVersion::from_stored);
		self.chunk_fixer.decode_at(root, version, self.world_version()).map(Some)
	}

	/// Loads a chunk and keeps only the section at `y`.
	pub fn load_section(&self, x: i32, y: i8, z: i32) -> McResult<Option<Section>> {
		Ok(self.load_chunk(x, z)?
			.and_then(|chunk| chunk.sections.into_iter().find(|section| section.y == y)))
	}

	/// Writes `chunk` in the layout of the version it was loaded from.
	pub fn save_chunk(&self, chunk: &Chunk) -> McResult<()> {
		if self.options.read_only {
			return Err(McError::Unsupported("saving chunks to a read-only storage"));
		}
		let root = self.chunk_fixer.encode(chunk, chunk.version)?;
		let mut bytes = Vec::new();
		write_named_tag(&mut bytes, "", &Tag::Compound(root))?;
		let raw = RawChunk::compress(&self.compressor, self.options.compression_scheme, &bytes)?;
		drop(bytes);
		self.regions.write(chunk.x, chunk.z, &raw)
	}

	/// Removes a chunk. Returns whether it existed.
	pub fn delete_chunk(&self, x: i32, z: i32) -> McResult<bool> {
		self.regions.delete(x, z)
	}

	pub fn load_chunk_async(self: &Arc<Self>, x: i32, z: i32) -> TaskHandle<Option<Chunk>> {
		let storage = Arc::clone(self);
		submit(self.executor.as_ref(), move || storage.load_chunk(x, z))
	}

	pub fn save_chunk_async(self: &Arc<Self>, chunk: Chunk) -> TaskHandle<()> {
		let storage = Arc::clone(self);
		submit(self.executor.as_ref(), move || storage.save_chunk(&chunk))
	}

	pub fn flush(&self) -> McResult<()> {
		self.regions.flush()
	}

	/// Region files in the region directory.
	pub fn regions(&self) -> McResult<Vec<RegionPosition>> {
		self.regions.regions()
	}

	/// Absolute coordinates of every chunk with an entry in the region.
	pub fn chunks_in_region(&self, position: RegionPosition) -> McResult<Vec<(i32, i32)>> {
		let present = self.regions.with_region(position, |region| Ok(region.present()))?;
		Ok(present.unwrap_or_default()
			.into_iter()
			.map(|coord| position.chunk(coord))
			.collect())
	}
}
