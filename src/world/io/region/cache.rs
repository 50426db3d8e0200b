use std::{
	collections::HashMap,
	io::ErrorKind,
	path::{Path, PathBuf},
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{McError, McResult};

use super::{
	coord::*,
	regionfile::*,
};

pub type SharedRegion = Arc<Mutex<RegionFile>>;

/// The cache entry for one position. It is locked while the file is being
/// opened, so a file is only ever opened once.
type RegionSlot = Arc<Mutex<Option<SharedRegion>>>;

/// Keeps the region files of one directory open. Each file has its own
/// lock, and the map itself is only locked to look up or insert a slot,
/// so work on different regions never waits on each other.
pub struct RegionCache {
	directory: PathBuf,
	read_only: bool,
	open: Mutex<HashMap<RegionPosition, RegionSlot>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RegionCache {
	pub fn new<P: AsRef<Path>>(directory: P, read_only: bool) -> Self {
		Self {
			directory: directory.as_ref().to_owned(),
			read_only,
			open: Mutex::new(HashMap::new()),
		}
	}

	pub fn directory(&self) -> &Path {
		&self.directory
	}

	pub fn is_read_only(&self) -> bool {
		self.read_only
	}

	pub fn region_path(&self, position: RegionPosition) -> PathBuf {
		self.directory.join(position.file_name())
	}

	/// Returns the open region at `position`, opening it first if needed.
	/// A missing file is only created when `create` is set and the cache
	/// is writable, otherwise `None` is returned.
	pub fn get(&self, position: RegionPosition, create: bool) -> McResult<Option<SharedRegion>> {
		let slot = Arc::clone(lock(&self.open).entry(position).or_default());
		let mut entry = lock(&slot);
		if let Some(region) = entry.as_ref() {
			return Ok(Some(Arc::clone(region)));
		}
		let path = self.region_path(position);
		let region = if path.is_file() {
			if self.read_only {
				RegionFile::open_read_only(&path)?
			} else {
				RegionFile::open(&path)?
			}
		} else if create && !self.read_only {
			std::fs::create_dir_all(&self.directory)?;
			RegionFile::open(&path)?
		} else {
			return Ok(None);
		};
		let shared = Arc::new(Mutex::new(region));
		*entry = Some(Arc::clone(&shared));
		Ok(Some(shared))
	}

	/// The regions that are currently open.
	fn open_regions(&self) -> Vec<SharedRegion> {
		let slots: Vec<RegionSlot> = lock(&self.open).values().cloned().collect();
		slots.iter()
			.filter_map(|slot| lock(slot).clone())
			.collect()
	}

	/// Runs `f` with the region at `position` locked. Returns `None` if the
	/// region file does not exist.
	pub fn with_region<R, F>(&self, position: RegionPosition, f: F) -> McResult<Option<R>>
	where
	F: FnOnce(&mut RegionFile) -> McResult<R> {
		match self.get(position, false)? {
			Some(region) => f(&mut lock(&region)).map(Some),
			None => Ok(None),
		}
	}

	/// Reads the blob for the chunk at absolute chunk coordinates `(x, z)`.
	pub fn read(&self, x: i32, z: i32) -> McResult<Option<RawChunk>> {
		let position = RegionPosition::from_chunk(x, z);
		Ok(self.with_region(position, |region| {
			region.read(RegionCoord::from_chunk(x, z))
		})?.flatten())
	}

	pub fn write(&self, x: i32, z: i32, chunk: &RawChunk) -> McResult<()> {
		if self.read_only {
			return Err(McError::Unsupported("region cache is read-only"));
		}
		let position = RegionPosition::from_chunk(x, z);
		let region = self.get(position, true)?
			.ok_or(McError::Unsupported("region cache is read-only"))?;
		let mut region = lock(&region);
		region.write(RegionCoord::from_chunk(x, z), chunk)?;
		Ok(())
	}

	pub fn delete(&self, x: i32, z: i32) -> McResult<bool> {
		if self.read_only {
			return Err(McError::Unsupported("region cache is read-only"));
		}
		let position = RegionPosition::from_chunk(x, z);
		Ok(self.with_region(position, |region| {
			region.delete(RegionCoord::from_chunk(x, z))
		})?.unwrap_or(false))
	}

	/// Flushes every open region to the disk.
	pub fn flush(&self) -> McResult<()> {
		for region in self.open_regions() {
			lock(&region).flush()?;
		}
		Ok(())
	}

	/// Drops the cached handle for `position`. The file stays open until
	/// every clone of the handle is gone.
	pub fn close(&self, position: RegionPosition) -> bool {
		match lock(&self.open).remove(&position) {
			Some(slot) => lock(&slot).is_some(),
			None => false,
		}
	}

	pub fn open_count(&self) -> usize {
		self.open_regions().len()
	}

	/// Lists the region files in the directory. A missing directory has
	/// no regions.
	pub fn regions(&self) -> McResult<Vec<RegionPosition>> {
		let entries = match std::fs::read_dir(&self.directory) {
			Ok(entries) => entries,
			Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
			Err(err) => return Err(err.into()),
		};
		let mut regions = Vec::new();
		for entry in entries {
			let entry = entry?;
			if !entry.file_type()?.is_file() {
				continue;
			}
			if let Some(position) = RegionPosition::from_path(entry.path()) {
				regions.push(position);
			}
		}
		regions.sort();
		Ok(regions)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::world::io::region::compressionscheme::CompressionScheme;

	#[test]
	fn lazily_opens_regions() {
		let dir = tempfile::tempdir().unwrap();
		let cache = RegionCache::new(dir.path().join("region"), false);
		assert!(cache.regions().unwrap().is_empty());
		// Reading never creates a file.
		assert_eq!(cache.read(0, 0).unwrap(), None);
		assert_eq!(cache.open_count(), 0);

		let chunk = RawChunk::new(CompressionScheme::ZLib, vec![3; 40]);
		cache.write(-1, 40, &chunk).unwrap();
		cache.write(5, 5, &chunk).unwrap();
		assert_eq!(cache.open_count(), 2);
		assert_eq!(cache.read(-1, 40).unwrap(), Some(chunk.clone()));
		assert_eq!(cache.read(-2, 40).unwrap(), None);
		assert_eq!(cache.regions().unwrap(), vec![RegionPosition::new(-1, 1), RegionPosition::new(0, 0)]);
		cache.flush().unwrap();

		assert!(cache.delete(5, 5).unwrap());
		assert_eq!(cache.read(5, 5).unwrap(), None);
		assert!(cache.close(RegionPosition::new(0, 0)));
		assert_eq!(cache.open_count(), 1);
	}

	#[test]
	fn read_only_cache() {
		let dir = tempfile::tempdir().unwrap();
		let chunk = RawChunk::new(CompressionScheme::ZLib, vec![3; 40]);
		RegionCache::new(dir.path(), false).write(1, 1, &chunk).unwrap();
		let cache = RegionCache::new(dir.path(), true);
		assert_eq!(cache.read(1, 1).unwrap(), Some(chunk.clone()));
		assert!(matches!(cache.write(1, 1, &chunk), Err(McError::Unsupported(_))));
		let shared = cache.get(RegionPosition::new(0, 0), false).unwrap().unwrap();
		assert!(!shared.lock().unwrap().is_writable());
	}

	#[test]
	fn regions_are_shared_between_threads() {
		let dir = tempfile::tempdir().unwrap();
		let cache = Arc::new(RegionCache::new(dir.path(), false));
		let handles: Vec<_> = (0..4i32).map(|t| {
			let cache = Arc::clone(&cache);
			std::thread::spawn(move || {
				for i in 0..16i32 {
					let chunk = RawChunk::new(CompressionScheme::Uncompressed, vec![t as u8; 100 + i as usize]);
					cache.write(i, t, &chunk).unwrap();
				}
			})
		}).collect();
		for handle in handles {
			handle.join().unwrap();
		}
		assert_eq!(cache.open_count(), 1);
		for t in 0..4i32 {
			for i in 0..16i32 {
				let chunk = cache.read(i, t).unwrap().unwrap();
				assert_eq!(chunk.payload.len(), 100 + i as usize);
			}
		}
	}

	#[test]
	fn first_writes_to_a_new_region_all_land() {
		let dir = tempfile::tempdir().unwrap();
		let cache = Arc::new(RegionCache::new(dir.path(), false));
		let barrier = Arc::new(std::sync::Barrier::new(8));
		let handles: Vec<_> = (0..8i32).map(|t| {
			let cache = Arc::clone(&cache);
			let barrier = Arc::clone(&barrier);
			std::thread::spawn(move || {
				barrier.wait();
				let chunk = RawChunk::new(CompressionScheme::ZLib, vec![t as u8; 64]);
				cache.write(t, 0, &chunk).unwrap();
			})
		}).collect();
		for handle in handles {
			handle.join().unwrap();
		}
		assert_eq!(cache.open_count(), 1);
		let check = |cache: &RegionCache| {
			for t in 0..8i32 {
				let chunk = cache.read(t, 0).unwrap().unwrap();
				assert_eq!(chunk.payload, vec![t as u8; 64]);
			}
		};
		check(&cache);
		// Every write went through the same handle, so a fresh open agrees.
		check(&RegionCache::new(dir.path(), true));
	}

	#[test]
	fn missing_regions_are_not_counted() {
		let dir = tempfile::tempdir().unwrap();
		let cache = RegionCache::new(dir.path(), false);
		assert!(cache.get(RegionPosition::new(3, 3), false).unwrap().is_none());
		assert_eq!(cache.open_count(), 0);
		assert!(!cache.close(RegionPosition::new(3, 3)));
	}
}
