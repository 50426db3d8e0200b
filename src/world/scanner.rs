//! Visits every chunk of a dimension.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::McResult;

use super::{
	chunk::Chunk,
	io::region::coord::RegionPosition,
	storage::AnvilWorldStorage,
};

/// Receives `(current, estimated_total, chunk)`. `current` counts from 1
/// and the total counts every chunk entry, including ones that turn out
/// to be unreadable.
pub type ChunkProcessor = Box<dyn Fn(usize, usize, &Chunk) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
	pub regions: usize,
	pub processed: usize,
	/// Chunks or regions that failed to load and were left out.
	pub skipped: usize,
}

impl ScanSummary {
	fn merge(self, other: Self) -> Self {
		Self {
			regions: self.regions + other.regions,
			processed: self.processed + other.processed,
			skipped: self.skipped + other.skipped,
		}
	}
}

#[derive(Default)]
pub struct WorldScanner {
	processors: Vec<ChunkProcessor>,
	parallel: bool,
}

impl WorldScanner {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_processor<F>(mut self, processor: F) -> Self
	where F: Fn(usize, usize, &Chunk) + Send + Sync + 'static {
		self.processors.push(Box::new(processor));
		self
	}

	/// Scan regions on the rayon global pool. Chunks of one region are
	/// always visited in order.
	pub fn parallel(mut self, parallel: bool) -> Self {
		self.parallel = parallel;
		self
	}

	/// Loads every chunk and hands it to each processor. Chunks that fail
	/// to load are logged and skipped.
	pub fn scan(&self, storage: &AnvilWorldStorage) -> McResult<ScanSummary> {
		let mut skipped = 0;
		let mut plan: Vec<(RegionPosition, Vec<(i32, i32)>)> = Vec::new();
		for position in storage.regions()? {
			match storage.chunks_in_region(position) {
				Ok(chunks) => plan.push((position, chunks)),
				Err(err) => {
					log::warn!("skipping region {position}: {err}");
					skipped += 1;
				}
			}
		}
		let total: usize = plan.iter().map(|(_, chunks)| chunks.len()).sum();
		log::debug!("scanning {total} chunks in {} regions", plan.len());
		let current = AtomicUsize::new(0);
		let scan_region = |(position, chunks): &(RegionPosition, Vec<(i32, i32)>)| {
			self.scan_region(storage, *position, chunks, &current, total)
		};
		let summary = if self.parallel {
			plan.par_iter()
				.map(scan_region)
				.reduce(ScanSummary::default, ScanSummary::merge)
		} else {
			plan.iter()
				.map(scan_region)
				.fold(ScanSummary::default(), ScanSummary::merge)
		};
		Ok(ScanSummary {
			skipped: summary.skipped + skipped,
			..summary
		})
	}

	fn scan_region(
		&self,
		storage: &AnvilWorldStorage,
		position: RegionPosition,
		chunks: &[(i32, i32)],
		current: &AtomicUsize,
		total: usize,
	) -> ScanSummary {
		let mut summary = ScanSummary {
			regions: 1,
			..ScanSummary::default()
		};
		for &(x, z) in chunks {
			match storage.load_chunk(x, z) {
				Ok(Some(chunk)) => {
					let index = current.fetch_add(1, Ordering::Relaxed) + 1;
					for processor in &self.processors {
						processor(index, total, &chunk);
					}
					summary.processed += 1;
				}
				Ok(None) => (),
				Err(err) => {
					log::warn!("skipping chunk {x} {z} in region {position}: {err}");
					summary.skipped += 1;
				}
			}
		}
		summary
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		blockstate,
		world::{
			io::region::{compressionscheme::CompressionScheme, regionfile::RawChunk},
			storage::StorageOptions,
			version::DataVersion,
		},
	};
	use std::sync::{Arc, Mutex};

	fn populated_storage(dir: &std::path::Path) -> AnvilWorldStorage {
		let storage = AnvilWorldStorage::open(dir, StorageOptions::default()).unwrap();
		for (x, z) in [(0, 0), (1, 0), (40, 3), (-1, -1)] {
			let mut chunk = Chunk::new(x, z, DataVersion::LATEST);
			chunk.set_block(0, 0, 0, blockstate!(stone)).unwrap();
			storage.save_chunk(&chunk).unwrap();
		}
		let garbage = RawChunk::new(CompressionScheme::ZLib, b"not a zlib stream".to_vec());
		storage.region_cache().write(2, 2, &garbage).unwrap();
		storage
	}

	fn run(parallel: bool) {
		let dir = tempfile::tempdir().unwrap();
		let storage = populated_storage(dir.path());
		let seen = Arc::new(Mutex::new(Vec::new()));
		let record = Arc::clone(&seen);
		let scanner = WorldScanner::new()
			.parallel(parallel)
			.add_processor(move |current, total, chunk| {
				assert_eq!(total, 5);
				assert_eq!(chunk.block(0, 0, 0), Some(&blockstate!(stone)));
				record.lock().unwrap().push((current, chunk.x, chunk.z));
			});
		let summary = scanner.scan(&storage).unwrap();
		assert_eq!(summary, ScanSummary { regions: 3, processed: 4, skipped: 1 });

		let mut seen = seen.lock().unwrap().clone();
		seen.sort();
		assert_eq!(seen.iter().map(|entry| entry.0).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
		let mut coords: Vec<(i32, i32)> = seen.iter().map(|entry| (entry.1, entry.2)).collect();
		coords.sort();
		assert_eq!(coords, vec![(-1, -1), (0, 0), (1, 0), (40, 3)]);
	}

	#[test]
	fn sequential_scan_skips_broken_chunks() {
		run(false);
	}

	#[test]
	fn parallel_scan_skips_broken_chunks() {
		run(true);
	}

	#[test]
	fn empty_world() {
		let dir = tempfile::tempdir().unwrap();
		let storage = AnvilWorldStorage::open(dir.path(), StorageOptions::default()).unwrap();
		assert_eq!(WorldScanner::new().scan(&storage).unwrap(), ScanSummary::default());
	}
}
