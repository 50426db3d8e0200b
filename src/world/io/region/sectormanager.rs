use crate::{
	McResult, McError,
};

use super::prelude::*;

pub trait SectorAllocator {
	fn free(&mut self, sector: RegionSector);
	#[must_use]
	fn allocate(&mut self, size: u8) -> Option<RegionSector>;
	#[must_use]
	fn reallocate(&mut self, free: RegionSector, new_size: u8) -> Option<RegionSector>;

	#[inline(always)]
	fn allocate_err(&mut self, size: u8) -> McResult<RegionSector> {
		self.allocate(size).ok_or(McError::RegionAllocationFailure)
	}

	#[inline(always)]
	fn reallocate_err(&mut self, free: RegionSector, new_size: u8) -> McResult<RegionSector> {
		self.reallocate(free, new_size).ok_or(McError::RegionAllocationFailure)
	}
}

/// Manages unused sectors in a region file so that chunks can be
/// written without overlapping each other. Space freed by deleted or
/// moved chunks is kept in a free list and handed out again before the
/// file is extended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorManager {
	/// The unused sectors between live chunks. Never adjacent to each
	/// other or to `end_sector`.
	unused_sectors: Vec<ManagedSector>,
	/// All the space past the last used sector. This is where new or
	/// too large sectors are allocated when no unused sector fits.
	end_sector: ManagedSector,
}

impl SectorAllocator for SectorManager {
	/// Frees a sector, allowing it to be reused. Only give this sectors
	/// that were handed out by the same manager (or that it was built
	/// from), otherwise free space may overlap live data.
	fn free(&mut self, sector: RegionSector) {
		if sector.sector_count() == 0 {
			return;
		}
		let mut freed = ManagedSector::from(sector);
		// Merge with the neighbours on either side.
		self.unused_sectors.retain(|unused| {
			if unused.adjacent(&freed) {
				freed.absorb(*unused);
				false
			} else {
				true
			}
		});
		if freed.end >= self.end_sector.start {
			self.end_sector.absorb(freed);
		} else {
			self.unused_sectors.push(freed);
		}
	}

	/// Allocate a sector of a specified size, preferring the first
	/// unused sector that is large enough.
	fn allocate(&mut self, size: u8) -> Option<RegionSector> {
		if size == 0 {
			return None;
		}
		let found = self.unused_sectors
			.iter()
			.position(|sector| sector.size() >= size as u32);
		match found {
			Some(index) => {
				let allocation = self.unused_sectors[index].allocate(size);
				if self.unused_sectors[index].is_empty() {
					self.unused_sectors.swap_remove(index);
				}
				allocation
			}
			None => self.end_sector.allocate(size),
		}
	}

	/// Returns a sector of `new_size` for data that currently lives in
	/// `free`. If `free` is large enough the data stays where it is and
	/// any leftover space is released. Otherwise a new sector is found
	/// before `free` is released, so the two never overlap.
	fn reallocate(&mut self, free: RegionSector, new_size: u8) -> Option<RegionSector> {
		if new_size == 0 {
			return None;
		}
		if free.sector_count() >= new_size as u64 {
			let (kept, leftover) = free.split_left(new_size)?;
			self.free(leftover);
			Some(kept)
		} else {
			let allocation = self.allocate(new_size)?;
			self.free(free);
			Some(allocation)
		}
	}
}

impl SectorManager {
	pub fn new() -> Self {
		Self {
			unused_sectors: Vec::new(),
			end_sector: ManagedSector::end_sector(ManagedSector::HEADER.end),
		}
	}

	/// Creates a [SectorManager] from the sectors in use. Gaps between
	/// them become unused sectors. Damaged entries count as used too.
	pub fn from_used<I: IntoIterator<Item = RegionSector>>(used: I) -> Self {
		let mut used = used.into_iter()
			.filter(|sector| sector.sector_count() != 0)
			.map(ManagedSector::from)
			.collect::<Vec<ManagedSector>>();
		used.sort();
		let mut unused_sectors = Vec::new();
		// Sectors may overlap if the file is damaged, so track the
		// furthest end seen so far rather than the previous sector's end.
		let mut end = ManagedSector::HEADER.end;
		for sector in used {
			if sector.start > end {
				unused_sectors.push(ManagedSector::new(end, sector.start));
			}
			end = end.max(sector.end);
		}
		Self {
			unused_sectors,
			end_sector: ManagedSector::end_sector(end),
		}
	}

	pub fn unused_sectors(&self) -> &[ManagedSector] {
		&self.unused_sectors
	}

	pub fn end_sector(&self) -> &ManagedSector {
		&self.end_sector
	}

	/// Counts the number of unused 4KiB blocks. This is helpful for determining
	/// if the region file needs to be optimized.
	pub fn count_unused_blocks(&self) -> u32 {
		self.unused_sectors.iter()
			.map(ManagedSector::size)
			.sum()
	}
}

impl Default for SectorManager {
	fn default() -> Self {
		Self::new()
	}
}
