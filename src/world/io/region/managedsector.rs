use std::ops::Range;

use super::sector::*;

/// Similar to a RegionSector, but not constrained
/// to only 255 sectors. Used to describe free space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash)]
pub struct ManagedSector {
	pub start: u32,
	pub end: u32,
}

impl From<Range<u32>> for ManagedSector {
	fn from(value: Range<u32>) -> Self {
		Self::new(value.start, value.end)
	}
}

impl std::fmt::Display for ManagedSector {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "(start: {}, end: {})", self.start, self.end)
	}
}

impl From<RegionSector> for ManagedSector {
	fn from(value: RegionSector) -> Self {
		ManagedSector::new(
			value.sector_offset() as u32,
			value.sector_end_offset() as u32
		)
	}
}

impl ManagedSector {
	/// The two sectors holding the region header.
	pub const HEADER: Self = Self::new(0, 2);

	/// Create a new [ManagedSector] from the start and end offsets.
	/// Ensure that `start` <= `end`.
	pub const fn new(start: u32, end: u32) -> Self {
		Self {
			start,
			end
		}
	}

	/// Creates a new [ManagedSector] that starts at `end_offset` and
	/// runs to the last sector offset that a header entry can address.
	pub const fn end_sector(end_offset: u32) -> Self {
		Self {
			start: end_offset,
			end: RegionSector::MAX_OFFSET as u32 + 1,
		}
	}

	pub const fn size(&self) -> u32 {
		self.end.saturating_sub(self.start)
	}

	/// Determines if this sector has a size of 0.
	pub const fn is_empty(&self) -> bool {
		self.start >= self.end
	}

	/// Absorbs the other [ManagedSector] and all space in between into
	/// this [ManagedSector].
	pub fn absorb(&mut self, other: Self) {
		self.start = self.start.min(other.start);
		self.end = self.end.max(other.end);
	}

	/// Allocates a [RegionSector] from the start of this [ManagedSector],
	/// reducing the size in the process. Returns `None` if there isn't
	/// enough space.
	pub fn allocate(&mut self, size: u8) -> Option<RegionSector> {
		if size == 0 || self.size() < size as u32 {
			return None;
		}
		let start = self.start;
		self.start += size as u32;
		Some(RegionSector::new(start, size))
	}

	/// Checks intersection between two sectors.
	pub fn intersects(&self, other: &Self) -> bool {
		self.start < other.end
		&& other.start < self.end
	}

	/// True if `other` starts where this ends, or ends where this starts.
	pub fn adjacent(&self, other: &Self) -> bool {
		self.end == other.start || other.end == self.start
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn allocate_from_start() {
		let mut free = ManagedSector::new(4, 7);
		assert_eq!(free.allocate(2), Some(RegionSector::new(4, 2)));
		assert_eq!(free, ManagedSector::new(6, 7));
		assert_eq!(free.allocate(2), None);
		assert_eq!(free.allocate(1), Some(RegionSector::new(6, 1)));
		assert!(free.is_empty());
	}

	#[test]
	fn absorb_and_adjacency() {
		let mut a = ManagedSector::new(2, 4);
		let b = ManagedSector::new(4, 9);
		assert!(a.adjacent(&b));
		assert!(!a.intersects(&b));
		a.absorb(b);
		assert_eq!(a, ManagedSector::new(2, 9));
		assert_eq!(ManagedSector::from(RegionSector::new(5, 3)), ManagedSector::new(5, 8));
	}
}
