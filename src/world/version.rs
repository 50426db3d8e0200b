use std::fmt::Display;

/// The data version stored in chunks and `level.dat`. Every snapshot and
/// release of the game has its own, and they only ever increase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DataVersion(pub i32);

impl DataVersion {
	/// Anything written before data versions existed.
	pub const PRE_15W32A: Self = Self(0);
	/// The first snapshot that wrote a data version.
	pub const V15W32A: Self = Self(100);
	/// 1.11, where tile entity ids became namespaced.
	pub const V1_11: Self = Self(819);
	pub const V1_12_2: Self = Self(1343);
	/// 17w47a, the first version with named block states.
	pub const FLATTENING: Self = Self(1451);
	/// 20w17a, block state indices no longer span two longs.
	pub const PADDED_BLOCK_STATES: Self = Self(2529);
	/// 21w43a, the `Level` wrapper was removed.
	pub const V21W43A: Self = Self(2844);
	/// 1.20, signs have two sides.
	pub const V1_20: Self = Self(3463);
	pub const LATEST: Self = Self(3700);

	pub const fn new(version: i32) -> Self {
		Self(version)
	}

	pub const fn value(self) -> i32 {
		self.0
	}

	/// Versions below 15w32a are stored as 0, since the game didn't
	/// record anything more specific.
	pub const fn from_stored(version: i32) -> Self {
		if version < Self::V15W32A.0 {
			Self::PRE_15W32A
		} else {
			Self(version)
		}
	}

	/// Looks up a release by name, such as `"1.12.2"`.
	pub fn from_name(name: &str) -> Option<Self> {
		RELEASES.iter()
			.find(|(release, _)| *release == name)
			.map(|&(_, version)| Self(version))
	}

	/// The newest release at or before this version.
	pub fn release_name(self) -> Option<&'static str> {
		RELEASES.iter()
			.rev()
			.find(|&&(_, version)| version <= self.0)
			.map(|&(name, _)| name)
	}
}

/// Release names and their data versions, oldest first.
const RELEASES: &[(&str, i32)] = &[
	("1.9", 169),
	("1.9.4", 184),
	("1.10", 510),
	("1.10.2", 512),
	("1.11", 819),
	("1.11.2", 922),
	("1.12", 1139),
	("1.12.2", 1343),
	("1.13", 1519),
	("1.13.2", 1631),
	("1.14", 1952),
	("1.14.4", 1976),
	("1.15", 2225),
	("1.15.2", 2230),
	("1.16", 2566),
	("1.16.5", 2586),
	("1.17", 2724),
	("1.17.1", 2730),
	("1.18", 2860),
	("1.18.2", 2975),
	("1.19", 3105),
	("1.19.4", 3337),
	("1.20", 3463),
	("1.20.4", 3700),
];

impl From<i32> for DataVersion {
	fn from(value: i32) -> Self {
		Self(value)
	}
}

impl From<DataVersion> for i32 {
	fn from(value: DataVersion) -> Self {
		value.0
	}
}

impl Display for DataVersion {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.release_name() {
			Some(name) if DataVersion::from_name(name) == Some(*self) => write!(f, "{} ({name})", self.0),
			_ => write!(f, "{}", self.0),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn names_and_ordering() {
		assert_eq!(DataVersion::from_name("1.12.2"), Some(DataVersion::V1_12_2));
		assert_eq!(DataVersion::from_name("1.20"), Some(DataVersion::V1_20));
		assert_eq!(DataVersion::from_name("b1.7"), None);
		assert!(DataVersion::FLATTENING > DataVersion::V1_12_2);
		assert_eq!(DataVersion::new(1400).release_name(), Some("1.12.2"));
		assert_eq!(DataVersion::new(50).release_name(), None);
		assert_eq!(DataVersion::from_stored(99), DataVersion::PRE_15W32A);
		assert_eq!(DataVersion::from_stored(1343), DataVersion::V1_12_2);
		assert_eq!(DataVersion::V1_12_2.to_string(), "1343 (1.12.2)");
		assert_eq!(DataVersion::new(1400).to_string(), "1400");
	}
}
