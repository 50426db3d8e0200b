use std::io::{Read, Write};
use chrono::{DateTime, Utc};
use crate::{
	McResult,
	ioext::*,
};

/// A 32-bit Unix timestamp, the last time a chunk was written.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Default, Hash)]
pub struct Timestamp(u32);

impl Timestamp {
	pub const fn new(seconds: u32) -> Self {
		Self(seconds)
	}

	pub const fn seconds(self) -> u32 {
		self.0
	}

	pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
		DateTime::<Utc>::from_timestamp(self.0 as i64, 0)
	}

	/// Get a [Timestamp] for the current time (in Utc).
	pub fn utc_now() -> Timestamp {
		Timestamp::from(Utc::now())
	}
}

impl From<u32> for Timestamp {
	fn from(value: u32) -> Self {
		Self(value)
	}
}

impl From<Timestamp> for u32 {
	fn from(value: Timestamp) -> Self {
		value.0
	}
}

impl Readable for Timestamp {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(Self(reader.read_value()?))
	}
}

impl Writable for Timestamp {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_value(self.0)
	}
}

impl From<DateTime<Utc>> for Timestamp {
	fn from(value: DateTime<Utc>) -> Self {
		// Clamped so that dates outside the u32 range don't wrap.
		Timestamp(value.timestamp().clamp(0, u32::MAX as i64) as u32)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn datetime_conversion() {
		let stamp = Timestamp::new(1_700_000_000);
		let datetime = stamp.to_datetime().unwrap();
		assert_eq!(datetime.timestamp(), 1_700_000_000);
		assert_eq!(Timestamp::from(datetime), stamp);
		assert!(Timestamp::utc_now() > stamp);
	}
}
