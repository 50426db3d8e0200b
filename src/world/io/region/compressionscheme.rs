use std::io::{Read, Write};
use crate::{
	McResult, McError,
	ioext::*,
};

/// Compression scheme used for writing or reading.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionScheme {
	/// GZip compression is used.
	GZip = 1,
	/// ZLib compression is used.
	#[default]
	ZLib = 2,
	/// Data is uncompressed.
	Uncompressed = 3,
}

impl CompressionScheme {
	pub const fn value(self) -> u8 {
		self as u8
	}

	pub const fn from_u8(value: u8) -> Option<Self> {
		match value {
			1 => Some(Self::GZip),
			2 => Some(Self::ZLib),
			3 => Some(Self::Uncompressed),
			_ => None,
		}
	}
}

impl TryFrom<u8> for CompressionScheme {
	type Error = McError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		Self::from_u8(value).ok_or(McError::InvalidCompressionScheme(value))
	}
}

impl Writable for CompressionScheme {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_value(self.value())
	}
}

impl Readable for CompressionScheme {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Self::try_from(reader.read_value::<u8>()?)
	}
}
