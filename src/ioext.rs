use std::io::{
	self,
	Read, Write,
	Seek, SeekFrom,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::{
	McResult,
	nbt::{
		NamedTag,
		io::{NbtRead, NbtWrite},
	},
};

/// A value that can be read from a big-endian byte stream.
pub trait Readable: Sized {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self>;
}

/// A value that can be written to a big-endian byte stream.
/// Returns the number of bytes written.
pub trait Writable {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize>;
}

/// Types that point to a location in a seekable stream.
pub trait Seekable {
	fn seeker(&self) -> SeekFrom;
}

pub trait ReadExt: Read + Sized {
	fn read_value<T: Readable>(&mut self) -> McResult<T> {
		T::read_from(self)
	}
}

impl<R: Read> ReadExt for R {}

pub trait WriteExt: Write + Sized {
	fn write_value<T: Writable>(&mut self, value: T) -> McResult<usize> {
		value.write_to(self)
	}
}

impl<W: Write> WriteExt for W {}

pub trait SeekExt: Seek {
	/// Seek to `position`, returning a [SeekFrom] that can be used to
	/// return to the position the stream was at before the seek.
	fn seek_return(&mut self, position: SeekFrom) -> io::Result<SeekFrom> {
		let ret = SeekFrom::Start(self.stream_position()?);
		self.seek(position)?;
		Ok(ret)
	}

	fn seek_to<S: Seekable>(&mut self, seekable: &S) -> io::Result<u64> {
		self.seek(seekable.seeker())
	}
}

impl<S: Seek> SeekExt for S {}

pub trait WriteZeroes: Write {
	fn write_zeroes(&mut self, count: u64) -> io::Result<u64> {
		write_zeroes(self, count)
	}
}

impl<W: Write> WriteZeroes for W {}

macro_rules! __primitive_io {
	($type:ty, $read:ident, $write:ident) => {
		impl Readable for $type {
			fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
				Ok(reader.$read::<BigEndian>()?)
			}
		}

		impl Writable for $type {
			fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
				writer.$write::<BigEndian>(*self)?;
				Ok(std::mem::size_of::<$type>())
			}
		}
	};
}

__primitive_io!(u16, read_u16, write_u16);
__primitive_io!(i16, read_i16, write_i16);
__primitive_io!(u32, read_u32, write_u32);
__primitive_io!(i32, read_i32, write_i32);
__primitive_io!(u64, read_u64, write_u64);
__primitive_io!(i64, read_i64, write_i64);
__primitive_io!(f32, read_f32, write_f32);
__primitive_io!(f64, read_f64, write_f64);

impl Readable for u8 {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(reader.read_u8()?)
	}
}

impl Writable for u8 {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_u8(*self)?;
		Ok(1)
	}
}

impl Readable for i8 {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(reader.read_i8()?)
	}
}

impl Writable for i8 {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		writer.write_i8(*self)?;
		Ok(1)
	}
}

impl<T: Writable> Writable for &T {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		(*self).write_to(writer)
	}
}

impl Readable for NamedTag {
	fn read_from<R: Read>(reader: &mut R) -> McResult<Self> {
		Ok(NamedTag::nbt_read(reader)?)
	}
}

impl Writable for NamedTag {
	fn write_to<W: Write>(&self, writer: &mut W) -> McResult<usize> {
		Ok(self.nbt_write(writer)?)
	}
}

/// Writes zeroes to a writer.
pub fn write_zeroes<W: Write + ?Sized>(writer: &mut W, count: u64) -> io::Result<u64> {
	const ZEROES: &'static [u8; 4096] = &[0u8; 4096];
	let mut remainder = count;
	while remainder >= ZEROES.len() as u64 {
		writer.write_all(ZEROES)?;
		remainder -= ZEROES.len() as u64;
	}
	if remainder != 0 {
		writer.write_all(&ZEROES[0..remainder as usize])?;
	}
	Ok(count)
}
