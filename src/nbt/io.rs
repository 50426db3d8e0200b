//! Binary NBT encoding.
//!
//! Every number is big-endian. A named tag is its id byte, a
//! length-prefixed name, then the payload. Compounds end with a lone
//! End id, lists carry one element id followed by an i32 count.

use std::{
	fs::File,
	io::{BufReader, BufWriter, Read, Write},
	path::Path,
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use flate2::{
	read::GzDecoder,
	write::GzEncoder,
	Compression,
};

use crate::nbt::{
	ListTag,
	Map,
	NamedTag,
	NbtError,
	NbtResult,
	Tag,
	TagID,
};

/// Bounds applied while decoding untrusted data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NbtLimits {
	/// How many Lists and Compounds may be nested inside each other.
	pub max_depth: usize,
	/// The largest element count accepted for arrays and lists.
	pub max_array_len: usize,
}

impl NbtLimits {
	pub const DEFAULT: Self = Self {
		max_depth: 512,
		max_array_len: 16 * 1024 * 1024,
	};
}

impl Default for NbtLimits {
	fn default() -> Self {
		Self::DEFAULT
	}
}

pub trait NbtRead: Sized {
	fn nbt_read<R: Read>(reader: &mut R) -> NbtResult<Self>;
}

pub trait NbtWrite {
	fn nbt_write<W: Write>(&self, writer: &mut W) -> NbtResult<usize>;
}

impl NbtRead for NamedTag {
	fn nbt_read<R: Read>(reader: &mut R) -> NbtResult<Self> {
		NbtReader::new(reader, NbtLimits::default()).read_named_tag()
	}
}

impl NbtWrite for NamedTag {
	fn nbt_write<W: Write>(&self, writer: &mut W) -> NbtResult<usize> {
		write_named_tag(writer, self.name(), self.tag())
	}
}

/// Decodes tags from a byte stream while tracking nesting depth.
pub struct NbtReader<R> {
	reader: R,
	limits: NbtLimits,
	depth: usize,
}

macro_rules! read_primitive_vec {
	($reader:expr, $len:expr, $type:ty, $method:ident) => {{
		let mut values = vec![<$type>::default(); $len];
		$reader.$method::<BigEndian>(&mut values)?;
		values
	}};
}

impl<R: Read> NbtReader<R> {
	pub fn new(reader: R, limits: NbtLimits) -> Self {
		Self {
			reader,
			limits,
			depth: 0,
		}
	}

	pub fn into_inner(self) -> R {
		self.reader
	}

	pub fn read_named_tag(&mut self) -> NbtResult<NamedTag> {
		let id = self.read_id()?;
		if id == TagID::End {
			return Err(NbtError::EndTagMarker);
		}
		let name = self.read_string()?;
		let tag = self.read_payload(id)?;
		Ok(NamedTag::with_name(name, tag))
	}

	/// Reads the payload of a tag whose id has already been consumed.
	pub fn read_payload(&mut self, id: TagID) -> NbtResult<Tag> {
		Ok(match id {
			TagID::End => return Err(NbtError::EndTagMarker),
			TagID::Byte => Tag::Byte(self.reader.read_i8()?),
			TagID::Short => Tag::Short(self.reader.read_i16::<BigEndian>()?),
			TagID::Int => Tag::Int(self.reader.read_i32::<BigEndian>()?),
			TagID::Long => Tag::Long(self.reader.read_i64::<BigEndian>()?),
			TagID::Float => Tag::Float(self.reader.read_f32::<BigEndian>()?),
			TagID::Double => Tag::Double(self.reader.read_f64::<BigEndian>()?),
			TagID::ByteArray => {
				let len = self.read_len()?;
				Tag::ByteArray(self.read_bytes(len)?)
			}
			TagID::String => Tag::String(self.read_string()?),
			TagID::List => Tag::List(self.nested(Self::read_list)?),
			TagID::Compound => Tag::Compound(self.nested(Self::read_compound)?),
			TagID::IntArray => {
				let len = self.read_len()?;
				Tag::IntArray(read_primitive_vec!(self.reader, len, i32, read_i32_into))
			}
			TagID::LongArray => {
				let len = self.read_len()?;
				Tag::LongArray(read_primitive_vec!(self.reader, len, i64, read_i64_into))
			}
		})
	}

	fn nested<T>(&mut self, read: fn(&mut Self) -> NbtResult<T>) -> NbtResult<T> {
		if self.depth >= self.limits.max_depth {
			return Err(NbtError::DepthLimitExceeded(self.limits.max_depth));
		}
		self.depth += 1;
		let result = read(self);
		self.depth -= 1;
		result
	}

	fn read_id(&mut self) -> NbtResult<TagID> {
		TagID::try_from(self.reader.read_u8()?)
	}

	fn read_len(&mut self) -> NbtResult<usize> {
		let len = self.reader.read_i32::<BigEndian>()?;
		if len < 0 {
			return Err(NbtError::NegativeLength(len));
		}
		let len = len as usize;
		if len > self.limits.max_array_len {
			return Err(NbtError::LengthLimitExceeded { len, limit: self.limits.max_array_len });
		}
		Ok(len)
	}

	fn read_bytes(&mut self, len: usize) -> NbtResult<Vec<i8>> {
		let mut values = vec![0i8; len];
		self.reader.read_i8_into(&mut values)?;
		Ok(values)
	}

	fn read_string(&mut self) -> NbtResult<String> {
		let len = self.reader.read_u16::<BigEndian>()? as usize;
		let mut bytes = vec![0u8; len];
		self.reader.read_exact(&mut bytes)?;
		Ok(String::from_utf8(bytes)?)
	}

	fn read_each<T>(&mut self, len: usize, read: fn(&mut Self) -> NbtResult<T>) -> NbtResult<Vec<T>> {
		// The count is untrusted, so let the Vec grow as elements arrive.
		let mut values = Vec::with_capacity(len.min(1024));
		for _ in 0..len {
			values.push(read(self)?);
		}
		Ok(values)
	}

	fn read_list(&mut self) -> NbtResult<ListTag> {
		let id = self.read_id()?;
		let len = self.read_len()?;
		Ok(match id {
			TagID::End => {
				if len != 0 {
					return Err(NbtError::NonEmptyEndList(len));
				}
				ListTag::Empty
			}
			TagID::Byte => ListTag::Byte(self.read_bytes(len)?),
			TagID::Short => ListTag::Short(read_primitive_vec!(self.reader, len, i16, read_i16_into)),
			TagID::Int => ListTag::Int(read_primitive_vec!(self.reader, len, i32, read_i32_into)),
			TagID::Long => ListTag::Long(read_primitive_vec!(self.reader, len, i64, read_i64_into)),
			TagID::Float => ListTag::Float(read_primitive_vec!(self.reader, len, f32, read_f32_into)),
			TagID::Double => ListTag::Double(read_primitive_vec!(self.reader, len, f64, read_f64_into)),
			TagID::ByteArray => ListTag::ByteArray(self.read_each(len, |this| {
				let len = this.read_len()?;
				this.read_bytes(len)
			})?),
			TagID::String => ListTag::String(self.read_each(len, Self::read_string)?),
			TagID::List => ListTag::List(self.read_each(len, |this| this.nested(Self::read_list))?),
			TagID::Compound => ListTag::Compound(self.read_each(len, |this| this.nested(Self::read_compound))?),
			TagID::IntArray => ListTag::IntArray(self.read_each(len, |this| {
				let len = this.read_len()?;
				Ok(read_primitive_vec!(this.reader, len, i32, read_i32_into))
			})?),
			TagID::LongArray => ListTag::LongArray(self.read_each(len, |this| {
				let len = this.read_len()?;
				Ok(read_primitive_vec!(this.reader, len, i64, read_i64_into))
			})?),
		})
	}

	fn read_compound(&mut self) -> NbtResult<Map> {
		let mut map = Map::new();
		loop {
			let id = self.read_id()?;
			if id == TagID::End {
				return Ok(map);
			}
			let name = self.read_string()?;
			let tag = self.read_payload(id)?;
			if map.contains_key(&name) {
				return Err(NbtError::DuplicateKey(name));
			}
			map.insert(name, tag);
		}
	}
}

/// Writes `tag` with its id and `name`. Returns the number of bytes written.
pub fn write_named_tag<W: Write>(writer: &mut W, name: &str, tag: &Tag) -> NbtResult<usize> {
	writer.write_u8(tag.id().value())?;
	let mut size = 1 + write_string(writer, name)?;
	size += write_payload(writer, tag)?;
	Ok(size)
}

/// Writes the payload of `tag` without its id or a name.
pub fn write_payload<W: Write>(writer: &mut W, tag: &Tag) -> NbtResult<usize> {
	Ok(match tag {
		Tag::Byte(value) => {
			writer.write_i8(*value)?;
			1
		}
		Tag::Short(value) => {
			writer.write_i16::<BigEndian>(*value)?;
			2
		}
		Tag::Int(value) => {
			writer.write_i32::<BigEndian>(*value)?;
			4
		}
		Tag::Long(value) => {
			writer.write_i64::<BigEndian>(*value)?;
			8
		}
		Tag::Float(value) => {
			writer.write_f32::<BigEndian>(*value)?;
			4
		}
		Tag::Double(value) => {
			writer.write_f64::<BigEndian>(*value)?;
			8
		}
		Tag::ByteArray(values) => write_byte_array(writer, values)?,
		Tag::String(value) => write_string(writer, value)?,
		Tag::List(list) => write_list(writer, list)?,
		Tag::Compound(map) => write_compound(writer, map)?,
		Tag::IntArray(values) => write_int_array(writer, values)?,
		Tag::LongArray(values) => write_long_array(writer, values)?,
	})
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> NbtResult<usize> {
	let len = i32::try_from(len).map_err(|_| NbtError::LengthTooLarge(len))?;
	writer.write_i32::<BigEndian>(len)?;
	Ok(4)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> NbtResult<usize> {
	let len = u16::try_from(value.len()).map_err(|_| NbtError::StringTooLong(value.len()))?;
	writer.write_u16::<BigEndian>(len)?;
	writer.write_all(value.as_bytes())?;
	Ok(2 + value.len())
}

fn write_bytes<W: Write>(writer: &mut W, values: &[i8]) -> NbtResult<usize> {
	writer.write_all(bytemuck::cast_slice(values))?;
	Ok(values.len())
}

fn write_byte_array<W: Write>(writer: &mut W, values: &[i8]) -> NbtResult<usize> {
	Ok(write_len(writer, values.len())? + write_bytes(writer, values)?)
}

fn write_int_array<W: Write>(writer: &mut W, values: &[i32]) -> NbtResult<usize> {
	let size = write_len(writer, values.len())?;
	for value in values {
		writer.write_i32::<BigEndian>(*value)?;
	}
	Ok(size + values.len() * 4)
}

fn write_long_array<W: Write>(writer: &mut W, values: &[i64]) -> NbtResult<usize> {
	let size = write_len(writer, values.len())?;
	for value in values {
		writer.write_i64::<BigEndian>(*value)?;
	}
	Ok(size + values.len() * 8)
}

fn write_list<W: Write>(writer: &mut W, list: &ListTag) -> NbtResult<usize> {
	writer.write_u8(list.element_id().value())?;
	let mut size = 1 + write_len(writer, list.len())?;
	macro_rules! each {
		($values:expr, $write:expr) => {{
			let write = $write;
			for value in $values.iter() {
				size += write(&mut *writer, value)?;
			}
		}};
	}
	match list {
		ListTag::Empty => (),
		ListTag::Byte(values) => size += write_bytes(writer, values)?,
		ListTag::Short(values) => each!(values, |w: &mut W, v: &i16| -> NbtResult<usize> { w.write_i16::<BigEndian>(*v)?; Ok(2) }),
		ListTag::Int(values) => each!(values, |w: &mut W, v: &i32| -> NbtResult<usize> { w.write_i32::<BigEndian>(*v)?; Ok(4) }),
		ListTag::Long(values) => each!(values, |w: &mut W, v: &i64| -> NbtResult<usize> { w.write_i64::<BigEndian>(*v)?; Ok(8) }),
		ListTag::Float(values) => each!(values, |w: &mut W, v: &f32| -> NbtResult<usize> { w.write_f32::<BigEndian>(*v)?; Ok(4) }),
		ListTag::Double(values) => each!(values, |w: &mut W, v: &f64| -> NbtResult<usize> { w.write_f64::<BigEndian>(*v)?; Ok(8) }),
		ListTag::ByteArray(values) => each!(values, |w: &mut W, v: &Vec<i8>| write_byte_array(w, v)),
		ListTag::String(values) => each!(values, |w: &mut W, v: &String| write_string(w, v)),
		ListTag::List(values) => each!(values, |w: &mut W, v: &ListTag| write_list(w, v)),
		ListTag::Compound(values) => each!(values, |w: &mut W, v: &Map| write_compound(w, v)),
		ListTag::IntArray(values) => each!(values, |w: &mut W, v: &Vec<i32>| write_int_array(w, v)),
		ListTag::LongArray(values) => each!(values, |w: &mut W, v: &Vec<i64>| write_long_array(w, v)),
	}
	Ok(size)
}

fn write_compound<W: Write>(writer: &mut W, map: &Map) -> NbtResult<usize> {
	let mut size = 0;
	for (name, tag) in map {
		size += write_named_tag(writer, name, tag)?;
	}
	writer.write_u8(TagID::End.value())?;
	Ok(size + 1)
}

/// Reads a gzip compressed NBT file, such as `level.dat`.
pub fn read_gzip_file<P: AsRef<Path>>(path: P, limits: NbtLimits) -> NbtResult<NamedTag> {
	let file = File::open(path)?;
	NbtReader::new(GzDecoder::new(BufReader::new(file)), limits).read_named_tag()
}

/// Writes `tag` to a gzip compressed file, replacing whatever was there.
pub fn write_gzip_file<P: AsRef<Path>>(path: P, tag: &NamedTag) -> NbtResult<usize> {
	let file = File::create(path)?;
	let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
	let size = tag.nbt_write(&mut encoder)?;
	encoder.finish()?.flush()?;
	Ok(size)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{compound, list};

	fn encode(tag: &NamedTag) -> Vec<u8> {
		let mut bytes = Vec::new();
		let size = tag.nbt_write(&mut bytes).unwrap();
		assert_eq!(size, bytes.len());
		bytes
	}

	fn decode(bytes: &[u8]) -> NbtResult<NamedTag> {
		NamedTag::nbt_read(&mut &bytes[..])
	}

	fn sample() -> NamedTag {
		NamedTag::with_name("root", compound! {
			("byte", 1i8),
			("short", -2i16),
			("int", 3i32),
			("long", i64::MIN),
			("float", 0.5f32),
			("double", -0.25f64),
			("bytes", vec![1i8, -1, 2]),
			("string", "héllo"),
			("ints", Tag::List(ListTag::Int(vec![1, 2, 3]))),
			("empty ints", Tag::List(ListTag::Int(Vec::new()))),
			("empty", list![]),
			("nested", Tag::List(ListTag::List(vec![ListTag::String(vec!["a".to_owned()]), ListTag::Empty]))),
			("compounds", Tag::List(ListTag::Compound(vec![Map::new()]))),
			("child", compound! { ("z", 0i32), ("a", 1i32) }),
			("int array", vec![i32::MAX, 0]),
			("long array", vec![7i64]),
		})
	}

	#[test]
	fn canonical_round_trip() {
		let tag = sample();
		let bytes = encode(&tag);
		let decoded = decode(&bytes).unwrap();
		assert_eq!(decoded, tag);
		assert_eq!(encode(&decoded), bytes);
	}

	#[test]
	fn known_encoding() {
		let tag = NamedTag::with_name("hi", compound! { ("v", 5i16) });
		assert_eq!(encode(&tag), [
			10, 0, 2, b'h', b'i',
			2, 0, 1, b'v', 0, 5,
			0,
		]);
	}

	#[test]
	fn truncated_input_is_an_error() {
		let bytes = encode(&sample());
		for cut in [1, 5, bytes.len() / 2, bytes.len() - 1] {
			assert!(matches!(decode(&bytes[..cut]), Err(NbtError::Truncated)), "cut at {cut}");
		}
	}

	#[test]
	fn malformed_input() {
		// Unknown tag id.
		assert!(matches!(decode(&[13, 0, 0]), Err(NbtError::UnsupportedTagId(13))));
		// Negative array length.
		assert!(matches!(
			decode(&[7, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF]),
			Err(NbtError::NegativeLength(-1))
		));
		// List of End with elements.
		assert!(matches!(
			decode(&[9, 0, 0, 0, 0, 0, 0, 2]),
			Err(NbtError::NonEmptyEndList(2))
		));
		// Duplicate compound key.
		assert!(matches!(
			decode(&[10, 0, 0, 1, 0, 1, b'a', 1, 1, 0, 1, b'a', 2, 0]),
			Err(NbtError::DuplicateKey(key)) if key == "a"
		));
		// Invalid UTF-8 in a name.
		assert!(matches!(decode(&[1, 0, 1, 0xFF, 0]), Err(NbtError::FromUtf8Error(_))));
	}

	#[test]
	fn limits_are_enforced() {
		let mut deep = Tag::Compound(Map::new());
		for _ in 0..10 {
			deep = compound! { ("inner", deep) };
		}
		let bytes = encode(&NamedTag::new(deep));
		let shallow = NbtLimits { max_depth: 5, ..NbtLimits::default() };
		assert!(matches!(
			NbtReader::new(&bytes[..], shallow).read_named_tag(),
			Err(NbtError::DepthLimitExceeded(5))
		));
		assert!(NbtReader::new(&bytes[..], NbtLimits::default()).read_named_tag().is_ok());

		let bytes = encode(&NamedTag::new(Tag::LongArray(vec![0; 100])));
		let small = NbtLimits { max_array_len: 99, ..NbtLimits::default() };
		assert!(matches!(
			NbtReader::new(&bytes[..], small).read_named_tag(),
			Err(NbtError::LengthLimitExceeded { len: 100, limit: 99 })
		));
	}

	#[test]
	fn oversized_string_is_rejected() {
		let tag = NamedTag::new(Tag::String("x".repeat(70_000)));
		assert!(matches!(tag.nbt_write(&mut Vec::new()), Err(NbtError::StringTooLong(70_000))));
	}

	#[test]
	fn gzip_file_round_trip() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("level.dat");
		let tag = sample();
		write_gzip_file(&path, &tag).unwrap();
		assert_eq!(read_gzip_file(&path, NbtLimits::default()).unwrap(), tag);
	}
}
