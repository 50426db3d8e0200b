use std::fmt::Display;

use crate::nbt::{
	Map,
	NbtError,
	NbtResult,
};

/// The numeric identifier written before every tag payload.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TagID {
	End = 0,
	Byte = 1,
	Short = 2,
	Int = 3,
	Long = 4,
	Float = 5,
	Double = 6,
	ByteArray = 7,
	String = 8,
	List = 9,
	Compound = 10,
	IntArray = 11,
	LongArray = 12,
}

impl TagID {
	pub const fn value(self) -> u8 {
		self as u8
	}

	pub const fn title(self) -> &'static str {
		match self {
			TagID::End => "End",
			TagID::Byte => "Byte",
			TagID::Short => "Short",
			TagID::Int => "Int",
			TagID::Long => "Long",
			TagID::Float => "Float",
			TagID::Double => "Double",
			TagID::ByteArray => "ByteArray",
			TagID::String => "String",
			TagID::List => "List",
			TagID::Compound => "Compound",
			TagID::IntArray => "IntArray",
			TagID::LongArray => "LongArray",
		}
	}

	pub const fn from_u8(id: u8) -> Option<Self> {
		Some(match id {
			0 => TagID::End,
			1 => TagID::Byte,
			2 => TagID::Short,
			3 => TagID::Int,
			4 => TagID::Long,
			5 => TagID::Float,
			6 => TagID::Double,
			7 => TagID::ByteArray,
			8 => TagID::String,
			9 => TagID::List,
			10 => TagID::Compound,
			11 => TagID::IntArray,
			12 => TagID::LongArray,
			_ => return None,
		})
	}
}

impl TryFrom<u8> for TagID {
	type Error = NbtError;

	fn try_from(value: u8) -> Result<Self, Self::Error> {
		TagID::from_u8(value).ok_or(NbtError::UnsupportedTagId(value))
	}
}

impl Display for TagID {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.title())
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
	Byte(i8),
	Short(i16),
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	ByteArray(Vec<i8>),
	String(String),
	List(ListTag),
	Compound(Map),
	IntArray(Vec<i32>),
	LongArray(Vec<i64>),
}

/// A list holds elements of a single kind. An empty list still
/// remembers the element kind it was declared with, except for
/// [ListTag::Empty] which is declared with [TagID::End].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ListTag {
	#[default]
	Empty,
	Byte(Vec<i8>),
	Short(Vec<i16>),
	Int(Vec<i32>),
	Long(Vec<i64>),
	Float(Vec<f32>),
	Double(Vec<f64>),
	ByteArray(Vec<Vec<i8>>),
	String(Vec<String>),
	List(Vec<ListTag>),
	Compound(Vec<Map>),
	IntArray(Vec<Vec<i32>>),
	LongArray(Vec<Vec<i64>>),
}

/// A root tag along with its name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTag {
	name: String,
	tag: Tag,
}

impl Tag {
	pub fn id(&self) -> TagID {
		match self {
			Tag::Byte(_) => TagID::Byte,
			Tag::Short(_) => TagID::Short,
			Tag::Int(_) => TagID::Int,
			Tag::Long(_) => TagID::Long,
			Tag::Float(_) => TagID::Float,
			Tag::Double(_) => TagID::Double,
			Tag::ByteArray(_) => TagID::ByteArray,
			Tag::String(_) => TagID::String,
			Tag::List(_) => TagID::List,
			Tag::Compound(_) => TagID::Compound,
			Tag::IntArray(_) => TagID::IntArray,
			Tag::LongArray(_) => TagID::LongArray,
		}
	}

	pub fn title(&self) -> &'static str {
		self.id().title()
	}

	/// Looks up `key` if this is a Compound.
	pub fn get(&self, key: &str) -> Option<&Tag> {
		self.as_compound()?.get(key)
	}

	pub fn as_compound(&self) -> Option<&Map> {
		match self {
			Tag::Compound(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_compound_mut(&mut self) -> Option<&mut Map> {
		match self {
			Tag::Compound(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&ListTag> {
		match self {
			Tag::List(list) => Some(list),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Tag::String(value) => Some(value),
			_ => None,
		}
	}

	/// Any integer tag widened to an i64.
	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Tag::Byte(value) => Some(*value as i64),
			Tag::Short(value) => Some(*value as i64),
			Tag::Int(value) => Some(*value as i64),
			Tag::Long(value) => Some(*value),
			_ => None,
		}
	}
}

impl ListTag {
	/// The element kind written in the list header.
	pub fn element_id(&self) -> TagID {
		match self {
			ListTag::Empty => TagID::End,
			ListTag::Byte(_) => TagID::Byte,
			ListTag::Short(_) => TagID::Short,
			ListTag::Int(_) => TagID::Int,
			ListTag::Long(_) => TagID::Long,
			ListTag::Float(_) => TagID::Float,
			ListTag::Double(_) => TagID::Double,
			ListTag::ByteArray(_) => TagID::ByteArray,
			ListTag::String(_) => TagID::String,
			ListTag::List(_) => TagID::List,
			ListTag::Compound(_) => TagID::Compound,
			ListTag::IntArray(_) => TagID::IntArray,
			ListTag::LongArray(_) => TagID::LongArray,
		}
	}

	pub fn len(&self) -> usize {
		match self {
			ListTag::Empty => 0,
			ListTag::Byte(list) => list.len(),
			ListTag::Short(list) => list.len(),
			ListTag::Int(list) => list.len(),
			ListTag::Long(list) => list.len(),
			ListTag::Float(list) => list.len(),
			ListTag::Double(list) => list.len(),
			ListTag::ByteArray(list) => list.len(),
			ListTag::String(list) => list.len(),
			ListTag::List(list) => list.len(),
			ListTag::Compound(list) => list.len(),
			ListTag::IntArray(list) => list.len(),
			ListTag::LongArray(list) => list.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Converts each element into a standalone [Tag].
	pub fn into_tags(self) -> Vec<Tag> {
		fn wrap<T>(list: Vec<T>, f: fn(T) -> Tag) -> Vec<Tag> {
			list.into_iter().map(f).collect()
		}
		match self {
			ListTag::Empty => Vec::new(),
			ListTag::Byte(list) => wrap(list, Tag::Byte),
			ListTag::Short(list) => wrap(list, Tag::Short),
			ListTag::Int(list) => wrap(list, Tag::Int),
			ListTag::Long(list) => wrap(list, Tag::Long),
			ListTag::Float(list) => wrap(list, Tag::Float),
			ListTag::Double(list) => wrap(list, Tag::Double),
			ListTag::ByteArray(list) => wrap(list, Tag::ByteArray),
			ListTag::String(list) => wrap(list, Tag::String),
			ListTag::List(list) => wrap(list, Tag::List),
			ListTag::Compound(list) => wrap(list, Tag::Compound),
			ListTag::IntArray(list) => wrap(list, Tag::IntArray),
			ListTag::LongArray(list) => wrap(list, Tag::LongArray),
		}
	}

	/// Builds a list out of loose tags, which must all be the same kind.
	pub fn from_tags(tags: Vec<Tag>) -> NbtResult<ListTag> {
		let Some(first) = tags.first() else {
			return Ok(ListTag::Empty);
		};
		let expected = first.id();
		macro_rules! collect_list {
			($variant:ident) => {
				ListTag::$variant(tags.into_iter().map(|tag| match tag {
					Tag::$variant(value) => Ok(value),
					other => Err(NbtError::HeterogeneousList { expected, found: other.id() }),
				}).collect::<NbtResult<Vec<_>>>()?)
			};
		}
		Ok(match expected {
			TagID::End => ListTag::Empty,
			TagID::Byte => collect_list!(Byte),
			TagID::Short => collect_list!(Short),
			TagID::Int => collect_list!(Int),
			TagID::Long => collect_list!(Long),
			TagID::Float => collect_list!(Float),
			TagID::Double => collect_list!(Double),
			TagID::ByteArray => collect_list!(ByteArray),
			TagID::String => collect_list!(String),
			TagID::List => collect_list!(List),
			TagID::Compound => collect_list!(Compound),
			TagID::IntArray => collect_list!(IntArray),
			TagID::LongArray => collect_list!(LongArray),
		})
	}
}

impl NamedTag {
	/// A [NamedTag] with an empty name, which is what chunk and level
	/// files use for their root.
	pub fn new<T: Into<Tag>>(tag: T) -> Self {
		Self {
			name: String::new(),
			tag: tag.into(),
		}
	}

	pub fn with_name<S: Into<String>, T: Into<Tag>>(name: S, tag: T) -> Self {
		Self {
			name: name.into(),
			tag: tag.into(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn tag(&self) -> &Tag {
		&self.tag
	}

	pub fn tag_mut(&mut self) -> &mut Tag {
		&mut self.tag
	}

	pub fn take_tag(self) -> Tag {
		self.tag
	}

	pub fn into_parts(self) -> (String, Tag) {
		(self.name, self.tag)
	}
}

macro_rules! __tag_conversions {
	($($type:ty => $variant:ident;)+) => {
		$(
			impl From<$type> for Tag {
				fn from(value: $type) -> Self {
					Tag::$variant(value)
				}
			}

			impl From<Vec<$type>> for ListTag {
				fn from(value: Vec<$type>) -> Self {
					ListTag::$variant(value)
				}
			}

			impl DecodeNbt for $type {
				fn decode_nbt(nbt: Tag) -> NbtResult<Self> {
					match nbt {
						Tag::$variant(value) => Ok(value),
						other => Err(NbtError::TypeMismatch {
							expected: TagID::$variant,
							found: other.id(),
						}),
					}
				}
			}

			impl EncodeNbt for $type {
				fn encode_nbt(self) -> Tag {
					Tag::$variant(self)
				}
			}
		)+
	};
}

__tag_conversions!(
	i8 => Byte;
	i16 => Short;
	i32 => Int;
	i64 => Long;
	f32 => Float;
	f64 => Double;
	Vec<i8> => ByteArray;
	String => String;
	ListTag => List;
	Map => Compound;
	Vec<i32> => IntArray;
	Vec<i64> => LongArray;
);

impl From<&str> for Tag {
	fn from(value: &str) -> Self {
		Tag::String(value.to_owned())
	}
}

impl From<bool> for Tag {
	fn from(value: bool) -> Self {
		Tag::Byte(value as i8)
	}
}

impl From<Vec<&str>> for ListTag {
	fn from(value: Vec<&str>) -> Self {
		ListTag::String(value.into_iter().map(str::to_owned).collect())
	}
}

/// Decode a value from a [Tag] tree.
pub trait DecodeNbt: Sized {
	fn decode_nbt(nbt: Tag) -> NbtResult<Self>;
}

/// Encode a value into a [Tag] tree.
pub trait EncodeNbt {
	fn encode_nbt(self) -> Tag;
}

impl DecodeNbt for Tag {
	fn decode_nbt(nbt: Tag) -> NbtResult<Self> {
		Ok(nbt)
	}
}

impl DecodeNbt for bool {
	fn decode_nbt(nbt: Tag) -> NbtResult<Self> {
		i8::decode_nbt(nbt).map(|value| value != 0)
	}
}

impl EncodeNbt for bool {
	fn encode_nbt(self) -> Tag {
		Tag::Byte(self as i8)
	}
}

/// Lists of compounds. An empty list of any declared kind decodes as
/// an empty [Vec], since writers often declare empty lists as End.
impl DecodeNbt for Vec<Map> {
	fn decode_nbt(nbt: Tag) -> NbtResult<Self> {
		match ListTag::decode_nbt(nbt)? {
			ListTag::Compound(list) => Ok(list),
			list if list.is_empty() => Ok(Vec::new()),
			list => Err(NbtError::TypeMismatch { expected: TagID::Compound, found: list.element_id() }),
		}
	}
}

impl DecodeNbt for Vec<String> {
	fn decode_nbt(nbt: Tag) -> NbtResult<Self> {
		match ListTag::decode_nbt(nbt)? {
			ListTag::String(list) => Ok(list),
			list if list.is_empty() => Ok(Vec::new()),
			list => Err(NbtError::TypeMismatch { expected: TagID::String, found: list.element_id() }),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_round_trip() {
		for id in 0..=12u8 {
			assert_eq!(TagID::try_from(id).unwrap().value(), id);
		}
		assert!(matches!(TagID::try_from(13), Err(NbtError::UnsupportedTagId(13))));
	}

	#[test]
	fn lists_keep_their_kind() {
		let list = ListTag::Int(Vec::new());
		assert_eq!(list.element_id(), TagID::Int);
		assert!(list.is_empty());
		assert_eq!(ListTag::default().element_id(), TagID::End);
	}

	#[test]
	fn from_tags_checks_kinds() {
		let list = ListTag::from_tags(vec![Tag::Int(1), Tag::Int(2)]).unwrap();
		assert_eq!(list, ListTag::Int(vec![1, 2]));
		assert_eq!(list.into_tags(), vec![Tag::Int(1), Tag::Int(2)]);
		let mixed = ListTag::from_tags(vec![Tag::Int(1), Tag::Byte(2)]);
		assert!(matches!(mixed, Err(NbtError::HeterogeneousList { expected: TagID::Int, found: TagID::Byte })));
	}

	#[test]
	fn decode_mismatch() {
		assert_eq!(i32::decode_nbt(Tag::Int(4)).unwrap(), 4);
		assert!(matches!(
			i32::decode_nbt(Tag::Long(4)),
			Err(NbtError::TypeMismatch { expected: TagID::Int, found: TagID::Long })
		));
		assert!(bool::decode_nbt(Tag::Byte(1)).unwrap());
		assert!(Vec::<Map>::decode_nbt(Tag::List(ListTag::Empty)).unwrap().is_empty());
	}
}
