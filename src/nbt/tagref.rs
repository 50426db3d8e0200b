//! Borrowed access to any value in a tag tree, including the elements
//! of lists and arrays, which are not stored as [Tag]s themselves.

use crate::nbt::{
	tag::*,
	tagpath::TagPathPart,
	Map,
};

/// Allows immutable access to a value within an NBT tag hierarchy.
/// Scalars are copied, everything else is borrowed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TagRef<'a> {
	Byte(i8),
	Short(i16),
	Int(i32),
	Long(i64),
	Float(f32),
	Double(f64),
	ByteArray(&'a [i8]),
	String(&'a str),
	List(&'a ListTag),
	Compound(&'a Map),
	IntArray(&'a [i32]),
	LongArray(&'a [i64]),
}

/// Negative indices count from the end.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
	let index = if index < 0 {
		len as i64 + index
	} else {
		index
	};
	(0..len as i64).contains(&index).then_some(index as usize)
}

macro_rules! element {
	($variant:ident, $list:expr, $index:expr) => {
		resolve_index($index, $list.len()).map(|i| TagRef::$variant(&$list[i]))
	};
	(copy $variant:ident, $list:expr, $index:expr) => {
		resolve_index($index, $list.len()).map(|i| TagRef::$variant($list[i]))
	};
}

impl<'a> TagRef<'a> {
	pub fn id(&self) -> TagID {
		match self {
			TagRef::Byte(_) => TagID::Byte,
			TagRef::Short(_) => TagID::Short,
			TagRef::Int(_) => TagID::Int,
			TagRef::Long(_) => TagID::Long,
			TagRef::Float(_) => TagID::Float,
			TagRef::Double(_) => TagID::Double,
			TagRef::ByteArray(_) => TagID::ByteArray,
			TagRef::String(_) => TagID::String,
			TagRef::List(_) => TagID::List,
			TagRef::Compound(_) => TagID::Compound,
			TagRef::IntArray(_) => TagID::IntArray,
			TagRef::LongArray(_) => TagID::LongArray,
		}
	}

	/// Steps into a child. Keys apply to Compounds, indices apply to
	/// lists and arrays.
	pub fn child(self, part: &TagPathPart) -> Option<TagRef<'a>> {
		match (self, part) {
			(TagRef::Compound(map), TagPathPart::AtKey(key)) => map.get(key).map(TagRef::from),
			(TagRef::ByteArray(array), &TagPathPart::AtIndex(index)) => element!(copy Byte, array, index),
			(TagRef::IntArray(array), &TagPathPart::AtIndex(index)) => element!(copy Int, array, index),
			(TagRef::LongArray(array), &TagPathPart::AtIndex(index)) => element!(copy Long, array, index),
			(TagRef::List(list), &TagPathPart::AtIndex(index)) => match list {
				ListTag::Empty => None,
				ListTag::Byte(list) => element!(copy Byte, list, index),
				ListTag::Short(list) => element!(copy Short, list, index),
				ListTag::Int(list) => element!(copy Int, list, index),
				ListTag::Long(list) => element!(copy Long, list, index),
				ListTag::Float(list) => element!(copy Float, list, index),
				ListTag::Double(list) => element!(copy Double, list, index),
				ListTag::ByteArray(list) => resolve_index(index, list.len()).map(|i| TagRef::ByteArray(&list[i])),
				ListTag::String(list) => resolve_index(index, list.len()).map(|i| TagRef::String(&list[i])),
				ListTag::List(list) => element!(List, list, index),
				ListTag::Compound(list) => element!(Compound, list, index),
				ListTag::IntArray(list) => resolve_index(index, list.len()).map(|i| TagRef::IntArray(&list[i])),
				ListTag::LongArray(list) => resolve_index(index, list.len()).map(|i| TagRef::LongArray(&list[i])),
			},
			_ => None,
		}
	}

	pub fn as_compound(&self) -> Option<&'a Map> {
		match *self {
			TagRef::Compound(map) => Some(map),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&'a str> {
		match *self {
			TagRef::String(value) => Some(value),
			_ => None,
		}
	}

	/// Any integer value widened to an i64.
	pub fn as_i64(&self) -> Option<i64> {
		match *self {
			TagRef::Byte(value) => Some(value as i64),
			TagRef::Short(value) => Some(value as i64),
			TagRef::Int(value) => Some(value as i64),
			TagRef::Long(value) => Some(value),
			_ => None,
		}
	}

	/// Copies the referenced value into a standalone [Tag].
	pub fn to_tag(&self) -> Tag {
		match *self {
			TagRef::Byte(value) => Tag::Byte(value),
			TagRef::Short(value) => Tag::Short(value),
			TagRef::Int(value) => Tag::Int(value),
			TagRef::Long(value) => Tag::Long(value),
			TagRef::Float(value) => Tag::Float(value),
			TagRef::Double(value) => Tag::Double(value),
			TagRef::ByteArray(value) => Tag::ByteArray(value.to_vec()),
			TagRef::String(value) => Tag::String(value.to_owned()),
			TagRef::List(value) => Tag::List(value.clone()),
			TagRef::Compound(value) => Tag::Compound(value.clone()),
			TagRef::IntArray(value) => Tag::IntArray(value.to_vec()),
			TagRef::LongArray(value) => Tag::LongArray(value.to_vec()),
		}
	}
}

impl<'a> From<&'a Tag> for TagRef<'a> {
	fn from(value: &'a Tag) -> Self {
		match value {
			Tag::Byte(value) => TagRef::Byte(*value),
			Tag::Short(value) => TagRef::Short(*value),
			Tag::Int(value) => TagRef::Int(*value),
			Tag::Long(value) => TagRef::Long(*value),
			Tag::Float(value) => TagRef::Float(*value),
			Tag::Double(value) => TagRef::Double(*value),
			Tag::ByteArray(value) => TagRef::ByteArray(value),
			Tag::String(value) => TagRef::String(value),
			Tag::List(value) => TagRef::List(value),
			Tag::Compound(value) => TagRef::Compound(value),
			Tag::IntArray(value) => TagRef::IntArray(value),
			Tag::LongArray(value) => TagRef::LongArray(value),
		}
	}
}

impl<'a> From<&'a Map> for TagRef<'a> {
	fn from(value: &'a Map) -> Self {
		TagRef::Compound(value)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn indexing_lists_and_arrays() {
		let list = ListTag::from(vec![10i32, 20, 30]);
		let view = TagRef::List(&list);
		assert_eq!(view.child(&TagPathPart::AtIndex(1)), Some(TagRef::Int(20)));
		assert_eq!(view.child(&TagPathPart::AtIndex(-1)), Some(TagRef::Int(30)));
		assert_eq!(view.child(&TagPathPart::AtIndex(3)), None);
		assert_eq!(view.child(&TagPathPart::AtKey("x".into())), None);
		let longs = Tag::LongArray(vec![1, 2]);
		assert_eq!(TagRef::from(&longs).child(&TagPathPart::AtIndex(-2)).and_then(|v| v.as_i64()), Some(1));
		assert_eq!(TagRef::from(&longs).to_tag(), longs);
	}
}
