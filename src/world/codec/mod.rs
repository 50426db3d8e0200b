//! Codecs for each stored chunk layout, and the helpers they share for
//! pulling typed fields out of compounds.

pub mod chunk;
pub mod section;
pub mod tile;

use crate::{
	McError, McResult,
	nbt::{
		tagpath::{TagPath, TagPathPart},
		DecodeNbt,
		Map,
		Tag,
	},
};

use super::version::DataVersion;

/// Removes an entry from a [Map] and decodes it, failing with the path
/// of the entry if it's missing or has the wrong type.
/// ```rs
/// let x: i32 = map_decoder!(context, map; "xPos" -> i32);
/// // In case the value might not exist.
/// let name: Option<String> = map_decoder!(context, map; "CustomName" -> Option<String>);
/// // With a default for when it doesn't.
/// let track: bool = map_decoder!(context, map; "TrackOutput" -> bool = true);
/// ```
#[macro_export]
macro_rules! map_decoder {
	($context:expr, $map:expr; $name:literal -> Option<$type:ty>) => {
		$context.take_opt::<$type>(&mut $map, $name)?
	};
	($context:expr, $map:expr; $name:literal -> $type:ty = $default:expr) => {
		$context.take_or::<$type>(&mut $map, $name, $default)?
	};
	($context:expr, $map:expr; $name:literal -> $type:ty) => {
		$context.take::<$type>(&mut $map, $name)?
	};
}

/// Where a decoder is in the tree, and which version wrote the data.
/// Every error a decoder reports goes through here so that it names
/// the exact field that was wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeContext {
	version: DataVersion,
	path: TagPath,
}

impl DecodeContext {
	pub fn new(version: DataVersion) -> Self {
		Self {
			version,
			path: TagPath::root(),
		}
	}

	pub fn version(&self) -> DataVersion {
		self.version
	}

	pub fn path(&self) -> &TagPath {
		&self.path
	}

	/// A context for a child of the current position.
	pub fn child<P: Into<TagPathPart>>(&self, part: P) -> Self {
		Self {
			version: self.version,
			path: self.path.join(part),
		}
	}

	/// A decode error at the current position.
	pub fn error<S: Into<String>>(&self, reason: S) -> McError {
		McError::Decode {
			version: self.version.value(),
			path: self.path.clone(),
			reason: reason.into(),
		}
	}

	/// Moves errors from a decoder that started at the root under the
	/// current position.
	pub fn nest<T>(&self, result: McResult<T>) -> McResult<T> {
		result.map_err(|err| match err {
			McError::Decode { version, path, reason } => {
				let mut parts = self.path.0.clone();
				parts.extend(path.0);
				McError::Decode {
					version,
					path: TagPath(parts),
					reason,
				}
			}
			other => other,
		})
	}

	/// Decodes a tag found at `part`.
	pub fn convert<T: DecodeNbt, P: Into<TagPathPart>>(&self, part: P, tag: Tag) -> McResult<T> {
		T::decode_nbt(tag).map_err(|err| self.child(part).error(err.to_string()))
	}

	/// Removes and decodes a required entry.
	pub fn take<T: DecodeNbt>(&self, map: &mut Map, key: &str) -> McResult<T> {
		match map.shift_remove(key) {
			Some(tag) => self.convert(key, tag),
			None => Err(self.child(key).error("missing required field")),
		}
	}

	/// Removes and decodes an entry that may be missing.
	pub fn take_opt<T: DecodeNbt>(&self, map: &mut Map, key: &str) -> McResult<Option<T>> {
		map.shift_remove(key)
			.map(|tag| self.convert(key, tag))
			.transpose()
	}

	pub fn take_or<T: DecodeNbt>(&self, map: &mut Map, key: &str, default: T) -> McResult<T> {
		Ok(self.take_opt(map, key)?.unwrap_or(default))
	}

	/// Removes an integer entry of any width. The game has changed the
	/// width of some fields over time, such as section `Y`.
	pub fn take_int<T: TryFrom<i64>>(&self, map: &mut Map, key: &str) -> McResult<T> {
		match self.take_int_opt(map, key)? {
			Some(value) => Ok(value),
			None => Err(self.child(key).error("missing required field")),
		}
	}

	pub fn take_int_opt<T: TryFrom<i64>>(&self, map: &mut Map, key: &str) -> McResult<Option<T>> {
		let Some(tag) = map.shift_remove(key) else {
			return Ok(None);
		};
		let Some(value) = tag.as_i64() else {
			return Err(self.child(key).error(format!("expected an integer, found {}", tag.title())));
		};
		T::try_from(value)
			.map(Some)
			.map_err(|_| self.child(key).error(format!("{value} is out of range")))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::compound;

	fn sample() -> Map {
		match compound! {
			("xPos", 3i32),
			("Y", 4i8),
			("Status", "full"),
		} {
			Tag::Compound(map) => map,
			_ => unreachable!(),
		}
	}

	fn decode(context: &DecodeContext, mut map: Map) -> McResult<(i32, Option<String>, bool, i32)> {
		Ok((
			map_decoder!(context, map; "xPos" -> i32),
			map_decoder!(context, map; "Status" -> Option<String>),
			map_decoder!(context, map; "TrackOutput" -> bool = true),
			context.take_int(&mut map, "Y")?,
		))
	}

	#[test]
	fn fields_are_taken() {
		let context = DecodeContext::new(DataVersion::new(1343));
		let mut map = sample();
		assert_eq!(decode(&context, map.clone()).unwrap(), (3, Some("full".to_owned()), true, 4));
		assert_eq!(context.take_opt::<i32>(&mut map, "zPos").unwrap(), None);
		let _: i32 = context.take(&mut map, "xPos").unwrap();
		assert!(!map.contains_key("xPos"));
		assert_eq!(map.keys().collect::<Vec<_>>(), vec!["Y", "Status"]);
	}

	#[test]
	fn nested_errors_are_moved() {
		let context = DecodeContext::new(DataVersion::new(2860)).child("sections").child(3usize);
		let inner = DecodeContext::new(DataVersion::new(2860)).child("block_states");
		let err = context.nest::<()>(Err(inner.error("bad"))).unwrap_err();
		assert!(err.to_string().contains("`sections[3].block_states`"), "{err}");
		assert!(matches!(context.nest::<()>(Err(McError::Cancelled)), Err(McError::Cancelled)));
	}

	#[test]
	fn errors_carry_the_path() {
		let context = DecodeContext::new(DataVersion::new(1343)).child("Level");
		let mut map = sample();
		let err = context.take::<String>(&mut map, "xPos").unwrap_err();
		match err {
			McError::Decode { version, path, .. } => {
				assert_eq!(version, 1343);
				assert_eq!(path.to_string(), "Level.xPos");
			}
			other => panic!("unexpected error {other:?}"),
		}
		let missing = context.child("Sections").child(2i64).take::<i32>(&mut map, "zPos").unwrap_err();
		assert_eq!(
			missing.to_string(),
			"Failed to decode `Level.Sections[2].zPos` (data version 1343): missing required field"
		);
		assert!(context.take_int::<u8>(&mut sample(), "xPos").is_ok());
		assert!(context.take_int::<i32>(&mut sample(), "Status").is_err());
	}
}
