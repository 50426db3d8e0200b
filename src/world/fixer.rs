//! A registry of codecs keyed by the version they were introduced in.
//!
//! Data written by version `v` is decoded by the codec with the greatest
//! key that is `<= v`. That codec decodes straight into the current
//! model, so there is no chain of upgrades to run.

use std::fmt::Display;

use crate::{McError, McResult};

/// Converts between a model `T` and its stored form `P` for data
/// written by versions `V` in a specific range.
pub trait Codec<T, P, V>: Send + Sync {
	/// Decodes `payload`, written by version `version`, into a model for
	/// the `target` version.
	fn decode(&self, payload: P, version: V, target: V) -> McResult<T>;

	/// Encodes `value` into the stored form for the version range that
	/// this codec covers.
	fn encode(&self, value: &T) -> McResult<P>;
}

/// Builds a [DataFixer]. Codecs can be added in any order.
pub struct DataFixerBuilder<T, P, V> {
	codecs: Vec<(V, Box<dyn Codec<T, P, V>>)>,
}

/// Codecs sorted by version, ready to resolve.
pub struct DataFixer<T, P, V> {
	codecs: Vec<(V, Box<dyn Codec<T, P, V>>)>,
}

impl<T, P, V: Ord + Copy + Display> DataFixerBuilder<T, P, V> {
	pub fn new() -> Self {
		Self {
			codecs: Vec::new(),
		}
	}

	pub fn add_codec<C: Codec<T, P, V> + 'static>(mut self, version: V, codec: C) -> Self {
		self.codecs.push((version, Box::new(codec)));
		self
	}

	pub fn add_boxed(mut self, version: V, codec: Box<dyn Codec<T, P, V>>) -> Self {
		self.codecs.push((version, codec));
		self
	}

	/// Sorts the codecs. Two codecs with the same version are an error.
	pub fn build(mut self) -> McResult<DataFixer<T, P, V>> {
		self.codecs.sort_by_key(|(version, _)| *version);
		if let Some(pair) = self.codecs.windows(2).find(|pair| pair[0].0 == pair[1].0) {
			return Err(McError::DuplicateCodec(pair[0].0.to_string()));
		}
		Ok(DataFixer {
			codecs: self.codecs,
		})
	}
}

impl<T, P, V: Ord + Copy + Display> Default for DataFixerBuilder<T, P, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T, P, V: Ord + Copy + Display> DataFixer<T, P, V> {
	pub fn builder() -> DataFixerBuilder<T, P, V> {
		DataFixerBuilder::new()
	}

	/// The codec for data written by `version`.
	pub fn resolve(&self, version: V) -> McResult<&dyn Codec<T, P, V>> {
		let index = self.codecs.partition_point(|(key, _)| *key <= version);
		match index.checked_sub(1) {
			Some(index) => Ok(self.codecs[index].1.as_ref()),
			None => Err(McError::UnresolvableVersion(version.to_string())),
		}
	}

	/// The key of the codec that `version` resolves to.
	pub fn resolve_key(&self, version: V) -> McResult<V> {
		let index = self.codecs.partition_point(|(key, _)| *key <= version);
		index.checked_sub(1)
			.map(|index| self.codecs[index].0)
			.ok_or_else(|| McError::UnresolvableVersion(version.to_string()))
	}

	/// Decodes data written by `version` for the `target` version.
	pub fn decode_at(&self, payload: P, version: V, target: V) -> McResult<T> {
		self.resolve(version)?.decode(payload, version, target)
	}

	/// Encodes `value` for `version`.
	pub fn encode(&self, value: &T, version: V) -> McResult<P> {
		self.resolve(version)?.encode(value)
	}

	pub fn versions(&self) -> impl Iterator<Item = V> + '_ {
		self.codecs.iter().map(|(version, _)| *version)
	}

	pub fn len(&self) -> usize {
		self.codecs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.codecs.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Tags its output with the key it was registered under.
	struct Tagged(i32);

	impl Codec<(i32, i32, i32), String, i32> for Tagged {
		fn decode(&self, payload: String, version: i32, target: i32) -> McResult<(i32, i32, i32)> {
			let value: i32 = payload.parse().map_err(|_| McError::Custom(payload))?;
			Ok((self.0, value + version, target))
		}

		fn encode(&self, value: &(i32, i32, i32)) -> McResult<String> {
			Ok(format!("{}@{}", value.1, self.0))
		}
	}

	fn fixer() -> DataFixer<(i32, i32, i32), String, i32> {
		DataFixer::builder()
			.add_codec(10, Tagged(10))
			.add_codec(1, Tagged(1))
			.add_codec(5, Tagged(5))
			.build()
			.unwrap()
	}

	#[test]
	fn resolves_greatest_key_at_or_below() {
		let fixer = fixer();
		assert_eq!(fixer.versions().collect::<Vec<_>>(), vec![1, 5, 10]);
		assert_eq!(fixer.resolve_key(7).unwrap(), 5);
		assert_eq!(fixer.resolve_key(5).unwrap(), 5);
		assert_eq!(fixer.resolve_key(1).unwrap(), 1);
		assert_eq!(fixer.resolve_key(1000).unwrap(), 10);
		assert!(matches!(fixer.resolve_key(0), Err(McError::UnresolvableVersion(v)) if v == "0"));
	}

	#[test]
	fn decode_and_encode_use_resolved_codec() {
		let fixer = fixer();
		assert_eq!(fixer.decode_at("3".to_owned(), 7, 12).unwrap(), (5, 10, 12));
		assert_eq!(fixer.encode(&(0, 4, 0), 11).unwrap(), "4@10");
		assert!(matches!(fixer.decode_at("x".to_owned(), 7, 12), Err(McError::Custom(_))));
	}

	#[test]
	fn duplicate_keys_are_rejected() {
		let result = DataFixer::<(i32, i32, i32), String, i32>::builder()
			.add_codec(3, Tagged(3))
			.add_codec(3, Tagged(4))
			.build();
		assert!(matches!(result, Err(McError::DuplicateCodec(v)) if v == "3"));
	}
}
