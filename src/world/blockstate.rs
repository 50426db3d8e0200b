use std::fmt::Display;

use sorted_vec::SortedVec;

use crate::{
	nbt::{tag::*, Map},
	McResult,
};

use super::codec::DecodeContext;

/// Create a [BlockState].
///
/// Syntax:
/// ```rs
/// blockstate!(air)
/// // Becomes
/// BlockState::new("minecraft:air", BlockProperties::none())
///
/// blockstate!(namespace:tile[prop1="string_literal", prop2=identifier, prop3=10])
/// // Becomes
/// BlockState::new("namespace:tile", BlockProperties::from([
/// 	("prop1".to_owned(), "string_literal".to_owned()),
/// 	("prop2".to_owned(), "identifier".to_owned()),
/// 	("prop3".to_owned(), "10".to_owned())
/// ]))
/// ```
#[macro_export]
macro_rules! blockstate {
	($id:ident) => {
		// We assume 'minecraft' namespace by default.
		$crate::blockstate!(minecraft:$id)
	};
	($id:ident [ $($name:tt = $value:tt),+$(,)? ]) => {
		$crate::blockstate!(minecraft:$id[ $($name = $value),+ ])
	};
	($namespace:ident:$id:ident) => {
		$crate::world::blockstate::BlockState::new(
			format!("{}:{}", stringify!($namespace), stringify!($id)),
			$crate::world::blockstate::BlockProperties::none()
		)
	};
	($namespace:ident:$id:ident [ $($name:tt = $value:tt),+$(,)? ]) => {
		$crate::world::blockstate::BlockState::new(
			format!("{}:{}", stringify!($namespace), stringify!($id)),
			$crate::world::blockstate::BlockProperties::from([
				$(
					(
						$crate::blockstate!(@decode_token; $name),
						$crate::blockstate!(@decode_token; $value)
					),
				)+
			])
		)
	};
	(@decode_token; $value:literal) => {
		$value.to_string()
	};
	(@decode_token; $value:ident) => {
		stringify!($value).to_owned()
	};
	(@decode_token; $value:expr) => {
		($value).to_string()
	};
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct BlockProperty {
	pub name: String,
	pub value: String,
}

impl BlockProperty {
	pub fn new<S1: AsRef<str>, S2: AsRef<str>>(name: S1, value: S2) -> Self {
		Self {
			name: name.as_ref().to_owned(),
			value: value.as_ref().to_owned(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value(&self) -> &str {
		&self.value
	}
}

impl<S1: AsRef<str>, S2: AsRef<str>> From<(S1, S2)> for BlockProperty {
	fn from(value: (S1, S2)) -> Self {
		BlockProperty::new(value.0, value.1)
	}
}

impl From<BlockProperty> for (String, String) {
	fn from(value: BlockProperty) -> Self {
		(value.name, value.value)
	}
}

/// Properties sorted by name, so two states with the same properties
/// compare equal no matter what order they were read in.
#[derive(Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct BlockProperties {
	pub properties: Option<SortedVec<BlockProperty>>
}

impl BlockProperties {
	pub fn none() -> Self {
		Self {
			properties: None
		}
	}

	pub fn is_empty(&self) -> bool {
		self.properties.as_ref().map_or(true, |properties| properties.is_empty())
	}

	pub fn properties(&self) -> Option<&[BlockProperty]> {
		self.properties.as_ref().map(|properties| properties.as_slice())
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.properties()?
			.iter()
			.find(|property| property.name == name)
			.map(BlockProperty::value)
	}
}

impl<T: Into<BlockProperty>, It: IntoIterator<Item = T>> From<It> for BlockProperties {
	fn from(value: It) -> Self {
		let properties = value.into_iter()
			.map(T::into)
			.collect::<Vec<BlockProperty>>();
		if properties.is_empty() {
			return Self::none();
		}
		Self {
			properties: Some(properties.into())
		}
	}
}

#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct BlockState {
	name: String,
	properties: BlockProperties,
}

impl BlockState {
	pub fn new<S: AsRef<str>, P: Into<BlockProperties>>(name: S, properties: P) -> Self {
		Self {
			name: name.as_ref().to_owned(),
			properties: properties.into(),
		}
	}

	pub fn air() -> Self {
		blockstate!(air)
	}

	pub fn is_air(&self) -> bool {
		matches!(self.name.as_str(), "minecraft:air" | "minecraft:cave_air" | "minecraft:void_air")
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn properties(&self) -> Option<&[BlockProperty]> {
		self.properties.properties()
	}

	pub fn property(&self, name: &str) -> Option<&str> {
		self.properties.get(name)
	}

	/// Sets a property, replacing any previous value with the same name.
	pub fn with_property<S1: AsRef<str>, S2: AsRef<str>>(self, name: S1, value: S2) -> Self {
		let name = name.as_ref();
		let mut properties: Vec<BlockProperty> = self.properties.properties
			.map(|properties| properties.into_vec())
			.unwrap_or_default();
		properties.retain(|property| property.name != name);
		properties.push(BlockProperty::new(name, value));
		Self {
			name: self.name,
			properties: properties.into(),
		}
	}

	/// The palette entry form: `Name`, plus `Properties` when there are any.
	pub fn to_map(&self) -> Map {
		let mut map = Map::new();
		map.insert("Name".to_owned(), Tag::String(self.name.clone()));
		if let Some(properties) = self.properties() {
			let properties: Map = properties.iter()
				.map(|prop| (prop.name.clone(), Tag::String(prop.value.clone())))
				.collect();
			map.insert("Properties".to_owned(), Tag::Compound(properties));
		}
		map
	}

	/// Reads a palette entry. Keys other than `Name` and `Properties` are
	/// ignored.
	pub fn decode(mut map: Map, context: &DecodeContext) -> McResult<Self> {
		let name: String = context.take(&mut map, "Name")?;
		let properties: BlockProperties = match context.take_opt::<Map>(&mut map, "Properties")? {
			Some(properties) => {
				let context = context.child("Properties");
				properties.into_iter()
					.map(|(key, value)| {
						let value: String = context.convert(key.as_str(), value)?;
						Ok((key, value))
					})
					.collect::<McResult<Vec<(String, String)>>>()?
					.into()
			}
			None => BlockProperties::none(),
		};
		Ok(Self::new(name, properties))
	}
}

// Allows for creating BlockState from strings.
impl<S: AsRef<str>> From<S> for BlockState {
	fn from(value: S) -> Self {
		BlockState::new(value, BlockProperties::none())
	}
}

impl EncodeNbt for BlockState {
	fn encode_nbt(self) -> Tag {
		Tag::Compound(self.to_map())
	}
}

impl Display for BlockState {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", &self.name)?;
		if !self.properties.is_empty() {
			write!(f, "{}", &self.properties)?;
		}
		Ok(())
	}
}

impl Display for BlockProperties {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "[")?;
		for (index, prop) in self.properties().unwrap_or_default().iter().enumerate() {
			if index > 0 {
				write!(f, ",")?;
			}
			write!(f, "{}={}", &prop.name, &prop.value)?;
		}
		write!(f, "]")
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::world::version::DataVersion;

	#[test]
	fn macro_and_display() {
		let state = blockstate!(oak_stairs[half = "top", facing = north]);
		assert_eq!(state.name(), "minecraft:oak_stairs");
		// Sorted by name.
		assert_eq!(state.to_string(), "minecraft:oak_stairs[facing=north,half=top]");
		assert_eq!(state.property("half"), Some("top"));
		assert_eq!(BlockState::air().to_string(), "minecraft:air");
		assert!(BlockState::air().is_air());
	}

	#[test]
	fn property_order_does_not_matter() {
		let a = BlockState::new("minecraft:wheat", [("age", "3"), ("x", "1")]);
		let b = BlockState::new("minecraft:wheat", [("x", "1"), ("age", "3")]);
		assert_eq!(a, b);
		assert_eq!(BlockState::new("minecraft:stone", Vec::<(&str, &str)>::new()), BlockState::from("minecraft:stone"));
		let replaced = a.with_property("age", "7");
		assert_eq!(replaced.property("age"), Some("7"));
		assert_eq!(replaced.properties().map(<[_]>::len), Some(2));
	}

	#[test]
	fn palette_entry_round_trip() {
		let context = DecodeContext::new(DataVersion::LATEST);
		let state = blockstate!(redstone_wire[power = 15]);
		let decoded = BlockState::decode(state.to_map(), &context).unwrap();
		assert_eq!(decoded, state);
		assert!(!BlockState::air().to_map().contains_key("Properties"));

		let mut bad = state.to_map();
		bad.insert("Properties".to_owned(), crate::compound! { ("power", 15i32) });
		let err = BlockState::decode(bad, &context).unwrap_err().to_string();
		assert!(err.contains("Properties.power"), "{err}");
	}
}
