use std::fmt::{Display, Write};
use std::str::FromStr;

use chumsky::prelude::*;

use thiserror::Error;

use crate::nbt::tag::*;
use crate::nbt::tagref::TagRef;

#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug)]
pub enum TagPathPart {
	AtIndex(i64),
	AtKey(String),
}

macro_rules! tag_path_part_from_impl {
	($valname:ident : $from_type:ty; AtKey($value:expr)) => {
		impl From<$from_type> for TagPathPart {
			fn from($valname: $from_type) -> Self {
				TagPathPart::AtKey($value)
			}
		}
	};
	($from_type:ty; Numeric) => {
		impl From<$from_type> for TagPathPart {
			fn from(value: $from_type) -> Self {
				TagPathPart::AtIndex(value as i64)
			}
		}
	};
}

tag_path_part_from_impl!(value:&str; AtKey(value.to_owned()));
tag_path_part_from_impl!(value:String; AtKey(value));
tag_path_part_from_impl!(usize; Numeric);
tag_path_part_from_impl!(i64; Numeric);
tag_path_part_from_impl!(i32; Numeric);
tag_path_part_from_impl!(u32; Numeric);

#[derive(Debug, Error)]
pub enum TagPathError {
	#[error("Failed to parse tag path: {0:?}")]
	ParseError(Vec<Simple<char>>),
}

/// A location inside a [Tag] tree, such as `Level.Sections[3].Palette`.
/// Used to report where decoding went wrong.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug, Default)]
pub struct TagPath(pub Vec<TagPathPart>);

impl TagPath {
	/// The path of the root tag.
	pub const fn root() -> Self {
		TagPath(Vec::new())
	}

	pub fn parse<S: AsRef<str>>(source: S) -> Result<Self, TagPathError> {
		tag_path_parser()
			.parse(source.as_ref())
			.map(TagPath)
			.map_err(TagPathError::ParseError)
	}

	pub fn path(&self) -> &[TagPathPart] {
		&self.0
	}

	pub fn join<T: Into<TagPathPart>>(&self, path: T) -> TagPath {
		let mut parts = self.0.clone();
		parts.push(path.into());
		TagPath(parts)
	}

	/// Follows the path from `root` through Compound keys and list or
	/// array indices.
	pub fn lookup<'a, R: Into<TagRef<'a>>>(&self, root: R) -> Option<TagRef<'a>> {
		self.0.iter().try_fold(root.into(), |tag, part| tag.child(part))
	}
}

fn is_identifier_char(c: char) -> bool {
	c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')
}

fn is_identifier(key: &str) -> bool {
	!key.is_empty()
	&& key.chars().all(is_identifier_char)
	// Would be read back as an index.
	&& !key.chars().all(|c| c.is_ascii_digit() || c == '-')
}

fn tag_path_parser() -> impl Parser<char, Vec<TagPathPart>, Error = Simple<char>> {
	let escape = just('\\').ignore_then(choice((
		just('\\'),
		just('/'),
		just('"'),
		just('\''),
		just('b').to('\x08'),
		just('f').to('\x0C'),
		just('n').to('\n'),
		just('r').to('\r'),
		just('t').to('\t'),
	)));

	let string_literal = choice((
		just('"')
			.ignore_then(none_of("\\\"").or(escape.clone()).repeated())
			.then_ignore(just('"')),
		just('\'')
			.ignore_then(none_of("\\'").or(escape).repeated())
			.then_ignore(just('\'')),
	))
	.collect::<String>()
	.labelled("String Literal");

	let identifier = filter(|c: &char| is_identifier_char(*c))
		.repeated().at_least(1)
		.collect::<String>()
		.labelled("Identifier");

	let index = just('-')
		.or_not()
		.then(text::int(10))
		.try_map(|(sign, digits): (Option<char>, String), span| {
			let text = if sign.is_some() { format!("-{digits}") } else { digits };
			text.parse::<i64>()
				.map(TagPathPart::AtIndex)
				.map_err(|_| Simple::custom(span, "Failed to parse i64."))
		})
		.labelled("Index");

	let bracketed = choice((
		index,
		string_literal.map(TagPathPart::AtKey),
		identifier.clone().map(TagPathPart::AtKey),
	))
	.delimited_by(just('['), just(']'));

	let key = identifier.map(TagPathPart::AtKey);

	let tail = choice((
		just('.').ignore_then(key.clone()),
		bracketed.clone(),
	))
	.repeated();

	choice((key, bracketed))
		.then(tail)
		.map(|(head, mut tail)| {
			tail.insert(0, head);
			tail
		})
		.then_ignore(end())
}

impl FromStr for TagPath {
	type Err = TagPathError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		TagPath::parse(s)
	}
}

impl Display for TagPath {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		if self.0.is_empty() {
			return f.write_str("<root>");
		}
		for (position, part) in self.0.iter().enumerate() {
			match part {
				TagPathPart::AtIndex(index) => write!(f, "[{index}]")?,
				TagPathPart::AtKey(key) if is_identifier(key) => {
					if position != 0 {
						f.write_char('.')?;
					}
					f.write_str(key)?;
				}
				TagPathPart::AtKey(key) => {
					f.write_str("[\"")?;
					for c in key.chars() {
						match c {
							'"' => f.write_str("\\\"")?,
							'\\' => f.write_str("\\\\")?,
							'\n' => f.write_str("\\n")?,
							'\t' => f.write_str("\\t")?,
							other => f.write_char(other)?,
						}
					}
					f.write_str("\"]")?;
				}
			}
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::compound;

	#[test]
	fn parse_paths() {
		let path = TagPath::parse("Level.Sections[3].Palette[-1]").unwrap();
		assert_eq!(path, TagPath(vec![
			"Level".into(),
			"Sections".into(),
			3i64.into(),
			"Palette".into(),
			(-1i64).into(),
		]));
		let quoted = TagPath::parse(r#"root["with space"]['it\'s']"#).unwrap();
		assert_eq!(quoted.path()[1], TagPathPart::AtKey("with space".to_owned()));
		assert_eq!(quoted.path()[2], TagPathPart::AtKey("it's".to_owned()));
		assert!(TagPath::parse("").is_err());
		assert!(TagPath::parse("a..b").is_err());
	}

	#[test]
	fn display_round_trips() {
		for source in ["Level.Sections[3].Palette", r#"block_entities[0]["Custom Name"]"#, "[2].x"] {
			let path: TagPath = source.parse().unwrap();
			assert_eq!(path.to_string(), source);
			assert_eq!(TagPath::parse(path.to_string()).unwrap(), path);
		}
		assert_eq!(TagPath::root().to_string(), "<root>");
	}

	#[test]
	fn lookup_follows_keys_and_indices() {
		let tag = compound! {
			("Level", compound! {
				("xPos", 4i32),
				("Sections", ListTag::Compound(vec![
					crate::nbt::Map::from([("Y".to_owned(), Tag::Byte(0))]),
					crate::nbt::Map::from([("Y".to_owned(), Tag::Byte(1))]),
				])),
			}),
		};
		let path = TagPath::parse("Level.xPos").unwrap();
		assert_eq!(path.lookup(&tag), Some(TagRef::Int(4)));
		assert_eq!(TagPath::parse("Level.Sections[1].Y").unwrap().lookup(&tag), Some(TagRef::Byte(1)));
		assert_eq!(TagPath::parse("Level.zPos").unwrap().lookup(&tag), None);
		assert_eq!(TagPath::root().lookup(&tag), Some(TagRef::from(&tag)));
	}
}
