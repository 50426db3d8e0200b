//! Named Binary Tag trees and their big-endian binary encoding.

pub mod tag;
pub mod tagpath;
pub mod tagref;
pub mod io;
pub mod macros;

use std::string::FromUtf8Error;

use thiserror::Error;

pub use tag::{
	Tag,
	TagID,
	ListTag,
	NamedTag,
	DecodeNbt,
	EncodeNbt,
};

/// Compound entries keep the order they were read in, so a tree that
/// is decoded and written back produces the same bytes.
pub type Map = indexmap::IndexMap<String, Tag>;

#[derive(Debug, Error)]
pub enum NbtError {
	#[error("IO Error: {0}")]
	IoError(std::io::Error),
	#[error("NBT data ended early.")]
	Truncated,
	#[error("Unsupported Tag ID: {0}")]
	UnsupportedTagId(u8),
	#[error("Encountered the End Tag ID marker.")]
	EndTagMarker,
	#[error("Failed to convert to UTF-8 string.")]
	FromUtf8Error(#[from] FromUtf8Error),
	#[error("Negative length: {0}")]
	NegativeLength(i32),
	#[error("Length of {len} exceeds the limit of {limit}.")]
	LengthLimitExceeded {
		len: usize,
		limit: usize,
	},
	#[error("Length of {0} is too large to be written.")]
	LengthTooLarge(usize),
	#[error("Nesting exceeds the limit of {0} levels.")]
	DepthLimitExceeded(usize),
	#[error("String of {0} bytes is too long to be written.")]
	StringTooLong(usize),
	#[error("Duplicate key in Compound: \"{0}\"")]
	DuplicateKey(String),
	#[error("List with End element type has {0} elements.")]
	NonEmptyEndList(usize),
	#[error("List elements must all be the same type, found {expected} and {found}.")]
	HeterogeneousList {
		expected: TagID,
		found: TagID,
	},
	#[error("Expected {expected}, found {found}.")]
	TypeMismatch {
		expected: TagID,
		found: TagID,
	},
}

impl From<std::io::Error> for NbtError {
	fn from(value: std::io::Error) -> Self {
		if value.kind() == std::io::ErrorKind::UnexpectedEof {
			NbtError::Truncated
		} else {
			NbtError::IoError(value)
		}
	}
}

pub type NbtResult<T> = Result<T, NbtError>;
