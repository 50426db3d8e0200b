//! Recognising a save directory by its `level.dat`, and opening the
//! storage of each of its dimensions.

use std::{
	fmt::Display,
	path::{Path, PathBuf},
	sync::Arc,
};

use crate::{
	nbt::{io::read_gzip_file, tagpath::TagPath, tagref::TagRef, Map, Tag},
	util::task::{Executor, Inline},
	McResult,
};

use super::{
	codec::chunk::{chunk_fixer, ChunkFixer},
	storage::{AnvilWorldStorage, StorageOptions},
	version::DataVersion,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
	Overworld,
	Nether,
	End,
}

impl Dimension {
	pub const ALL: [Dimension; 3] = [Dimension::Overworld, Dimension::Nether, Dimension::End];

	/// The directory below the save root that holds the dimension's
	/// `region` directory.
	pub const fn directory(self) -> &'static str {
		match self {
			Dimension::Overworld => "",
			Dimension::Nether => "DIM-1",
			Dimension::End => "DIM1",
		}
	}
}

impl Display for Dimension {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Dimension::Overworld => "overworld",
			Dimension::Nether => "the_nether",
			Dimension::End => "the_end",
		})
	}
}

/// Detects saves in the Anvil format.
pub struct AnvilSaveFormat;

impl AnvilSaveFormat {
	/// Opens the save at `root`. Returns `None` if there is no `level.dat`,
	/// or if it has no `Data` compound, since then the directory is not a
	/// save in this format.
	pub fn try_open<P: AsRef<Path>>(root: P, options: StorageOptions) -> McResult<Option<AnvilSave>> {
		let root = root.as_ref();
		let level_path = root.join("level.dat");
		if !level_path.is_file() {
			log::debug!("no level.dat in {}", root.display());
			return Ok(None);
		}
		let level = read_gzip_file(&level_path, options.nbt_limits)?.take_tag();
		let Some(data) = level.get("Data").and_then(Tag::as_compound) else {
			log::debug!("{} has no Data compound", level_path.display());
			return Ok(None);
		};
		let data_version = first_int(data, &["DataVersion", "Version.Id"])?
			.and_then(|version| i32::try_from(version).ok())
			.map_or(DataVersion::PRE_15W32A, DataVersion::from_stored);
		let level_name = data.get("LevelName")
			.and_then(Tag::as_str)
			.unwrap_or_default()
			.to_owned();
		log::debug!("opened save `{level_name}` at {} (data version {data_version})", root.display());
		Ok(Some(AnvilSave {
			root: root.to_owned(),
			level_name,
			data_version,
			data: data.clone(),
			options,
			chunk_fixer: Arc::new(chunk_fixer()?),
			executor: Arc::new(Inline),
		}))
	}
}

/// The first of `paths` inside `data` that holds an integer.
fn first_int(data: &Map, paths: &[&str]) -> McResult<Option<i64>> {
	for path in paths {
		if let Some(value) = TagPath::parse(path)?.lookup(data).and_then(|value| value.as_i64()) {
			return Ok(Some(value));
		}
	}
	Ok(None)
}

/// An open save. Every dimension shares the same codecs and executor.
pub struct AnvilSave {
	root: PathBuf,
	level_name: String,
	data_version: DataVersion,
	data: Map,
	options: StorageOptions,
	chunk_fixer: Arc<ChunkFixer>,
	executor: Arc<dyn Executor>,
}

impl AnvilSave {
	pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
		self.executor = executor;
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn level_name(&self) -> &str {
		&self.level_name
	}

	/// `Data.DataVersion`, or `Data.Version.Id` when that is missing.
	pub fn data_version(&self) -> DataVersion {
		self.data_version
	}

	/// The name of the game version that last wrote the save.
	pub fn version_name(&self) -> Option<&str> {
		self.level_value("Version.Name").ok()??.as_str()
	}

	/// The value at `path` inside the `Data` compound, such as
	/// `Version.Name` or `WorldGenSettings.dimensions`.
	pub fn level_value(&self, path: &str) -> McResult<Option<TagRef<'_>>> {
		Ok(TagPath::parse(path)?.lookup(&self.data))
	}

	/// The `Data` compound of `level.dat`.
	pub fn level_data(&self) -> &Map {
		&self.data
	}

	/// Dimensions whose directory exists.
	pub fn dimensions(&self) -> Vec<Dimension> {
		Dimension::ALL.into_iter()
			.filter(|dimension| self.root.join(dimension.directory()).join("region").is_dir())
			.collect()
	}

	/// Opens the storage of `dimension`. Chunks are decoded for the save's
	/// data version unless the options name another one.
	pub fn world(&self, dimension: Dimension) -> McResult<AnvilWorldStorage> {
		let mut options = self.options.clone();
		options.world_version.get_or_insert(self.data_version);
		AnvilWorldStorage::with_parts(
			self.root.join(dimension.directory()),
			options,
			Arc::clone(&self.chunk_fixer),
			Arc::clone(&self.executor),
		)
	}
}
