//! The in-memory chunk model that every stored layout decodes into.

use std::borrow::Cow;

use crate::{
	McError, McResult,
	data::bitarray::{BitArray, PackedBitArray},
	math::bit::palette_bits,
	nbt::Map,
};

use super::{
	blockstate::BlockState,
	version::DataVersion,
};

/// Blocks in a 16x16x16 section.
pub const SECTION_VOLUME: usize = 4096;

/// The blocks of a section as a palette and one palette index per block.
/// Indices are ordered `y`, then `z`, then `x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStates {
	palette: Vec<BlockState>,
	indices: PackedBitArray,
}

impl BlockStates {
	/// Index arrays are never narrower than this.
	pub const MIN_BITS: u32 = 4;

	/// A section where every block is `state`.
	pub fn filled(state: BlockState) -> Self {
		Self {
			palette: vec![state],
			indices: PackedBitArray::zeroed(Self::MIN_BITS, SECTION_VOLUME),
		}
	}

	pub fn air() -> Self {
		Self::filled(BlockState::air())
	}

	/// Pairs a palette with its indices. Every index must point into the
	/// palette.
	pub fn from_indices(palette: Vec<BlockState>, indices: PackedBitArray) -> McResult<Self> {
		if palette.is_empty() {
			return McError::custom("a block palette needs at least one entry");
		}
		if indices.len() != SECTION_VOLUME {
			return McError::custom(format!("a section has {SECTION_VOLUME} blocks, found {}", indices.len()));
		}
		if let Some(index) = indices.iter().find(|&index| index as usize >= palette.len()) {
			return Err(McError::IndexOutOfBounds {
				index: index as usize,
				len: palette.len(),
			});
		}
		Ok(Self {
			palette,
			indices,
		})
	}

	/// Packs `values` at the narrowest width the palette allows.
	pub fn from_values<I: IntoIterator<Item = u32>>(palette: Vec<BlockState>, values: I) -> McResult<Self> {
		let bits = palette_bits(palette.len(), Self::MIN_BITS);
		let indices = PackedBitArray::from_values(bits, SECTION_VOLUME, values)?;
		Self::from_indices(palette, indices)
	}

	pub const fn index(x: usize, y: usize, z: usize) -> usize {
		((y & 15) << 8) | ((z & 15) << 4) | (x & 15)
	}

	pub fn palette(&self) -> &[BlockState] {
		&self.palette
	}

	pub fn indices(&self) -> &PackedBitArray {
		&self.indices
	}

	/// The width that the palette needs, which may be narrower than the
	/// current indices after blocks were removed from use.
	pub fn required_bits(&self) -> u32 {
		palette_bits(self.palette.len(), Self::MIN_BITS)
	}

	pub fn is_uniform(&self) -> bool {
		self.palette.len() == 1
	}

	/// The block at local coordinates. Coordinates wrap at 16.
	pub fn get(&self, x: usize, y: usize, z: usize) -> Option<&BlockState> {
		let index = self.indices.get(Self::index(x, y, z)).ok()?;
		self.palette.get(index as usize)
	}

	pub fn set(&mut self, x: usize, y: usize, z: usize, state: BlockState) -> McResult<()> {
		let id = match self.palette.iter().position(|entry| *entry == state) {
			Some(id) => id,
			None => {
				self.palette.push(state);
				let required = self.required_bits();
				if required > self.indices.bits() {
					let values: Vec<u32> = self.indices.iter().collect();
					self.indices = PackedBitArray::from_values(required, SECTION_VOLUME, values)?;
				}
				self.palette.len() - 1
			}
		};
		self.indices.set(Self::index(x, y, z), id as u32)
	}

	/// Drops palette entries that no block points at, and packs the
	/// indices at the width the remaining palette needs. Returns how many
	/// entries were removed.
	pub fn compact(&mut self) -> McResult<usize> {
		let compacted = match self.compacted()? {
			Cow::Owned(compacted) => compacted,
			Cow::Borrowed(_) => return Ok(0),
		};
		let removed = self.palette.len() - compacted.palette.len();
		*self = compacted;
		Ok(removed)
	}

	/// A compacted copy, or `self` when there is nothing to drop.
	pub fn compacted(&self) -> McResult<Cow<'_, Self>> {
		let mut used = vec![false; self.palette.len()];
		for index in self.indices.iter() {
			if let Some(used) = used.get_mut(index as usize) {
				*used = true;
			}
		}
		if used.iter().all(|&used| used) {
			return Ok(Cow::Borrowed(self));
		}
		let mut remap = vec![0u32; self.palette.len()];
		let mut palette = Vec::new();
		for (old, state) in self.palette.iter().enumerate() {
			if used[old] {
				remap[old] = palette.len() as u32;
				palette.push(state.clone());
			}
		}
		let values: Vec<u32> = self.indices.iter().map(|index| remap[index as usize]).collect();
		Self::from_values(palette, values).map(Cow::Owned)
	}

	/// Every block in index order.
	pub fn iter(&self) -> impl Iterator<Item = &BlockState> + '_ {
		self.indices.iter().filter_map(|index| self.palette.get(index as usize))
	}
}

impl Default for BlockStates {
	fn default() -> Self {
		Self::air()
	}
}

/// A 16 block tall slice of a chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
	pub y: i8,
	pub blocks: BlockStates,
	pub block_light: Option<Vec<i8>>,
	pub sky_light: Option<Vec<i8>>,
	/// Per-section biomes, only stored by newer versions.
	pub biomes: Option<Map>,
	/// Entries that weren't decoded, written back when saving.
	pub extra: Map,
}

impl Section {
	/// An empty section filled with air.
	pub fn new(y: i8) -> Self {
		Self {
			y,
			blocks: BlockStates::air(),
			block_light: None,
			sky_light: None,
			biomes: None,
			extra: Map::new(),
		}
	}
}

/// Fields of a command block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBlock {
	pub custom_name: Option<String>,
	pub command: Option<String>,
	pub success_count: i32,
	pub track_output: bool,
	/// Only kept while `track_output` is set.
	pub last_output: Option<String>,
}

impl Default for CommandBlock {
	fn default() -> Self {
		Self {
			custom_name: None,
			command: None,
			success_count: 0,
			track_output: true,
			last_output: None,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sign {
	/// Text components for each line, as stored.
	pub lines: [String; 4],
	/// The back side, which only exists from 1.20 on.
	pub back_lines: [String; 4],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chest {
	pub custom_name: Option<String>,
	pub items: Vec<Map>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TileEntityKind {
	CommandBlock(CommandBlock),
	Sign(Sign),
	Chest(Chest),
	/// A tile entity without a dedicated decoder, kept as it was stored.
	Other(Map),
}

/// Extra data attached to a block, such as the text on a sign.
#[derive(Debug, Clone, PartialEq)]
pub struct TileEntity {
	pub id: String,
	pub x: i32,
	pub y: i32,
	pub z: i32,
	pub kind: TileEntityKind,
	/// Entries that weren't decoded, written back when saving.
	pub extra: Map,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
	pub x: i32,
	pub z: i32,
	/// The data version the chunk was stored with.
	pub version: DataVersion,
	pub last_update: i64,
	pub inhabited_time: i64,
	pub status: String,
	/// Sorted by `y`.
	pub sections: Vec<Section>,
	pub tile_entities: Vec<TileEntity>,
	pub heightmaps: Map,
	/// Entries that weren't decoded, written back when saving.
	pub extra: Map,
	/// Undecoded entries found beside the `Level` compound of older
	/// layouts. They go back beside it, or into the root once there is
	/// no `Level` any more.
	pub root_extra: Map,
}

impl Chunk {
	pub fn new(x: i32, z: i32, version: DataVersion) -> Self {
		Self {
			x,
			z,
			version,
			last_update: 0,
			inhabited_time: 0,
			status: String::from("empty"),
			sections: Vec::new(),
			tile_entities: Vec::new(),
			heightmaps: Map::new(),
			extra: Map::new(),
			root_extra: Map::new(),
		}
	}

	pub fn section(&self, y: i8) -> Option<&Section> {
		self.sections.iter().find(|section| section.y == y)
	}

	pub fn section_mut(&mut self, y: i8) -> Option<&mut Section> {
		self.sections.iter_mut().find(|section| section.y == y)
	}

	/// The section at `y`, inserting an air section if there is none.
	pub fn section_or_insert(&mut self, y: i8) -> &mut Section {
		let index = match self.sections.binary_search_by_key(&y, |section| section.y) {
			Ok(index) => index,
			Err(index) => {
				self.sections.insert(index, Section::new(y));
				index
			}
		};
		&mut self.sections[index]
	}

	/// Keeps sections ordered after they were added out of order.
	pub fn sort_sections(&mut self) {
		self.sections.sort_by_key(|section| section.y);
	}

	/// The block at `(x, y, z)`, where `x` and `z` are local to the chunk
	/// and `y` is the absolute height.
	pub fn block(&self, x: usize, y: i32, z: usize) -> Option<&BlockState> {
		let section = self.section(section_y(y)?)?;
		section.blocks.get(x, (y & 15) as usize, z)
	}

	pub fn set_block(&mut self, x: usize, y: i32, z: usize, state: BlockState) -> McResult<()> {
		let Some(section_y) = section_y(y) else {
			return Err(McError::Custom(format!("height {y} is outside of the range a section can hold")));
		};
		self.section_or_insert(section_y).blocks.set(x, (y & 15) as usize, z, state)
	}

	/// The tile entity at absolute block coordinates.
	pub fn tile_entity(&self, x: i32, y: i32, z: i32) -> Option<&TileEntity> {
		self.tile_entities.iter().find(|tile| (tile.x, tile.y, tile.z) == (x, y, z))
	}
}

fn section_y(y: i32) -> Option<i8> {
	i8::try_from(y >> 4).ok()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::blockstate;

	#[test]
	fn palette_grows_and_widens() {
		let mut blocks = BlockStates::air();
		assert!(blocks.is_uniform());
		assert_eq!(blocks.indices().bits(), 4);
		for i in 0..20usize {
			let state = BlockState::new(format!("minecraft:test_{i}"), Vec::<(&str, &str)>::new());
			blocks.set(i, i, i, state).unwrap();
		}
		assert_eq!(blocks.palette().len(), 21);
		assert_eq!(blocks.indices().bits(), 5);
		assert_eq!(blocks.get(5, 5, 5).unwrap().name(), "minecraft:test_5");
		// Coordinates wrap, so 19 overwrote 3.
		assert_eq!(blocks.get(3, 3, 3).unwrap().name(), "minecraft:test_19");
		assert_eq!(blocks.get(16 + 19, 19, 19).unwrap().name(), "minecraft:test_19");
		assert!(blocks.get(0, 1, 0).unwrap().is_air());
		// Existing entries are reused.
		blocks.set(1, 2, 3, blockstate!(test_0)).unwrap();
		assert_eq!(blocks.palette().len(), 21);
		assert_eq!(blocks.iter().count(), SECTION_VOLUME);
	}

	#[test]
	fn unused_palette_entries_are_dropped() {
		let mut blocks = BlockStates::air();
		for i in 0..17usize {
			let state = BlockState::new(format!("minecraft:test_{i}"), Vec::<(&str, &str)>::new());
			blocks.set(i % 16, i / 16, 0, state).unwrap();
		}
		assert_eq!(blocks.indices().bits(), 5);
		assert!(matches!(blocks.compacted().unwrap(), Cow::Borrowed(_)));
		for i in 0..16usize {
			blocks.set(i, 0, 0, blockstate!(stone)).unwrap();
		}
		// Only air, stone and test_16 are left.
		assert_eq!(blocks.compact().unwrap(), 16);
		let names: Vec<&str> = blocks.palette().iter().map(BlockState::name).collect();
		assert_eq!(names, vec!["minecraft:air", "minecraft:test_16", "minecraft:stone"]);
		assert_eq!(blocks.indices().bits(), 4);
		assert_eq!(blocks.get(3, 0, 0), Some(&blockstate!(stone)));
		assert_eq!(blocks.get(0, 0, 1), Some(&BlockState::air()));
		assert_eq!(blocks.get(0, 1, 0).unwrap().name(), "minecraft:test_16");
		assert_eq!(blocks.compact().unwrap(), 0);
	}

	#[test]
	fn indices_must_point_into_palette() {
		let indices = PackedBitArray::from_values(4, SECTION_VOLUME, [0, 1, 2]).unwrap();
		let result = BlockStates::from_indices(vec![BlockState::air(), blockstate!(stone)], indices);
		assert!(matches!(result, Err(McError::IndexOutOfBounds { index: 2, len: 2 })));
		let short = PackedBitArray::new(4, 16).unwrap();
		assert!(BlockStates::from_indices(vec![BlockState::air()], short).is_err());
	}

	#[test]
	fn chunk_blocks_and_sections() {
		let mut chunk = Chunk::new(3, -2, DataVersion::LATEST);
		chunk.set_block(1, -20, 2, blockstate!(stone)).unwrap();
		chunk.set_block(1, 40, 2, blockstate!(dirt)).unwrap();
		assert_eq!(chunk.sections.iter().map(|s| s.y).collect::<Vec<_>>(), vec![-2, 2]);
		assert_eq!(chunk.block(1, -20, 2), Some(&blockstate!(stone)));
		assert_eq!(chunk.block(1, 40, 2), Some(&blockstate!(dirt)));
		assert_eq!(chunk.block(1, 41, 2), Some(&BlockState::air()));
		assert_eq!(chunk.block(1, 100, 2), None);
		assert!(chunk.set_block(0, 4000, 0, blockstate!(stone)).is_err());
	}
}
