//! Chunk codecs. Each one handles the outer layout of a chunk and hands
//! its sections and tile entities to their own fixers.

use std::sync::Arc;

use crate::{
	map_decoder,
	nbt::{ListTag, Map, Tag},
	world::{
		chunk::{Chunk, Section, TileEntity},
		fixer::{Codec, DataFixer},
		version::DataVersion,
	},
	McError, McResult,
};

use super::{
	section::{section_fixer, SectionFixer},
	tile::TileEntityRegistry,
	DecodeContext,
};

pub type ChunkFixer = DataFixer<Chunk, Map, DataVersion>;

/// The fixers that every chunk codec delegates to.
#[derive(Clone)]
pub struct ChunkParts {
	pub sections: Arc<SectionFixer>,
	pub tiles: Arc<TileEntityRegistry>,
}

impl ChunkParts {
	pub fn new(sections: SectionFixer, tiles: TileEntityRegistry) -> Self {
		Self {
			sections: Arc::new(sections),
			tiles: Arc::new(tiles),
		}
	}

	pub fn vanilla() -> McResult<Self> {
		Ok(Self::new(section_fixer()?, TileEntityRegistry::vanilla()?))
	}

	/// `context` is the position of the list itself.
	fn decode_sections(&self, context: &DecodeContext, sections: Vec<Map>, target: DataVersion) -> McResult<Vec<Section>> {
		let mut sections = sections.into_iter()
			.enumerate()
			.map(|(index, section)| {
				context.child(index).nest(self.sections.decode_at(section, context.version(), target))
			})
			.collect::<McResult<Vec<Section>>>()?;
		sections.sort_by_key(|section| section.y);
		Ok(sections)
	}

	fn encode_sections(&self, chunk: &Chunk) -> McResult<Tag> {
		chunk.sections.iter()
			.map(|section| self.sections.encode(section, chunk.version))
			.collect::<McResult<Vec<Map>>>()
			.map(|sections| Tag::List(ListTag::Compound(sections)))
	}

	fn decode_tiles(&self, context: &DecodeContext, tiles: Vec<Map>, target: DataVersion) -> McResult<Vec<TileEntity>> {
		tiles.into_iter()
			.enumerate()
			.map(|(index, tile)| self.tiles.decode(tile, &context.child(index), target))
			.collect()
	}

	fn encode_tiles(&self, chunk: &Chunk) -> McResult<Tag> {
		chunk.tile_entities.iter()
			.map(|tile| self.tiles.encode(tile, chunk.version))
			.collect::<McResult<Vec<Map>>>()
			.map(|tiles| Tag::List(ListTag::Compound(tiles)))
	}
}

/// A fixer with a codec for every chunk layout, sharing `parts`.
pub fn chunk_fixer_with(parts: ChunkParts) -> McResult<ChunkFixer> {
	ChunkFixer::builder()
		.add_codec(DataVersion::PRE_15W32A, LegacyChunkCodec(parts.clone()))
		.add_codec(DataVersion::FLATTENING, FlattenedChunkCodec(parts.clone()))
		.add_codec(DataVersion::V21W43A, ModernChunkCodec(parts))
		.build()
}

pub fn chunk_fixer() -> McResult<ChunkFixer> {
	chunk_fixer_with(ChunkParts::vanilla()?)
}

/// Chunks before the flattening. Everything lives in `Level`, and
/// sections hold numeric block ids.
pub struct LegacyChunkCodec(pub ChunkParts);

impl Codec<Chunk, Map, DataVersion> for LegacyChunkCodec {
	fn decode(&self, mut root: Map, version: DataVersion, target: DataVersion) -> McResult<Chunk> {
		let context = DecodeContext::new(version);
		root.shift_remove("DataVersion");
		let mut level: Map = context.take(&mut root, "Level")?;
		let context = context.child("Level");
		let x = context.take_int(&mut level, "xPos")?;
		let z = context.take_int(&mut level, "zPos")?;
		let last_update = map_decoder!(context, level; "LastUpdate" -> i64 = 0);
		let inhabited_time = map_decoder!(context, level; "InhabitedTime" -> i64 = 0);
		let populated = level.get("TerrainPopulated")
			.and_then(Tag::as_i64)
			.is_some_and(|populated| populated != 0);
		let sections = map_decoder!(context, level; "Sections" -> Vec<Map> = Vec::new());
		let sections = self.0.decode_sections(&context.child("Sections"), sections, target)?;
		let tiles = map_decoder!(context, level; "TileEntities" -> Vec<Map> = Vec::new());
		let tile_entities = self.0.decode_tiles(&context.child("TileEntities"), tiles, target)?;
		Ok(Chunk {
			x,
			z,
			version,
			last_update,
			inhabited_time,
			status: String::from(if populated { "full" } else { "empty" }),
			sections,
			tile_entities,
			heightmaps: Map::new(),
			extra: level,
			root_extra: root,
		})
	}

	fn encode(&self, _chunk: &Chunk) -> McResult<Map> {
		Err(McError::Unsupported("writing chunks with numeric block ids"))
	}
}

/// From 17w47a, still wrapped in `Level`, with a block palette in each
/// section.
pub struct FlattenedChunkCodec(pub ChunkParts);

impl Codec<Chunk, Map, DataVersion> for FlattenedChunkCodec {
	fn decode(&self, mut root: Map, version: DataVersion, target: DataVersion) -> McResult<Chunk> {
		let context = DecodeContext::new(version);
		root.shift_remove("DataVersion");
		let mut level: Map = context.take(&mut root, "Level")?;
		let context = context.child("Level");
		let x = context.take_int(&mut level, "xPos")?;
		let z = context.take_int(&mut level, "zPos")?;
		let last_update = map_decoder!(context, level; "LastUpdate" -> i64 = 0);
		let inhabited_time = map_decoder!(context, level; "InhabitedTime" -> i64 = 0);
		let status = map_decoder!(context, level; "Status" -> String = String::from("empty"));
		let sections = map_decoder!(context, level; "Sections" -> Vec<Map> = Vec::new());
		let sections = self.0.decode_sections(&context.child("Sections"), sections, target)?;
		let tiles = map_decoder!(context, level; "TileEntities" -> Vec<Map> = Vec::new());
		let tile_entities = self.0.decode_tiles(&context.child("TileEntities"), tiles, target)?;
		let heightmaps = map_decoder!(context, level; "Heightmaps" -> Map = Map::new());
		Ok(Chunk {
			x,
			z,
			version,
			last_update,
			inhabited_time,
			status,
			sections,
			tile_entities,
			heightmaps,
			extra: level,
			root_extra: root,
		})
	}

	fn encode(&self, chunk: &Chunk) -> McResult<Map> {
		let mut level = Map::new();
		level.insert("xPos".to_owned(), Tag::Int(chunk.x));
		level.insert("zPos".to_owned(), Tag::Int(chunk.z));
		level.insert("LastUpdate".to_owned(), Tag::Long(chunk.last_update));
		level.insert("InhabitedTime".to_owned(), Tag::Long(chunk.inhabited_time));
		level.insert("Status".to_owned(), Tag::String(chunk.status.clone()));
		level.insert("Sections".to_owned(), self.0.encode_sections(chunk)?);
		level.insert("TileEntities".to_owned(), self.0.encode_tiles(chunk)?);
		level.insert("Heightmaps".to_owned(), Tag::Compound(chunk.heightmaps.clone()));
		level.extend(chunk.extra.clone());
		let mut root = chunk.root_extra.clone();
		root.insert("DataVersion".to_owned(), Tag::Int(chunk.version.value()));
		root.insert("Level".to_owned(), Tag::Compound(level));
		Ok(root)
	}
}

/// From 21w43a. No `Level` wrapper, and lowercase `sections` and
/// `block_entities`.
pub struct ModernChunkCodec(pub ChunkParts);

impl Codec<Chunk, Map, DataVersion> for ModernChunkCodec {
	fn decode(&self, mut root: Map, version: DataVersion, target: DataVersion) -> McResult<Chunk> {
		let context = DecodeContext::new(version);
		root.shift_remove("DataVersion");
		let x = context.take_int(&mut root, "xPos")?;
		let z = context.take_int(&mut root, "zPos")?;
		let last_update = map_decoder!(context, root; "LastUpdate" -> i64 = 0);
		let inhabited_time = map_decoder!(context, root; "InhabitedTime" -> i64 = 0);
		let status = map_decoder!(context, root; "Status" -> String = String::from("empty"));
		let sections = map_decoder!(context, root; "sections" -> Vec<Map> = Vec::new());
		let sections = self.0.decode_sections(&context.child("sections"), sections, target)?;
		let tiles = map_decoder!(context, root; "block_entities" -> Vec<Map> = Vec::new());
		let tile_entities = self.0.decode_tiles(&context.child("block_entities"), tiles, target)?;
		let heightmaps = map_decoder!(context, root; "Heightmaps" -> Map = Map::new());
		Ok(Chunk {
			x,
			z,
			version,
			last_update,
			inhabited_time,
			status,
			sections,
			tile_entities,
			heightmaps,
			extra: root,
			root_extra: Map::new(),
		})
	}

	fn encode(&self, chunk: &Chunk) -> McResult<Map> {
		let mut root = Map::new();
		root.insert("DataVersion".to_owned(), Tag::Int(chunk.version.value()));
		root.insert("xPos".to_owned(), Tag::Int(chunk.x));
		root.insert("zPos".to_owned(), Tag::Int(chunk.z));
		root.insert("LastUpdate".to_owned(), Tag::Long(chunk.last_update));
		root.insert("InhabitedTime".to_owned(), Tag::Long(chunk.inhabited_time));
		root.insert("Status".to_owned(), Tag::String(chunk.status.clone()));
		root.insert("sections".to_owned(), self.0.encode_sections(chunk)?);
		root.insert("block_entities".to_owned(), self.0.encode_tiles(chunk)?);
		root.insert("Heightmaps".to_owned(), Tag::Compound(chunk.heightmaps.clone()));
		root.extend(chunk.extra.clone());
		for (key, tag) in &chunk.root_extra {
			root.entry(key.clone()).or_insert_with(|| tag.clone());
		}
		Ok(root)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{
		blockstate,
		compound,
		world::chunk::{Sign, TileEntityKind},
	};

	fn map(tag: Tag) -> Map {
		match tag {
			Tag::Compound(map) => map,
			_ => unreachable!(),
		}
	}

	fn sample_chunk(version: DataVersion) -> Chunk {
		let mut chunk = Chunk::new(-3, 7, version);
		chunk.status = "full".to_owned();
		chunk.last_update = 1200;
		chunk.inhabited_time = 40;
		for y in [0, 17, 70] {
			chunk.set_block(1, y, 1, blockstate!(stone)).unwrap();
			chunk.set_block(2, y, 1, blockstate!(oak_stairs[facing = east, half = bottom])).unwrap();
		}
		chunk.tile_entities.push(TileEntity {
			id: "minecraft:sign".to_owned(),
			x: -47,
			y: 70,
			z: 113,
			kind: TileEntityKind::Sign(Sign {
				lines: ["\"a\"".into(), "\"b\"".into(), String::new(), String::new()],
				back_lines: Default::default(),
			}),
			extra: Map::new(),
		});
		chunk.heightmaps.insert("WORLD_SURFACE".to_owned(), Tag::LongArray(vec![0; 37]));
		chunk
	}

	#[test]
	fn flattened_round_trip() {
		let fixer = chunk_fixer().unwrap();
		let version = DataVersion::new(1631);
		let mut chunk = sample_chunk(version);
		chunk.extra.insert("Biomes".to_owned(), Tag::IntArray(vec![1; 256]));
		let stored = fixer.encode(&chunk, version).unwrap();
		assert_eq!(stored.get("DataVersion"), Some(&Tag::Int(1631)));
		let level = stored.get("Level").and_then(Tag::as_compound).unwrap();
		assert!(level.contains_key("Sections"));
		assert!(level.contains_key("Biomes"));
		let tile = match level.get("TileEntities") {
			Some(Tag::List(ListTag::Compound(tiles))) => &tiles[0],
			other => panic!("{other:?}"),
		};
		assert_eq!(tile.get("Text2"), Some(&Tag::String("\"b\"".into())));

		let decoded = fixer.decode_at(stored, version, version).unwrap();
		assert_eq!(decoded, chunk);
	}

	#[test]
	fn entries_beside_level_stay_there() {
		let fixer = chunk_fixer().unwrap();
		let version = DataVersion::new(1631);
		let mut stored = fixer.encode(&sample_chunk(version), version).unwrap();
		stored.insert("ForgeCaps".to_owned(), Tag::Compound(map(compound! { ("mod", 1i32) })));
		if let Some(Tag::Compound(level)) = stored.get_mut("Level") {
			level.insert("ForgeCaps".to_owned(), Tag::Int(2));
		}
		let chunk = fixer.decode_at(stored.clone(), version, version).unwrap();
		assert_eq!(chunk.extra.get("ForgeCaps"), Some(&Tag::Int(2)));
		assert!(chunk.root_extra.contains_key("ForgeCaps"));
		assert_eq!(fixer.encode(&chunk, version).unwrap(), stored);

		// Without a Level wrapper both end up in the root, Level entries first.
		let modern = fixer.encode(&chunk, DataVersion::LATEST).unwrap();
		assert_eq!(modern.get("ForgeCaps"), Some(&Tag::Int(2)));
	}

	#[test]
	fn modern_round_trip() {
		let fixer = chunk_fixer().unwrap();
		let mut chunk = sample_chunk(DataVersion::LATEST);
		chunk.extra.insert("yPos".to_owned(), Tag::Int(-4));
		let stored = fixer.encode(&chunk, DataVersion::LATEST).unwrap();
		assert!(!stored.contains_key("Level"));
		assert!(stored.contains_key("block_entities"));
		let decoded = fixer.decode_at(stored, DataVersion::LATEST, DataVersion::LATEST).unwrap();
		assert_eq!(decoded, chunk);
		assert_eq!(decoded.block(2, 17, 1), Some(&blockstate!(oak_stairs[half = bottom, facing = east])));
	}

	#[test]
	fn legacy_chunks_decode_but_do_not_encode() {
		let mut blocks = vec![0i8; 4096];
		blocks[0] = 7;
		let stored = map(compound! {
			("DataVersion", 1343i32),
			("Level", compound! {
				("xPos", 4i32),
				("zPos", 5i32),
				("TerrainPopulated", 1i8),
				("Sections", Tag::List(ListTag::Compound(vec![map(compound! {
					("Y", 3i8),
					("Blocks", blocks),
				})]))),
				("TileEntities", Tag::List(ListTag::Compound(vec![map(compound! {
					("id", "Control"), ("x", 64i32), ("y", 48i32), ("z", 80i32), ("Command", "/time set 0"),
				})]))),
			}),
		});
		let fixer = chunk_fixer().unwrap();
		let chunk = fixer.decode_at(stored, DataVersion::V1_12_2, DataVersion::LATEST).unwrap();
		assert_eq!((chunk.x, chunk.z), (4, 5));
		assert_eq!(chunk.status, "full");
		assert_eq!(chunk.version, DataVersion::V1_12_2);
		assert_eq!(chunk.block(0, 48, 0), Some(&blockstate!(bedrock)));
		assert_eq!(chunk.tile_entity(64, 48, 80).unwrap().id, "minecraft:command_block");
		assert!(matches!(fixer.encode(&chunk, chunk.version), Err(McError::Unsupported(_))));
	}

	#[test]
	fn section_errors_carry_the_full_path() {
		let fixer = chunk_fixer().unwrap();
		let chunk = sample_chunk(DataVersion::LATEST);
		let mut stored = fixer.encode(&chunk, DataVersion::LATEST).unwrap();
		if let Some(Tag::List(ListTag::Compound(sections))) = stored.get_mut("sections") {
			let states = sections[1].get_mut("block_states").and_then(Tag::as_compound_mut).unwrap();
			states.insert("data".to_owned(), Tag::LongArray(vec![-1; 256]));
		}
		let err = fixer.decode_at(stored, DataVersion::LATEST, DataVersion::LATEST).unwrap_err();
		assert!(err.to_string().contains("`sections[1].block_states.data`"), "{err}");
		assert!(err.to_string().contains("data version 3700"), "{err}");
	}
}
