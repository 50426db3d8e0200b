//! Section codecs, one for each way block indices have been stored.

use std::collections::HashMap;

use crate::{
	data::bitarray::{BitArray, PackedBitArray, PaddedBitArray},
	map_decoder,
	nbt::{ListTag, Map, Tag},
	world::{
		blockstate::BlockState,
		chunk::{BlockStates, Section, SECTION_VOLUME},
		fixer::{Codec, DataFixer},
		version::DataVersion,
	},
	McError, McResult,
};

use super::DecodeContext;

pub type SectionFixer = DataFixer<Section, Map, DataVersion>;

/// A fixer with a codec for every section layout.
pub fn section_fixer() -> McResult<SectionFixer> {
	SectionFixer::builder()
		.add_codec(DataVersion::PRE_15W32A, LegacySectionCodec)
		.add_codec(DataVersion::FLATTENING, FlattenedSectionCodec)
		.add_codec(DataVersion::PADDED_BLOCK_STATES, PaddedSectionCodec)
		.add_codec(DataVersion::V21W43A, ModernSectionCodec)
		.build()
}

/// Names for the lowest numeric block ids. Anything above is named
/// `minecraft:legacy_<id>`.
const LEGACY_BLOCK_NAMES: [&str; 21] = [
	"minecraft:air",
	"minecraft:stone",
	"minecraft:grass_block",
	"minecraft:dirt",
	"minecraft:cobblestone",
	"minecraft:oak_planks",
	"minecraft:oak_sapling",
	"minecraft:bedrock",
	"minecraft:flowing_water",
	"minecraft:water",
	"minecraft:flowing_lava",
	"minecraft:lava",
	"minecraft:sand",
	"minecraft:gravel",
	"minecraft:gold_ore",
	"minecraft:iron_ore",
	"minecraft:coal_ore",
	"minecraft:oak_log",
	"minecraft:oak_leaves",
	"minecraft:sponge",
	"minecraft:glass",
];

/// The block state for a numeric id and its metadata. Non-zero metadata
/// is kept as the `data` property.
pub fn legacy_block(id: u16, data: u8) -> BlockState {
	let state = match LEGACY_BLOCK_NAMES.get(id as usize) {
		Some(name) => BlockState::from(name),
		None => BlockState::from(format!("minecraft:legacy_{id}")),
	};
	if data != 0 {
		state.with_property("data", data.to_string())
	} else {
		state
	}
}

/// Four bit values packed two to a byte, low nibble first.
fn nibble(array: &[i8], index: usize) -> u8 {
	let byte = array[index >> 1] as u8;
	if index & 1 == 0 {
		byte & 0xF
	} else {
		byte >> 4
	}
}

fn check_len(context: &DecodeContext, key: &str, array: &[i8], expected: usize) -> McResult<()> {
	if array.len() == expected {
		Ok(())
	} else {
		Err(context.child(key).error(format!("expected {expected} bytes, found {}", array.len())))
	}
}

fn take_light(context: &DecodeContext, map: &mut Map) -> McResult<(Option<Vec<i8>>, Option<Vec<i8>>)> {
	Ok((
		context.take_opt(map, "BlockLight")?,
		context.take_opt(map, "SkyLight")?,
	))
}

fn insert_light(map: &mut Map, section: &Section) {
	if let Some(light) = &section.block_light {
		map.insert("BlockLight".to_owned(), Tag::ByteArray(light.clone()));
	}
	if let Some(light) = &section.sky_light {
		map.insert("SkyLight".to_owned(), Tag::ByteArray(light.clone()));
	}
}

fn take_palette(context: &DecodeContext, map: &mut Map, key: &str) -> McResult<Option<Vec<BlockState>>> {
	let Some(entries) = context.take_opt::<Vec<Map>>(map, key)? else {
		return Ok(None);
	};
	let context = context.child(key);
	if entries.is_empty() {
		return Err(context.error("a block palette needs at least one entry"));
	}
	entries.into_iter()
		.enumerate()
		.map(|(index, entry)| BlockState::decode(entry, &context.child(index)))
		.collect::<McResult<Vec<_>>>()
		.map(Some)
}

fn palette_tag(blocks: &BlockStates) -> Tag {
	Tag::List(ListTag::Compound(blocks.palette().iter().map(BlockState::to_map).collect()))
}

/// How indices are laid out in their words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
	/// Values may span two words.
	Straddling,
	/// Values never span words.
	Padded,
}

fn unpack(context: &DecodeContext, palette: Vec<BlockState>, words: Vec<i64>, layout: Layout) -> McResult<BlockStates> {
	let bits = crate::math::bit::palette_bits(palette.len(), BlockStates::MIN_BITS);
	let words: Vec<u64> = bytemuck::cast_vec(words);
	let indices = match layout {
		Layout::Straddling => PackedBitArray::from_words(bits, SECTION_VOLUME, words),
		Layout::Padded => PaddedBitArray::from_words(bits, SECTION_VOLUME, words)
			.and_then(|padded| PackedBitArray::from_values(bits, SECTION_VOLUME, padded.iter())),
	};
	indices.and_then(|indices| BlockStates::from_indices(palette, indices))
		.map_err(|err| context.error(err.to_string()))
}

fn pack(blocks: &BlockStates, layout: Layout) -> McResult<Vec<i64>> {
	let bits = blocks.required_bits();
	let indices = blocks.indices();
	let words = match layout {
		Layout::Straddling if indices.bits() == bits => indices.words().to_vec(),
		Layout::Straddling => PackedBitArray::from_values(bits, SECTION_VOLUME, indices.iter())?.into_words(),
		Layout::Padded => PaddedBitArray::from_values(bits, SECTION_VOLUME, indices.iter())?.into_words(),
	};
	Ok(bytemuck::cast_vec(words))
}

/// Sections before the flattening, with numeric ids in `Blocks`, the
/// upper four bits of each id in `Add`, and metadata in `Data`.
pub struct LegacySectionCodec;

impl Codec<Section, Map, DataVersion> for LegacySectionCodec {
	fn decode(&self, mut map: Map, version: DataVersion, _target: DataVersion) -> McResult<Section> {
		let context = DecodeContext::new(version);
		let y: i8 = context.take_int(&mut map, "Y")?;
		let blocks = map_decoder!(context, map; "Blocks" -> Vec<i8>);
		check_len(&context, "Blocks", &blocks, SECTION_VOLUME)?;
		let add = map_decoder!(context, map; "Add" -> Option<Vec<i8>>);
		if let Some(add) = &add {
			check_len(&context, "Add", add, SECTION_VOLUME / 2)?;
		}
		let data = map_decoder!(context, map; "Data" -> Option<Vec<i8>>);
		if let Some(data) = &data {
			check_len(&context, "Data", data, SECTION_VOLUME / 2)?;
		}
		let (block_light, sky_light) = take_light(&context, &mut map)?;

		let mut palette: Vec<BlockState> = Vec::new();
		let mut seen: HashMap<u16, u32> = HashMap::new();
		let mut indices = Vec::with_capacity(SECTION_VOLUME);
		for (index, &block) in blocks.iter().enumerate() {
			let high = add.as_deref().map_or(0, |add| nibble(add, index)) as u16;
			let id = (block as u8 as u16) | (high << 8);
			let meta = data.as_deref().map_or(0, |data| nibble(data, index));
			let palette_index = *seen.entry((id << 4) | meta as u16).or_insert_with(|| {
				let state = legacy_block(id, meta);
				match palette.iter().position(|entry| *entry == state) {
					Some(position) => position as u32,
					None => {
						palette.push(state);
						(palette.len() - 1) as u32
					}
				}
			});
			indices.push(palette_index);
		}

		Ok(Section {
			y,
			blocks: BlockStates::from_values(palette, indices)
				.map_err(|err| context.child("Blocks").error(err.to_string()))?,
			block_light,
			sky_light,
			biomes: None,
			extra: map,
		})
	}

	fn encode(&self, _section: &Section) -> McResult<Map> {
		Err(McError::Unsupported("writing sections with numeric block ids"))
	}
}

fn decode_paletted(mut map: Map, version: DataVersion, layout: Layout) -> McResult<Section> {
	let context = DecodeContext::new(version);
	let y: i8 = context.take_int(&mut map, "Y")?;
	let palette = take_palette(&context, &mut map, "Palette")?;
	let states = map_decoder!(context, map; "BlockStates" -> Option<Vec<i64>>);
	let blocks = match (palette, states) {
		(Some(palette), Some(words)) => unpack(&context.child("BlockStates"), palette, words, layout)?,
		// Sections that only hold light have neither.
		(None, None) => BlockStates::air(),
		(Some(mut palette), None) if palette.len() == 1 => BlockStates::filled(palette.remove(0)),
		(Some(_), None) => return Err(context.child("BlockStates").error("missing required field")),
		(None, Some(_)) => return Err(context.child("Palette").error("missing required field")),
	};
	let (block_light, sky_light) = take_light(&context, &mut map)?;
	Ok(Section {
		y,
		blocks,
		block_light,
		sky_light,
		biomes: None,
		extra: map,
	})
}

fn encode_paletted(section: &Section, layout: Layout) -> McResult<Map> {
	let blocks = section.blocks.compacted()?;
	let mut map = Map::new();
	map.insert("Y".to_owned(), Tag::Byte(section.y));
	map.insert("Palette".to_owned(), palette_tag(&blocks));
	map.insert("BlockStates".to_owned(), Tag::LongArray(pack(&blocks, layout)?));
	insert_light(&mut map, section);
	map.extend(section.extra.clone());
	Ok(map)
}

/// From 17w47a, `Palette` and `BlockStates` with indices that may span
/// two longs.
pub struct FlattenedSectionCodec;

impl Codec<Section, Map, DataVersion> for FlattenedSectionCodec {
	fn decode(&self, map: Map, version: DataVersion, _target: DataVersion) -> McResult<Section> {
		decode_paletted(map, version, Layout::Straddling)
	}

	fn encode(&self, section: &Section) -> McResult<Map> {
		encode_paletted(section, Layout::Straddling)
	}
}

/// From 20w17a, the same keys with indices padded to whole longs.
pub struct PaddedSectionCodec;

impl Codec<Section, Map, DataVersion> for PaddedSectionCodec {
	fn decode(&self, map: Map, version: DataVersion, _target: DataVersion) -> McResult<Section> {
		decode_paletted(map, version, Layout::Padded)
	}

	fn encode(&self, section: &Section) -> McResult<Map> {
		encode_paletted(section, Layout::Padded)
	}
}

/// From 21w43a, blocks live in `block_states` next to per-section
/// `biomes`. A single entry palette has no `data`.
pub struct ModernSectionCodec;

impl Codec<Section, Map, DataVersion> for ModernSectionCodec {
	fn decode(&self, mut map: Map, version: DataVersion, _target: DataVersion) -> McResult<Section> {
		let context = DecodeContext::new(version);
		let y: i8 = context.take_int(&mut map, "Y")?;
		let blocks = match map_decoder!(context, map; "block_states" -> Option<Map>) {
			Some(mut states) => {
				let context = context.child("block_states");
				let Some(mut palette) = take_palette(&context, &mut states, "palette")? else {
					return Err(context.child("palette").error("missing required field"));
				};
				match map_decoder!(context, states; "data" -> Option<Vec<i64>>) {
					Some(words) => unpack(&context.child("data"), palette, words, Layout::Padded)?,
					None if palette.len() == 1 => BlockStates::filled(palette.remove(0)),
					None => return Err(context.child("data").error("missing required field")),
				}
			}
			None => BlockStates::air(),
		};
		let biomes = map_decoder!(context, map; "biomes" -> Option<Map>);
		let (block_light, sky_light) = take_light(&context, &mut map)?;
		Ok(Section {
			y,
			blocks,
			block_light,
			sky_light,
			biomes,
			extra: map,
		})
	}

	fn encode(&self, section: &Section) -> McResult<Map> {
		let blocks = section.blocks.compacted()?;
		let mut states = Map::new();
		states.insert("palette".to_owned(), palette_tag(&blocks));
		if !blocks.is_uniform() {
			states.insert("data".to_owned(), Tag::LongArray(pack(&blocks, Layout::Padded)?));
		}
		let mut map = Map::new();
		map.insert("Y".to_owned(), Tag::Byte(section.y));
		map.insert("block_states".to_owned(), Tag::Compound(states));
		if let Some(biomes) = &section.biomes {
			map.insert("biomes".to_owned(), Tag::Compound(biomes.clone()));
		}
		insert_light(&mut map, section);
		map.extend(section.extra.clone());
		Ok(map)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{blockstate, compound, list};

	fn map(tag: Tag) -> Map {
		match tag {
			Tag::Compound(map) => map,
			_ => unreachable!(),
		}
	}

	fn varied_section(y: i8) -> Section {
		let palette: Vec<BlockState> = (0..18)
			.map(|i| BlockState::from(format!("minecraft:block_{i}")))
			.collect();
		let values = (0..SECTION_VOLUME as u32).map(|i| (i * 7) % 18);
		Section {
			y,
			blocks: BlockStates::from_values(palette, values).unwrap(),
			block_light: Some(vec![0x11; 2048]),
			sky_light: None,
			biomes: None,
			extra: Map::new(),
		}
	}

	#[test]
	fn codecs_resolve_by_version() {
		let fixer = section_fixer().unwrap();
		assert_eq!(fixer.resolve_key(DataVersion::V1_12_2).unwrap(), DataVersion::PRE_15W32A);
		assert_eq!(fixer.resolve_key(DataVersion::new(1631)).unwrap(), DataVersion::FLATTENING);
		assert_eq!(fixer.resolve_key(DataVersion::new(2586)).unwrap(), DataVersion::PADDED_BLOCK_STATES);
		assert_eq!(fixer.resolve_key(DataVersion::LATEST).unwrap(), DataVersion::V21W43A);
	}

	#[test]
	fn legacy_ids_and_metadata() {
		let mut blocks = vec![0i8; SECTION_VOLUME];
		let mut add = vec![0i8; SECTION_VOLUME / 2];
		let mut data = vec![0i8; SECTION_VOLUME / 2];
		blocks[0] = 1;
		// Index 1 is odd, so its add bits are the high nibble.
		blocks[1] = 44;
		add[0] = 0x10;
		blocks[2] = 3;
		data[1] = 0x05;
		let stored = map(compound! {
			("Y", 2i8),
			("Blocks", blocks),
			("Add", add),
			("Data", data),
			("SkyLight", vec![0i8; 2048]),
		});
		let fixer = section_fixer().unwrap();
		let section = fixer.decode_at(stored, DataVersion::V1_12_2, DataVersion::LATEST).unwrap();
		assert_eq!(section.y, 2);
		assert_eq!(section.blocks.get(0, 0, 0), Some(&blockstate!(stone)));
		assert_eq!(section.blocks.get(1, 0, 0).unwrap().name(), "minecraft:legacy_300");
		assert_eq!(section.blocks.get(2, 0, 0), Some(&blockstate!(dirt[data = 5])));
		assert!(section.blocks.get(5, 5, 5).unwrap().is_air());
		assert_eq!(section.blocks.palette().len(), 4);
		assert!(section.sky_light.is_some());
		assert!(matches!(fixer.encode(&section, DataVersion::V1_12_2), Err(McError::Unsupported(_))));
	}

	#[test]
	fn short_legacy_arrays_are_rejected() {
		let stored = map(compound! { ("Y", 0i8), ("Blocks", vec![0i8; 100]) });
		let err = LegacySectionCodec.decode(stored, DataVersion::V1_12_2, DataVersion::V1_12_2).unwrap_err();
		assert!(err.to_string().contains("`Blocks`"), "{err}");
	}

	#[test]
	fn straddling_and_padded_layouts() {
		let fixer = section_fixer().unwrap();
		let section = varied_section(-1);
		let flattened = fixer.encode(&section, DataVersion::FLATTENING).unwrap();
		let padded = fixer.encode(&section, DataVersion::new(2586)).unwrap();
		let words = |map: &Map| match map.get("BlockStates") {
			Some(Tag::LongArray(words)) => words.len(),
			_ => 0,
		};
		// 18 entries need 5 bits: 320 longs back to back, or 12 per long.
		assert_eq!(words(&flattened), 320);
		assert_eq!(words(&padded), 342);

		let decoded = fixer.decode_at(flattened, DataVersion::FLATTENING, DataVersion::LATEST).unwrap();
		assert_eq!(decoded, section);
		let decoded = fixer.decode_at(padded, DataVersion::new(2586), DataVersion::LATEST).unwrap();
		assert_eq!(decoded, section);
	}

	#[test]
	fn modern_uniform_sections_omit_data() {
		let fixer = section_fixer().unwrap();
		let mut section = Section::new(-4);
		section.biomes = Some(map(compound! { ("palette", list!["minecraft:plains"]) }));
		let encoded = fixer.encode(&section, DataVersion::LATEST).unwrap();
		let states = encoded.get("block_states").and_then(Tag::as_compound).unwrap();
		assert!(!states.contains_key("data"));
		let decoded = fixer.decode_at(encoded, DataVersion::LATEST, DataVersion::LATEST).unwrap();
		assert_eq!(decoded, section);

		let section = varied_section(3);
		let encoded = fixer.encode(&section, DataVersion::LATEST).unwrap();
		assert_eq!(fixer.decode_at(encoded, DataVersion::LATEST, DataVersion::LATEST).unwrap(), section);
	}

	#[test]
	fn palettes_are_written_without_unused_entries() {
		let fixer = section_fixer().unwrap();
		let mut section = Section::new(0);
		section.blocks.set(0, 0, 0, blockstate!(stone)).unwrap();
		section.blocks.set(0, 0, 0, blockstate!(dirt)).unwrap();
		let encoded = fixer.encode(&section, DataVersion::new(2586)).unwrap();
		match encoded.get("Palette") {
			Some(Tag::List(ListTag::Compound(palette))) => assert_eq!(palette.len(), 2),
			other => panic!("{other:?}"),
		}
		let decoded = fixer.decode_at(encoded, DataVersion::new(2586), DataVersion::new(2586)).unwrap();
		assert_eq!(decoded.blocks.get(0, 0, 0), Some(&blockstate!(dirt)));

		// Once every block is the same the data array is left out.
		section.blocks = BlockStates::air();
		section.blocks.set(0, 0, 0, blockstate!(stone)).unwrap();
		section.blocks.set(0, 0, 0, BlockState::air()).unwrap();
		assert!(!section.blocks.is_uniform());
		let encoded = fixer.encode(&section, DataVersion::LATEST).unwrap();
		let states = encoded.get("block_states").and_then(Tag::as_compound).unwrap();
		assert!(!states.contains_key("data"));
	}

	#[test]
	fn out_of_range_indices_name_the_field() {
		let stored = map(compound! {
			("Y", 0i8),
			("block_states", compound! {
				("palette", Tag::List(ListTag::Compound(vec![
					BlockState::air().to_map(),
					blockstate!(stone).to_map(),
				]))),
				("data", vec![0x7i64; 256]),
			}),
		});
		let err = section_fixer().unwrap()
			.decode_at(stored, DataVersion::LATEST, DataVersion::LATEST)
			.unwrap_err();
		assert!(err.to_string().contains("`block_states.data`"), "{err}");
	}
}
