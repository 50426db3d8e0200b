//! Tile entity codecs, looked up by tile entity id.

use std::{borrow::Cow, collections::HashMap};

use crate::{
	map_decoder,
	nbt::{ListTag, Map, Tag},
	world::{
		chunk::{Chest, CommandBlock, Sign, TileEntity, TileEntityKind},
		fixer::{Codec, DataFixer},
		version::DataVersion,
	},
	McError, McResult,
};

use super::DecodeContext;

pub type TileFixer = DataFixer<TileEntity, Map, DataVersion>;

/// Ids used before 1.11, and what they were renamed to.
const LEGACY_IDS: &[(&str, &str)] = &[
	("Airportal", "minecraft:end_portal"),
	("Banner", "minecraft:banner"),
	("Beacon", "minecraft:beacon"),
	("Cauldron", "minecraft:brewing_stand"),
	("Chest", "minecraft:chest"),
	("Comparator", "minecraft:comparator"),
	("Control", "minecraft:command_block"),
	("DLDetector", "minecraft:daylight_detector"),
	("Dropper", "minecraft:dropper"),
	("EnchantTable", "minecraft:enchanting_table"),
	("EndGateway", "minecraft:end_gateway"),
	("EnderChest", "minecraft:ender_chest"),
	("FlowerPot", "minecraft:flower_pot"),
	("Furnace", "minecraft:furnace"),
	("Hopper", "minecraft:hopper"),
	("MobSpawner", "minecraft:mob_spawner"),
	("Music", "minecraft:noteblock"),
	("Piston", "minecraft:piston"),
	("RecordPlayer", "minecraft:jukebox"),
	("Sign", "minecraft:sign"),
	("Skull", "minecraft:skull"),
	("Structure", "minecraft:structure_block"),
	("Trap", "minecraft:dispenser"),
];

/// The namespaced form of a tile entity id.
pub fn namespaced_id(id: &str) -> Cow<'_, str> {
	if id.contains(':') {
		return Cow::Borrowed(id);
	}
	match LEGACY_IDS.iter().find(|(legacy, _)| *legacy == id) {
		Some(&(_, namespaced)) => Cow::Borrowed(namespaced),
		None => Cow::Owned(format!("minecraft:{}", id.to_lowercase())),
	}
}

/// The id a pre-1.11 world would use.
pub fn legacy_id(id: &str) -> Option<&'static str> {
	LEGACY_IDS.iter()
		.find(|(_, namespaced)| *namespaced == id)
		.map(|&(legacy, _)| legacy)
}

/// Removes `id`, `x`, `y`, and `z`. The id comes back namespaced when the
/// target version uses namespaced ids.
fn take_position(context: &DecodeContext, map: &mut Map, target: DataVersion) -> McResult<(String, i32, i32, i32)> {
	let id: String = context.take(map, "id")?;
	let id = if target >= DataVersion::V1_11 {
		namespaced_id(&id).into_owned()
	} else {
		id
	};
	Ok((
		id,
		context.take(map, "x")?,
		context.take(map, "y")?,
		context.take(map, "z")?,
	))
}

fn position_map(tile: &TileEntity) -> Map {
	let mut map = Map::new();
	map.insert("id".to_owned(), Tag::String(tile.id.clone()));
	map.insert("x".to_owned(), Tag::Int(tile.x));
	map.insert("y".to_owned(), Tag::Int(tile.y));
	map.insert("z".to_owned(), Tag::Int(tile.z));
	map
}

fn kind_mismatch(tile: &TileEntity, expected: &str) -> McError {
	McError::Custom(format!("tile entity `{}` at {} {} {} is not a {expected}", tile.id, tile.x, tile.y, tile.z))
}

fn insert_opt(map: &mut Map, key: &str, value: &Option<String>) {
	if let Some(value) = value {
		map.insert(key.to_owned(), Tag::String(value.clone()));
	}
}

pub struct CommandBlockCodec;

impl Codec<TileEntity, Map, DataVersion> for CommandBlockCodec {
	fn decode(&self, mut map: Map, version: DataVersion, target: DataVersion) -> McResult<TileEntity> {
		let context = DecodeContext::new(version);
		let (id, x, y, z) = take_position(&context, &mut map, target)?;
		let custom_name = map_decoder!(context, map; "CustomName" -> Option<String>);
		let command = map_decoder!(context, map; "Command" -> Option<String>);
		let success_count = map_decoder!(context, map; "SuccessCount" -> i32 = 0);
		let track_output = map_decoder!(context, map; "TrackOutput" -> bool = true);
		// The game discards the last output when it isn't tracked.
		let last_output = if track_output {
			map_decoder!(context, map; "LastOutput" -> Option<String>)
		} else {
			map.shift_remove("LastOutput");
			None
		};
		Ok(TileEntity {
			id,
			x,
			y,
			z,
			kind: TileEntityKind::CommandBlock(CommandBlock {
				custom_name,
				command,
				success_count,
				track_output,
				last_output,
			}),
			extra: map,
		})
	}

	fn encode(&self, tile: &TileEntity) -> McResult<Map> {
		let TileEntityKind::CommandBlock(block) = &tile.kind else {
			return Err(kind_mismatch(tile, "command block"));
		};
		let mut map = position_map(tile);
		insert_opt(&mut map, "CustomName", &block.custom_name);
		insert_opt(&mut map, "Command", &block.command);
		map.insert("SuccessCount".to_owned(), Tag::Int(block.success_count));
		map.insert("TrackOutput".to_owned(), Tag::from(block.track_output));
		if block.track_output {
			insert_opt(&mut map, "LastOutput", &block.last_output);
		}
		map.extend(tile.extra.clone());
		Ok(map)
	}
}

/// Signs before 1.20, with one side stored as `Text1` through `Text4`.
pub struct LegacySignCodec;

const LEGACY_SIGN_KEYS: [&str; 4] = ["Text1", "Text2", "Text3", "Text4"];

impl Codec<TileEntity, Map, DataVersion> for LegacySignCodec {
	fn decode(&self, mut map: Map, version: DataVersion, target: DataVersion) -> McResult<TileEntity> {
		let context = DecodeContext::new(version);
		let (id, x, y, z) = take_position(&context, &mut map, target)?;
		let mut sign = Sign::default();
		for (line, key) in sign.lines.iter_mut().zip(LEGACY_SIGN_KEYS) {
			*line = context.take_or(&mut map, key, String::new())?;
		}
		Ok(TileEntity {
			id,
			x,
			y,
			z,
			kind: TileEntityKind::Sign(sign),
			extra: map,
		})
	}

	fn encode(&self, tile: &TileEntity) -> McResult<Map> {
		let TileEntityKind::Sign(sign) = &tile.kind else {
			return Err(kind_mismatch(tile, "sign"));
		};
		// One sided signs have nowhere to keep the back text.
		if sign.back_lines.iter().any(|line| !line.is_empty()) {
			log::warn!("sign at {} {} {} has text on its back", tile.x, tile.y, tile.z);
			return Err(McError::Unsupported("writing a sign with back text before 1.20"));
		}
		let mut map = position_map(tile);
		for (line, key) in sign.lines.iter().zip(LEGACY_SIGN_KEYS) {
			map.insert(key.to_owned(), Tag::String(line.clone()));
		}
		map.extend(tile.extra.clone());
		Ok(map)
	}
}

/// Signs from 1.20 on, with `front_text` and `back_text`.
pub struct DoubleSidedSignCodec;

impl DoubleSidedSignCodec {
	fn take_side(context: &DecodeContext, map: &mut Map, key: &str) -> McResult<[String; 4]> {
		let mut lines: [String; 4] = Default::default();
		let Some(mut side) = context.take_opt::<Map>(map, key)? else {
			return Ok(lines);
		};
		let context = context.child(key);
		let messages: Vec<String> = context.take_or(&mut side, "messages", Vec::new())?;
		for (line, message) in lines.iter_mut().zip(messages) {
			*line = message;
		}
		// Color and glow stay with the tile so they are written back.
		if !side.is_empty() {
			map.insert(key.to_owned(), Tag::Compound(side));
		}
		Ok(lines)
	}

	fn side(extra: &Map, key: &str, lines: &[String; 4]) -> Tag {
		let mut side = extra.get(key)
			.and_then(Tag::as_compound)
			.cloned()
			.unwrap_or_default();
		side.insert("messages".to_owned(), Tag::List(ListTag::String(lines.to_vec())));
		Tag::Compound(side)
	}
}

impl Codec<TileEntity, Map, DataVersion> for DoubleSidedSignCodec {
	fn decode(&self, mut map: Map, version: DataVersion, target: DataVersion) -> McResult<TileEntity> {
		let context = DecodeContext::new(version);
		let (id, x, y, z) = take_position(&context, &mut map, target)?;
		let lines = Self::take_side(&context, &mut map, "front_text")?;
		let back_lines = Self::take_side(&context, &mut map, "back_text")?;
		Ok(TileEntity {
			id,
			x,
			y,
			z,
			kind: TileEntityKind::Sign(Sign {
				lines,
				back_lines,
			}),
			extra: map,
		})
	}

	fn encode(&self, tile: &TileEntity) -> McResult<Map> {
		let TileEntityKind::Sign(sign) = &tile.kind else {
			return Err(kind_mismatch(tile, "sign"));
		};
		let mut map = position_map(tile);
		map.insert("front_text".to_owned(), Self::side(&tile.extra, "front_text", &sign.lines));
		map.insert("back_text".to_owned(), Self::side(&tile.extra, "back_text", &sign.back_lines));
		map.extend(
			tile.extra.iter()
				.filter(|(key, _)| !matches!(key.as_str(), "front_text" | "back_text"))
				.map(|(key, tag)| (key.clone(), tag.clone()))
		);
		Ok(map)
	}
}

pub struct ChestCodec;

impl Codec<TileEntity, Map, DataVersion> for ChestCodec {
	fn decode(&self, mut map: Map, version: DataVersion, target: DataVersion) -> McResult<TileEntity> {
		let context = DecodeContext::new(version);
		let (id, x, y, z) = take_position(&context, &mut map, target)?;
		let custom_name = map_decoder!(context, map; "CustomName" -> Option<String>);
		let items = map_decoder!(context, map; "Items" -> Vec<Map> = Vec::new());
		Ok(TileEntity {
			id,
			x,
			y,
			z,
			kind: TileEntityKind::Chest(Chest {
				custom_name,
				items,
			}),
			extra: map,
		})
	}

	fn encode(&self, tile: &TileEntity) -> McResult<Map> {
		let TileEntityKind::Chest(chest) = &tile.kind else {
			return Err(kind_mismatch(tile, "chest"));
		};
		let mut map = position_map(tile);
		insert_opt(&mut map, "CustomName", &chest.custom_name);
		map.insert("Items".to_owned(), Tag::List(ListTag::Compound(chest.items.clone())));
		map.extend(tile.extra.clone());
		Ok(map)
	}
}

/// Keeps everything but the position as it was stored.
pub struct RawTileCodec;

impl Codec<TileEntity, Map, DataVersion> for RawTileCodec {
	fn decode(&self, mut map: Map, version: DataVersion, target: DataVersion) -> McResult<TileEntity> {
		let context = DecodeContext::new(version);
		let (id, x, y, z) = take_position(&context, &mut map, target)?;
		Ok(TileEntity {
			id,
			x,
			y,
			z,
			kind: TileEntityKind::Other(map),
			extra: Map::new(),
		})
	}

	fn encode(&self, tile: &TileEntity) -> McResult<Map> {
		let mut map = position_map(tile);
		if let TileEntityKind::Other(fields) = &tile.kind {
			map.extend(fields.clone());
		}
		map.extend(tile.extra.clone());
		Ok(map)
	}
}

/// Tile entity fixers by namespaced id. Ids without a fixer are kept
/// raw.
pub struct TileEntityRegistry {
	fixers: HashMap<String, TileFixer>,
	fallback: RawTileCodec,
}

impl TileEntityRegistry {
	/// A registry where every tile entity is kept raw.
	pub fn new() -> Self {
		Self {
			fixers: HashMap::new(),
			fallback: RawTileCodec,
		}
	}

	/// Decoders for command blocks, signs, and chests.
	pub fn vanilla() -> McResult<Self> {
		let mut registry = Self::new();
		registry.register("minecraft:command_block", TileFixer::builder()
			.add_codec(DataVersion::PRE_15W32A, CommandBlockCodec)
			.build()?);
		for id in ["minecraft:sign", "minecraft:hanging_sign"] {
			registry.register(id, TileFixer::builder()
				.add_codec(DataVersion::PRE_15W32A, LegacySignCodec)
				.add_codec(DataVersion::V1_20, DoubleSidedSignCodec)
				.build()?);
		}
		for id in ["minecraft:chest", "minecraft:trapped_chest"] {
			registry.register(id, TileFixer::builder()
				.add_codec(DataVersion::PRE_15W32A, ChestCodec)
				.build()?);
		}
		Ok(registry)
	}

	pub fn register<S: AsRef<str>>(&mut self, id: S, fixer: TileFixer) {
		self.fixers.insert(namespaced_id(id.as_ref()).into_owned(), fixer);
	}

	/// The fixer for an id in either its legacy or namespaced form.
	pub fn fixer(&self, id: &str) -> Option<&TileFixer> {
		self.fixers.get(namespaced_id(id).as_ref())
	}

	pub fn decode(&self, map: Map, context: &DecodeContext, target: DataVersion) -> McResult<TileEntity> {
		let fixer = match map.get("id").and_then(Tag::as_str) {
			Some(id) => self.fixer(id),
			None => return Err(context.child("id").error("missing required field")),
		};
		let result = match fixer {
			Some(fixer) => fixer.decode_at(map, context.version(), target),
			None => self.fallback.decode(map, context.version(), target),
		};
		context.nest(result)
	}

	pub fn encode(&self, tile: &TileEntity, version: DataVersion) -> McResult<Map> {
		match self.fixer(&tile.id) {
			Some(fixer) => fixer.encode(tile, version),
			None => self.fallback.encode(tile),
		}
	}
}

impl Default for TileEntityRegistry {
	fn default() -> Self {
		Self::new()
	}
}
