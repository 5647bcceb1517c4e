//! Decoder for `.tiles` (TDEF) files: tilesheets of tile definitions, with
//! synthetic sprite IDs that let separate TDEF files interoperate without a
//! global registry.

use crate::{
    error::TileParserError,
    tile::{TileDefinition, TileProperty, Tilesheet},
};
use binreader::BinaryReader;
use std::{
    collections::{HashMap, HashSet},
    io::{Read, Seek},
};

const MAGIC: &[u8; 4] = b"tdef";

/// Derive the leading numeric filename prefix used by the sprite ID
/// formula: split on `_`, parse the first segment as an integer, default 0.
pub fn parse_file_number(file_stem: &str) -> i32 {
    file_stem.split('_').next().and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Both sprite ID formulas must be reproduced bit-exactly — they are how
/// separate TDEF files interoperate without a global registry.
pub fn compute_sprite_id(file_number: i32, tilesheet_number: i32, tile_index: i32, legacy_id_mode: bool) -> u32 {
    let (file_number, tilesheet_number, tile_index) =
        (file_number as i64, tilesheet_number as i64, tile_index as i64);
    let id = if file_number < 2 || legacy_id_mode {
        file_number * 100 * 1000 + 10000 + tilesheet_number * 1000 + tile_index
    } else {
        file_number * 512 * 512 + tilesheet_number * 512 + tile_index
    };
    id as u32
}

/// Decode one `.tiles` file's tilesheets.
///
/// ```text
/// 4 bytes ASCII magic "tdef"
/// int32  version
/// int32  num_tilesheets
/// for each tilesheet:
///     string  name
///     string  image_name
///     int32   width_tiles, height_tiles, tilesheet_number, num_tiles
///     for tile_index in 0..num_tiles:
///         int32 property_count
///         property_count x (string name, string value)
/// ```
pub fn decode_tdef<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    file_number: i32,
    legacy_id_mode: bool,
) -> Result<(i32, Vec<Tilesheet>), TileParserError> {
    let magic_bytes = reader.read_bytes(4)?;
    let magic: [u8; 4] = magic_bytes.try_into().expect("read_bytes(4) returns 4 bytes");
    if &magic != MAGIC {
        return Err(TileParserError::InvalidMagic { found: magic });
    }

    let version = reader.read_int32(false)?;
    let num_tilesheets = reader.read_int32(false)?;

    let mut seen_sprite_ids = HashSet::new();
    let mut tilesheets = Vec::with_capacity(num_tilesheets.max(0) as usize);

    for _ in 0..num_tilesheets {
        let name = reader.read_string()?;
        let image_name = reader.read_string()?;
        let width_tiles = reader.read_int32(false)?;
        let height_tiles = reader.read_int32(false)?;
        let tilesheet_number = reader.read_int32(false)?;
        let num_tiles = reader.read_int32(false)?;

        let mut tiles = HashMap::with_capacity(num_tiles.max(0) as usize);

        for tile_index in 0..num_tiles {
            let property_count = reader.read_int32(false)?;
            let mut properties = HashMap::with_capacity(property_count.max(0) as usize);
            for _ in 0..property_count {
                let pname = reader.read_string().map_err(|source| {
                    TileParserError::MalformedPropertyBlock { tilesheet_number, tile_index, source }
                })?;
                let pvalue = reader.read_string().map_err(|source| {
                    TileParserError::MalformedPropertyBlock { tilesheet_number, tile_index, source }
                })?;
                properties.insert(pname.clone(), TileProperty { name: pname, value: pvalue });
            }

            // consumed the property list unconditionally above, so a
            // duplicate sprite ID below never desynchronises the cursor.
            let sprite_id = compute_sprite_id(file_number, tilesheet_number, tile_index, legacy_id_mode);
            if !seen_sprite_ids.insert(sprite_id) {
                tracing::warn!(sprite_id, tilesheet_number, tile_index, "duplicate sprite id within TDEF file, skipping");
                continue;
            }

            let tile_name = format!("{}_{}", name, tile_index);
            let full_name = format!("{}_{}", name, tile_name);
            properties.insert(
                "full_name".to_string(),
                TileProperty { name: "full_name".to_string(), value: full_name },
            );

            tiles.insert(
                tile_index,
                TileDefinition {
                    sprite_id,
                    name: tile_name,
                    tilesheet_name: name.clone(),
                    category: None,
                    properties,
                },
            );
        }

        tilesheets.push(Tilesheet { name, image_name, width_tiles, height_tiles, tilesheet_number, tiles });
    }

    Ok((version, tilesheets))
}

/// Process-wide cache of tile definitions, keyed by sprite ID. Built once
/// across every TDEF file and never invalidated during a run.
#[derive(Default)]
pub struct TileDefinitionStore {
    by_sprite_id: HashMap<u32, TileDefinition>,
}

impl TileDefinitionStore {
    pub fn new() -> Self {
        TileDefinitionStore::default()
    }

    /// Insert a definition, skipping (and warning on) a sprite ID already
    /// present from an earlier file.
    pub fn insert(&mut self, def: TileDefinition) {
        let sprite_id = def.sprite_id;
        if self.by_sprite_id.contains_key(&sprite_id) {
            tracing::warn!(sprite_id, "duplicate sprite id across TDEF files, keeping first");
            return;
        }
        self.by_sprite_id.insert(sprite_id, def);
    }

    pub fn get(&self, sprite_id: u32) -> Option<&TileDefinition> {
        self.by_sprite_id.get(&sprite_id)
    }

    pub fn len(&self) -> usize {
        self.by_sprite_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_sprite_id.is_empty()
    }

    pub fn clear(&mut self) {
        self.by_sprite_id.clear();
    }
}

/// Process-wide cache of tilesheets, keyed by name.
#[derive(Default)]
pub struct TilesheetStore {
    by_name: HashMap<String, Tilesheet>,
}

impl TilesheetStore {
    pub fn new() -> Self {
        TilesheetStore::default()
    }

    pub fn insert(&mut self, sheet: Tilesheet) {
        if self.by_name.contains_key(&sheet.name) {
            tracing::warn!(name = %sheet.name, "duplicate tilesheet name across TDEF files, keeping first");
            return;
        }
        self.by_name.insert(sheet.name.clone(), sheet);
    }

    pub fn get(&self, name: &str) -> Option<&Tilesheet> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn clear(&mut self) {
        self.by_name.clear();
    }
}

/// Merge one file's decoded tilesheets into the two process-wide stores.
pub fn merge_into_stores(
    tilesheets: Vec<Tilesheet>,
    tile_store: &mut TileDefinitionStore,
    sheet_store: &mut TilesheetStore,
) {
    for sheet in tilesheets {
        for def in sheet.tiles.values().cloned() {
            tile_store.insert(def);
        }
        sheet_store.insert(sheet);
    }
}

#[cfg(test)]
fn reader_over(bytes: Vec<u8>) -> BinaryReader<std::io::Cursor<Vec<u8>>> {
    BinaryReader::new(std::io::Cursor::new(bytes))
}

#[test]
fn test_sprite_id_legacy_mode_for_low_file_number() {
    assert_eq!(compute_sprite_id(1, 2, 3, false), 112_003);
}

#[test]
fn test_sprite_id_modern_mode_for_high_file_number() {
    assert_eq!(compute_sprite_id(3, 2, 3, false), 787_459);
}

#[test]
fn test_forced_legacy_mode_overrides_file_number() {
    assert_eq!(compute_sprite_id(3, 2, 3, true), compute_sprite_id(1, 2, 3, false) - 112_003 + (3 * 100_000 + 10000 + 2000 + 3));
}

#[test]
fn test_parse_file_number() {
    assert_eq!(parse_file_number("1_newtiledefinitions"), 1);
    assert_eq!(parse_file_number("newtiledefinitions"), 0);
    assert_eq!(parse_file_number("003_foo"), 3);
}

#[test]
fn test_invalid_magic_rejected() {
    let bytes = b"nope".to_vec();
    let mut reader = reader_over(bytes);
    let err = decode_tdef(&mut reader, 0, false).unwrap_err();
    assert!(matches!(err, TileParserError::InvalidMagic { .. }));
}

#[test]
fn test_tile_name_and_full_name_synthesis() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&1i32.to_le_bytes()); // version
    bytes.extend_from_slice(&1i32.to_le_bytes()); // num_tilesheets

    bytes.extend_from_slice(&3i32.to_le_bytes());
    bytes.extend_from_slice(b"walls\n"); // name (string)
    // actually strings are length-free newline-terminated; push raw bytes with helper below
    bytes.clear();

    fn push_string(bytes: &mut Vec<u8>, s: &str) {
        bytes.extend_from_slice(s.as_bytes());
        bytes.push(b'\n');
    }

    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());
    push_string(&mut bytes, "walls");
    push_string(&mut bytes, "walls.png");
    bytes.extend_from_slice(&8i32.to_le_bytes()); // width_tiles
    bytes.extend_from_slice(&8i32.to_le_bytes()); // height_tiles
    bytes.extend_from_slice(&2i32.to_le_bytes()); // tilesheet_number
    bytes.extend_from_slice(&1i32.to_le_bytes()); // num_tiles
    bytes.extend_from_slice(&0i32.to_le_bytes()); // property_count for tile 0

    let mut reader = reader_over(bytes);
    let (version, sheets) = decode_tdef(&mut reader, 1, false).unwrap();
    assert_eq!(version, 1);
    let sheet = &sheets[0];
    let def = sheet.tiles.get(&0).unwrap();
    assert_eq!(def.name, "walls_0");
    assert_eq!(def.properties.get("full_name").unwrap().value, "walls_walls_0");
    assert_eq!(def.sprite_id, compute_sprite_id(1, 2, 0, false));
}

#[test]
fn test_duplicate_sprite_id_within_file_still_consumes_properties() {
    fn push_string(bytes: &mut Vec<u8>, s: &str) {
        bytes.extend_from_slice(s.as_bytes());
        bytes.push(b'\n');
    }

    let mut bytes = Vec::new();
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&2i32.to_le_bytes()); // two tilesheets, same tilesheet_number -> colliding sprite ids

    for _ in 0..2 {
        push_string(&mut bytes, "sheet");
        push_string(&mut bytes, "sheet.png");
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&5i32.to_le_bytes()); // same tilesheet_number both times
        bytes.extend_from_slice(&1i32.to_le_bytes()); // num_tiles = 1
        bytes.extend_from_slice(&1i32.to_le_bytes()); // property_count = 1
        push_string(&mut bytes, "color");
        push_string(&mut bytes, "red");
    }

    let mut reader = reader_over(bytes);
    let (_, sheets) = decode_tdef(&mut reader, 0, false).unwrap();
    // second tilesheet's tile 0 collided with the first's and was skipped
    assert_eq!(sheets[0].tiles.len(), 1);
    assert_eq!(sheets[1].tiles.len(), 0);
    // no error was raised decoding it: property bytes were still consumed,
    // proving the cursor stayed aligned for the rest of the stream (there
    // is none here, but a trailing read failure would have surfaced above).
}
