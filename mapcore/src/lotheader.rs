//! Decoder for `.lotheader` files: the per-cell tile-name lookup table that
//! lot-pack bodies reference by integer ID.

use crate::error::LotHeaderParserError;
use binreader::BinaryReader;
use std::io::{Read, Seek};

/// Default ceiling on `tile_count` in strict mode.
pub const MAX_TILE_COUNT: usize = 100_000;

/// The decoded name table for one cell's lot pack.
#[derive(Clone, Debug)]
pub struct LotHeader {
    pub version: i32,
    pub tile_names: Vec<String>,
    pub tile_count: i32,
}

/// Tunables for header decoding. `strict` gates the upper-bound check on
/// `tile_count`; a negative count is always rejected regardless.
#[derive(Copy, Clone, Debug)]
pub struct LotHeaderConfig {
    pub max_tile_count: usize,
    pub strict: bool,
}

impl Default for LotHeaderConfig {
    fn default() -> Self {
        LotHeaderConfig { max_tile_count: MAX_TILE_COUNT, strict: true }
    }
}

/// Layout:
/// ```text
/// int32   version
/// int32   tile_count
/// tile_count x newline-terminated string
/// ```
pub fn decode_lot_header<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    config: LotHeaderConfig,
) -> Result<LotHeader, LotHeaderParserError> {
    let version = reader.read_int32(false)?;
    let tile_count_raw = reader.read_int32(false)? as i64;

    if tile_count_raw < 0 || (config.strict && tile_count_raw as usize > config.max_tile_count) {
        return Err(LotHeaderParserError::InvalidTileCount {
            count: tile_count_raw,
            max: config.max_tile_count,
        });
    }

    let tile_count = tile_count_raw as i32;
    let mut tile_names = Vec::with_capacity(tile_count as usize);
    for index in 0..tile_count {
        let name = reader.read_string()?;
        if name.is_empty() {
            return Err(LotHeaderParserError::EmptyTileName { index });
        }
        tile_names.push(name);
    }

    Ok(LotHeader { version, tile_names, tile_count })
}

#[cfg(test)]
fn reader_over(bytes: Vec<u8>) -> BinaryReader<std::io::Cursor<Vec<u8>>> {
    BinaryReader::new(std::io::Cursor::new(bytes))
}

#[test]
fn test_header_round_trip() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1i32.to_le_bytes()); // version
    bytes.extend_from_slice(&2i32.to_le_bytes()); // tile_count
    bytes.extend_from_slice(b"floor\n");
    bytes.extend_from_slice(b"wall\n");

    let mut reader = reader_over(bytes);
    let header = decode_lot_header(&mut reader, LotHeaderConfig::default()).unwrap();
    assert_eq!(header.version, 1);
    assert_eq!(header.tile_count, 2);
    assert_eq!(header.tile_names, vec!["floor".to_string(), "wall".to_string()]);
}

#[test]
fn test_negative_tile_count_fails_without_consuming_more() {
    let bytes = vec![0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
    let mut reader = reader_over(bytes);
    let err = decode_lot_header(&mut reader, LotHeaderConfig::default()).unwrap_err();
    assert!(matches!(err, LotHeaderParserError::InvalidTileCount { count: -1, .. }));
    assert_eq!(reader.bytes_read(), 8);
}

#[test]
fn test_tile_count_above_max_fails_in_strict_mode() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&200_000i32.to_le_bytes());
    let mut reader = reader_over(bytes);
    let config = LotHeaderConfig { max_tile_count: 100_000, strict: true };
    let err = decode_lot_header(&mut reader, config).unwrap_err();
    assert!(matches!(err, LotHeaderParserError::InvalidTileCount { count: 200_000, .. }));
}

#[test]
fn test_empty_tile_name_rejected() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.push(b'\n');
    let mut reader = reader_over(bytes);
    let err = decode_lot_header(&mut reader, LotHeaderConfig::default()).unwrap_err();
    assert!(matches!(err, LotHeaderParserError::EmptyTileName { index: 0 }));
}
