//! Decoder for `.lotpack` files: a sparse 3-D grid of 300x300x8 positions,
//! stored as 900 chunks of 10x10 columns x 8 levels, fronted by an offset
//! index for random access.

use crate::{
    cell::CellData,
    error::LotPackParserError,
    lotheader::LotHeader,
    tile::{Tile, TileLayer},
};
use binreader::BinaryReader;
use coords::{CellCoord, LocalCellCoord};
use std::io::{Read, Seek};

const CHUNKS_PER_AXIS: i32 = 30;
const EXPECTED_CHUNK_COUNT: i32 = 900;

/// Decode a lot pack file into a cell's sparse grid, using `header`'s name
/// table to resolve tile IDs to names.
pub fn decode_lot_pack<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    header: &LotHeader,
    cell_position: CellCoord,
) -> Result<CellData, LotPackParserError> {
    let chunk_count = reader.read_int32(false).map_err(LotPackParserError::OffsetTable)?;
    if chunk_count != EXPECTED_CHUNK_COUNT {
        tracing::warn!(chunk_count, expected = EXPECTED_CHUNK_COUNT, "lot pack chunk_count mismatch");
    }

    let mut chunk_offsets = Vec::new();
    for cx in 0..CHUNKS_PER_AXIS {
        for cy in 0..CHUNKS_PER_AXIS {
            let absolute_offset =
                reader.read_int32(false).map_err(LotPackParserError::OffsetTable)?;
            let padding = reader.read_int32(false).map_err(LotPackParserError::OffsetTable)?;
            if padding != 0 {
                tracing::warn!(cx, cy, padding, "non-zero padding in chunk offset table");
            }
            if absolute_offset != 0 {
                chunk_offsets.push((cx, cy, absolute_offset));
            }
        }
    }

    let mut cell_data = CellData::new();
    for (cx, cy, offset) in chunk_offsets {
        let chunk_coord = cell_position.chunk_at(cx, cy);
        reader
            .seek_to(offset as u64)
            .map_err(|source| LotPackParserError::ChunkDecode { chunk: chunk_coord, source })?;
        decode_chunk_body(reader, header, cx, cy, &mut cell_data)
            .map_err(|source| LotPackParserError::ChunkDecode { chunk: chunk_coord, source })?;
    }

    Ok(cell_data)
}

/// Walk one chunk's positions in `(z outer, x middle, y inner)` order,
/// decoding the tile sequence at each.
fn decode_chunk_body<R: Read + Seek>(
    reader: &mut BinaryReader<R>,
    header: &LotHeader,
    cx: i32,
    cy: i32,
    cell_data: &mut CellData,
) -> Result<(), binreader::ReaderError> {
    let mut skip_remaining: i64 = 0;

    for z in 0..8u8 {
        for x in 0..10u8 {
            for y in 0..10u8 {
                if skip_remaining > 0 {
                    skip_remaining -= 1;
                    continue;
                }

                let count = reader.read_int32(false)?;

                if count == -1 {
                    let skip_count = reader.read_int32(false)? as i64;
                    // The marker's own position is one of the skipped
                    // positions; `skip_count - 1` more follow it with no
                    // stream read before a normal read resumes.
                    skip_remaining = (skip_count - 1).max(0);
                    continue;
                }

                if count <= 0 {
                    continue;
                }

                let count = count as usize;
                let mut ids = Vec::with_capacity(count);
                for _ in 0..count {
                    ids.push(reader.read_int32(false)?);
                }

                let local = LocalCellCoord::new(
                    (cx * 10 + x as i32) as u16,
                    (cy * 10 + y as i32) as u16,
                    z,
                );

                let (room_id, tile_ids): (Option<i32>, &[i32]) = if ids.len() > 1 {
                    (Some(ids[0]), &ids[1..])
                } else {
                    (None, &ids[..])
                };

                if let Some(room_id) = room_id {
                    cell_data.get_square_mut(local).room_id = Some(room_id);
                }

                for &tile_id in tile_ids {
                    if tile_id < 0 || tile_id as usize >= header.tile_names.len() {
                        tracing::warn!(tile_id, "tile id out of range, dropping");
                        continue;
                    }
                    let name = header.tile_names[tile_id as usize].clone();
                    let tile = Tile::new(tile_id, name);
                    let square = cell_data.get_square_mut(local);
                    match tile.layer() {
                        TileLayer::Floor => square.floor_tiles.push(tile),
                        TileLayer::Wall => square.wall_tiles.push(tile),
                        TileLayer::Object => square.object_tiles.push(tile),
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
fn header_with_names(names: &[&str]) -> LotHeader {
    LotHeader {
        version: 1,
        tile_count: names.len() as i32,
        tile_names: names.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
fn empty_chunk_offset_table() -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&EXPECTED_CHUNK_COUNT.to_le_bytes());
    for _ in 0..(CHUNKS_PER_AXIS * CHUNKS_PER_AXIS) {
        bytes.extend_from_slice(&0i32.to_le_bytes()); // offset
        bytes.extend_from_slice(&0i32.to_le_bytes()); // padding
    }
    bytes
}

#[test]
fn test_skip_marker_lands_tile_at_sixth_position() {
    let header = header_with_names(&["floor_tile"]);

    let mut bytes = empty_chunk_offset_table();
    let chunk_data_offset = bytes.len() as i32;
    // patch chunk (0,0)'s offset entry (the first one in the table, right
    // after the 4-byte chunk_count) to point at the chunk body we append.
    bytes[4..8].copy_from_slice(&chunk_data_offset.to_le_bytes());

    // position 0 (z=0,x=0,y=0): skip marker, skip_count=5
    bytes.extend_from_slice(&(-1i32).to_le_bytes());
    bytes.extend_from_slice(&5i32.to_le_bytes());
    // the marker's own position plus 4 more (y=1..=4) are skipped; the
    // next read resumes at position 5 (z=0,x=0,y=5): one tile, id 0
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());

    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    let cell_data = decode_lot_pack(&mut reader, &header, CellCoord::new(0, 0)).unwrap();

    assert_eq!(cell_data.materialised_count(), 1);
    let (pos, square) = cell_data.squares().next().unwrap();
    assert_eq!(*pos, LocalCellCoord::new(0, 5, 0));
    assert_eq!(square.floor_tiles.len(), 1);
    assert_eq!(square.floor_tiles[0].texture_name, "floor_tile");
}

#[test]
fn test_room_id_and_tiles_from_multi_value_entry() {
    let header = header_with_names(&["wall_brick", "floor_wood"]);

    let mut bytes = empty_chunk_offset_table();
    let chunk_data_offset = bytes.len() as i32;
    bytes[4..8].copy_from_slice(&chunk_data_offset.to_le_bytes());

    // position 0: count=3 -> room_id=7, tile_ids=[0, 1]
    bytes.extend_from_slice(&3i32.to_le_bytes());
    bytes.extend_from_slice(&7i32.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&1i32.to_le_bytes());

    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    let cell_data = decode_lot_pack(&mut reader, &header, CellCoord::new(0, 0)).unwrap();

    let (_, square) = cell_data.squares().next().unwrap();
    assert_eq!(square.room_id, Some(7));
    assert_eq!(square.wall_tiles.len(), 1);
    assert_eq!(square.floor_tiles.len(), 1);
}

#[test]
fn test_out_of_range_tile_id_is_dropped() {
    let header = header_with_names(&["floor_wood"]);

    let mut bytes = empty_chunk_offset_table();
    let chunk_data_offset = bytes.len() as i32;
    bytes[4..8].copy_from_slice(&chunk_data_offset.to_le_bytes());

    // single tile id, out of range
    bytes.extend_from_slice(&1i32.to_le_bytes());
    bytes.extend_from_slice(&99i32.to_le_bytes());

    let mut reader = BinaryReader::new(std::io::Cursor::new(bytes));
    let cell_data = decode_lot_pack(&mut reader, &header, CellCoord::new(0, 0)).unwrap();

    // the out-of-range id is silently dropped, leaving no tile anywhere
    assert_eq!(cell_data.tile_count(), 0);
}
