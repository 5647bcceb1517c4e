//! Orchestrates header-then-pack decoding for a single cell, and the
//! header-pruned scan used by the search engine.

use crate::{
    cell::{CellData, MapCell},
    error::{LotHeaderParserError, LotPackParserError},
    lotheader::{self, LotHeaderConfig},
    lotpack,
    tile::TileLayer,
};
use binreader::BinaryReader;
use coords::LocalCellCoord;
use std::{collections::HashSet, fs::File, io::BufReader, path::Path};
use thiserror::Error;

/// Errors surfaced by the map processor. Both variants are non-fatal to the
/// caller — the coordinator logs them and moves on to the next cell.
#[derive(Debug, Error)]
pub enum ProcessCellError {
    #[error("failed to open {path}: {source}")]
    Open { path: std::path::PathBuf, #[source] source: std::io::Error },

    #[error(transparent)]
    Header(#[from] LotHeaderParserError),

    #[error(transparent)]
    Pack(#[from] LotPackParserError),
}

fn open_reader(path: &Path) -> Result<BinaryReader<BufReader<File>>, ProcessCellError> {
    let file = File::open(path)
        .map_err(|source| ProcessCellError::Open { path: path.to_path_buf(), source })?;
    Ok(BinaryReader::new(BufReader::new(file)))
}

/// Decode a cell's header and pack, and attach both to it. On any failure
/// the cell's fields are left exactly as they were found.
pub fn parse_cell(cell: &mut MapCell, header_config: LotHeaderConfig) -> Result<(), ProcessCellError> {
    let mut header_reader = open_reader(&cell.header_path)?;
    let header = lotheader::decode_lot_header(&mut header_reader, header_config)?;

    let mut pack_reader = open_reader(&cell.pack_path)?;
    let data = lotpack::decode_lot_pack(&mut pack_reader, &header, cell.position)?;

    cell.header = Some(header);
    cell.data = Some(data);
    Ok(())
}

/// Decode only what's needed to answer "does this cell contain any of
/// `query_names_lowercased`?", and collect the hits if so.
///
/// Always releases `cell.header`/`cell.data` before returning, whether or
/// not a match was found, so a worker's peak memory never grows with the
/// number of cells it has visited.
pub fn process_cell_for_search(
    cell: &mut MapCell,
    query_names_lowercased: &HashSet<String>,
    header_config: LotHeaderConfig,
) -> Result<Vec<(LocalCellCoord, String)>, ProcessCellError> {
    let result = (|| -> Result<Vec<(LocalCellCoord, String)>, ProcessCellError> {
        let mut header_reader = open_reader(&cell.header_path)?;
        let header = lotheader::decode_lot_header(&mut header_reader, header_config)?;

        let header_names: HashSet<String> =
            header.tile_names.iter().map(|name| name.to_lowercase()).collect();
        if header_names.is_disjoint(query_names_lowercased) {
            return Ok(Vec::new());
        }

        let mut pack_reader = open_reader(&cell.pack_path)?;
        let data = lotpack::decode_lot_pack(&mut pack_reader, &header, cell.position)?;

        Ok(collect_hits(&data, query_names_lowercased))
    })();

    cell.release();
    result
}

fn collect_hits(data: &CellData, query_names_lowercased: &HashSet<String>) -> Vec<(LocalCellCoord, String)> {
    let mut hits = Vec::new();
    for (pos, square) in data.squares() {
        for layer in [TileLayer::Floor, TileLayer::Wall, TileLayer::Object] {
            let tiles = match layer {
                TileLayer::Floor => &square.floor_tiles,
                TileLayer::Wall => &square.wall_tiles,
                TileLayer::Object => &square.object_tiles,
            };
            for tile in tiles {
                if query_names_lowercased.contains(&tile.texture_name.to_lowercase()) {
                    hits.push((*pos, tile.texture_name.clone()));
                }
            }
        }
    }
    hits
}

#[cfg(test)]
mod support {
    use std::io::Write;

    pub fn write_header_file(path: &std::path::Path, names: &[&str]) {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&(names.len() as i32).to_le_bytes());
        for name in names {
            bytes.extend_from_slice(name.as_bytes());
            bytes.push(b'\n');
        }
        std::fs::File::create(path).unwrap().write_all(&bytes).unwrap();
    }

    pub fn write_pack_file(path: &std::path::Path, first_chunk_tile_id: Option<i32>) {
        const CHUNKS_PER_AXIS: i32 = 30;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&900i32.to_le_bytes());
        let table_len = 8 + (CHUNKS_PER_AXIS * CHUNKS_PER_AXIS * 8) as usize;
        let chunk_offset = table_len as i32;
        for cx in 0..CHUNKS_PER_AXIS {
            for cy in 0..CHUNKS_PER_AXIS {
                let offset = if cx == 0 && cy == 0 && first_chunk_tile_id.is_some() { chunk_offset } else { 0 };
                bytes.extend_from_slice(&offset.to_le_bytes());
                bytes.extend_from_slice(&0i32.to_le_bytes());
            }
        }
        if let Some(tile_id) = first_chunk_tile_id {
            bytes.extend_from_slice(&1i32.to_le_bytes());
            bytes.extend_from_slice(&tile_id.to_le_bytes());
        }
        std::fs::File::create(path).unwrap().write_all(&bytes).unwrap();
    }
}

#[test]
fn test_parse_cell_attaches_header_and_data() {
    use support::{write_header_file, write_pack_file};

    let dir = tempfile::tempdir().unwrap();
    let header_path = dir.path().join("0_0.lotheader");
    let pack_path = dir.path().join("world_0_0.lotpack");
    write_header_file(&header_path, &["floor_wood"]);
    write_pack_file(&pack_path, Some(0));

    let mut cell = MapCell::new(coords::CellCoord::new(0, 0), header_path, pack_path);
    parse_cell(&mut cell, LotHeaderConfig::default()).unwrap();

    assert!(cell.is_loaded());
    assert_eq!(cell.data.as_ref().unwrap().tile_count(), 1);
}

#[test]
fn test_search_prunes_on_disjoint_header() {
    use support::{write_header_file, write_pack_file};

    let dir = tempfile::tempdir().unwrap();
    let header_path = dir.path().join("0_0.lotheader");
    let pack_path = dir.path().join("world_0_0.lotpack");
    write_header_file(&header_path, &["floor_wood"]);
    // deliberately do not write the pack file: if the processor tries to
    // open it, this test fails with an Open error instead of an empty Ok.
    let _ = &pack_path;

    let mut cell = MapCell::new(coords::CellCoord::new(0, 0), header_path, pack_path);
    let query: HashSet<String> = ["unique_name_xyz".to_string()].into_iter().collect();
    let hits = process_cell_for_search(&mut cell, &query, LotHeaderConfig::default()).unwrap();

    assert!(hits.is_empty());
    assert!(!cell.is_loaded());
}

#[test]
fn test_search_hits_and_releases_state() {
    use support::{write_header_file, write_pack_file};

    let dir = tempfile::tempdir().unwrap();
    let header_path = dir.path().join("0_0.lotheader");
    let pack_path = dir.path().join("world_0_0.lotpack");
    write_header_file(&header_path, &["floor_wood"]);
    write_pack_file(&pack_path, Some(0));

    let mut cell = MapCell::new(coords::CellCoord::new(0, 0), header_path, pack_path);
    let query: HashSet<String> = ["floor_wood".to_string()].into_iter().collect();
    let hits = process_cell_for_search(&mut cell, &query, LotHeaderConfig::default()).unwrap();

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].1, "floor_wood");
    assert!(!cell.is_loaded());
}
