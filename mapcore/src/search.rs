//! Drives the batch executor (or a plain sequential scan) over a cell
//! collection with a lowercased name query.

use crate::{
    cell::MapCell,
    executor::{self, ExecutorConfig, ExecutorStatistics},
    lotheader::LotHeaderConfig,
    processor::{self, ProcessCellError},
};
use coords::{CellCoord, LocalCellCoord};
use std::{collections::HashSet, path::PathBuf, sync::Arc};

/// The bare filesystem identity of a cell, independent of any decode state.
/// Used to describe search work without entangling it with `MapCell`'s
/// loaded/unloaded lifecycle.
#[derive(Clone, Debug)]
pub struct CellItem {
    pub position: CellCoord,
    pub header_path: PathBuf,
    pub pack_path: PathBuf,
}

pub type CellHits = (CellCoord, Vec<(LocalCellCoord, String)>);

/// Wraps the batch executor with the fixed configuration the spec mandates
/// for search (`batch_size = 4`, `retry_count = 3`); only `max_workers` is
/// supplied by the caller.
pub struct SearchEngine {
    max_workers: usize,
    header_config: LotHeaderConfig,
}

impl SearchEngine {
    pub fn new(max_workers: usize) -> Self {
        SearchEngine { max_workers, header_config: LotHeaderConfig::default() }
    }

    /// Iterate cells in insertion order, yielding `(position, hits)` only
    /// when `hits` is non-empty.
    pub fn search_sequential(&self, cells: &[CellItem], names: &[String]) -> Vec<CellHits> {
        let query = lowercase_query(names);
        let mut out = Vec::new();
        for item in cells {
            let mut cell = MapCell::new(item.position, item.header_path.clone(), item.pack_path.clone());
            match processor::process_cell_for_search(&mut cell, &query, self.header_config) {
                Ok(hits) if !hits.is_empty() => out.push((item.position, hits)),
                Ok(_) => {}
                Err(err) => tracing::warn!(cell = %item.position, error = %err, "skipping cell during search"),
            }
        }
        out
    }

    /// Fan the same scan out across a worker pool, yielding batches of
    /// non-empty `(position, hits)` pairs in submission order. The returned
    /// iterator drives the pool one batch at a time — a caller that stops
    /// pulling from it halts submission of any batch not already running.
    pub fn search_parallel(
        &self,
        cells: Vec<CellItem>,
        names: &[String],
    ) -> (impl Iterator<Item = Vec<CellHits>>, Arc<ExecutorStatistics>) {
        let query = Arc::new(lowercase_query(names));
        let header_config = self.header_config;

        let config = ExecutorConfig {
            max_workers: self.max_workers,
            batch_size: 4,
            retry_count: 3,
            log_progress: false,
        };

        let worker_query = Arc::clone(&query);
        executor::process_items::<CellItem, CellHits, _, _>(
            cells,
            &config,
            move |item: &CellItem| {
                let mut cell = MapCell::new(item.position, item.header_path.clone(), item.pack_path.clone());
                let hits = processor::process_cell_for_search(&mut cell, &worker_query, header_config)
                    .map_err(|e: ProcessCellError| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })?;
                Ok::<CellHits, Box<dyn std::error::Error + Send + Sync>>((item.position, hits))
            },
            Some(|result: &CellHits| !result.1.is_empty()),
        )
    }
}

fn lowercase_query(names: &[String]) -> HashSet<String> {
    names.iter().map(|n| n.to_lowercase()).collect()
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

    pub fn write_pack_file(path: &std::path::Path, tile_id: Option<i32>) {
        const CHUNKS_PER_AXIS: i32 = 30;
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&900i32.to_le_bytes());
        let table_len = 8 + (CHUNKS_PER_AXIS * CHUNKS_PER_AXIS * 8) as usize;
        let chunk_offset = table_len as i32;
        for cx in 0..CHUNKS_PER_AXIS {
            for cy in 0..CHUNKS_PER_AXIS {
                let offset = if cx == 0 && cy == 0 && tile_id.is_some() { chunk_offset } else { 0 };
                bytes.extend_from_slice(&offset.to_le_bytes());
                bytes.extend_from_slice(&0i32.to_le_bytes());
            }
        }
        if let Some(tile_id) = tile_id {
            bytes.extend_from_slice(&1i32.to_le_bytes());
            bytes.extend_from_slice(&tile_id.to_le_bytes());
        }
        std::fs::File::create(path).unwrap().write_all(&bytes).unwrap();
    }
}

#[test]
fn test_sequential_and_parallel_search_agree() {
    use support::{write_header_file, write_pack_file};

    let dir = tempfile::tempdir().unwrap();
    let mut cells = Vec::new();
    for (cx, cy, has_hit) in [(0, 0, true), (1, 0, false), (0, 1, true)] {
        let header_path = dir.path().join(format!("{}_{}.lotheader", cx, cy));
        let pack_path = dir.path().join(format!("world_{}_{}.lotpack", cx, cy));
        write_header_file(&header_path, &["floor_wood"]);
        write_pack_file(&pack_path, if has_hit { Some(0) } else { None });
        cells.push(CellItem { position: CellCoord::new(cx, cy), header_path, pack_path });
    }

    let engine = SearchEngine::new(2);
    let names = vec!["floor_wood".to_string()];

    let sequential = engine.search_sequential(&cells, &names);
    let (parallel_batches, stats) = engine.search_parallel(cells, &names);
    let mut parallel: Vec<CellHits> = parallel_batches.flatten().collect();

    let mut seq_positions: Vec<CellCoord> = sequential.iter().map(|(p, _)| *p).collect();
    let mut par_positions: Vec<CellCoord> = parallel.iter().map(|(p, _)| *p).collect();
    seq_positions.sort_by_key(|p| (p.x, p.y));
    par_positions.sort_by_key(|p| (p.x, p.y));

    assert_eq!(seq_positions, par_positions);
    assert_eq!(seq_positions.len(), 2);
    assert_eq!(stats.processed_count(), 3);
    parallel.clear();
}
