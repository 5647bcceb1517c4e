//! Binds a root directory to the decoders and search engine below it, and
//! exposes the library's public surface.

use crate::{
    cell::{CellData, MapCell},
    executor::{self, ExecutorConfig, ExecutorStatistics},
    lotheader::{self, LotHeaderConfig},
    lotpack,
    processor::ProcessCellError,
    search::{CellHits, CellItem, SearchEngine},
    tiledef::{self, TileDefinitionStore, TilesheetStore},
};
use binreader::BinaryReader;
use coords::{BoundsCoord, CellCoord, WorldCoord};
use std::{
    collections::HashMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};
use walkdir::WalkDir;

/// Aggregate counters surfaced to callers. Mirrors whichever executor run
/// (`parse_all` or a parallel `search_tiles`) completed most recently.
#[derive(Copy, Clone, Debug, Default)]
pub struct Statistics {
    pub map_cells: usize,
    pub processed_items: usize,
    pub failed_items: usize,
    pub total_batches: usize,
}

/// Top-level entry point: owns the tile-definition caches and the cell map,
/// and binds both to a filesystem root.
pub struct Coordinator {
    root_path: PathBuf,
    max_workers: usize,
    header_config: LotHeaderConfig,
    tile_store: TileDefinitionStore,
    sheet_store: TilesheetStore,
    cells: Vec<MapCell>,
    cell_index: HashMap<CellCoord, usize>,
    last_stats: Option<Arc<ExecutorStatistics>>,
}

impl Coordinator {
    /// `root_path` must exist; a non-existent root is a programmer error
    /// and is fatal at construction.
    pub fn new(root_path: impl Into<PathBuf>, max_workers: usize) -> Self {
        let root_path = root_path.into();
        assert!(root_path.exists(), "Coordinator root path does not exist: {}", root_path.display());
        Coordinator {
            root_path,
            max_workers: max_workers.max(1),
            header_config: LotHeaderConfig::default(),
            tile_store: TileDefinitionStore::new(),
            sheet_store: TilesheetStore::new(),
            cells: Vec::new(),
            cell_index: HashMap::new(),
            last_stats: None,
        }
    }

    /// Decode every TDEF file under the root (unless `skip_tile_parsing`),
    /// then every cell within `bounds`.
    pub fn parse_all(&mut self, skip_tile_parsing: bool, bounds: BoundsCoord) {
        if !skip_tile_parsing {
            self.parse_tile_definitions();
        }

        let cell_items: Vec<CellItem> = discover_cells(&self.root_path)
            .into_iter()
            .filter(|item| bounds.contains(item.position))
            .collect();

        let config = ExecutorConfig { max_workers: self.max_workers, batch_size: 4, retry_count: 3, log_progress: true };
        let header_config = self.header_config;

        let (batches, stats) = executor::process_items::<CellItem, (CellCoord, crate::lotheader::LotHeader, CellData), _, _>(
            cell_items,
            &config,
            move |item: &CellItem| {
                let header = decode_header(&item.header_path, header_config)?;
                let data = decode_pack(&item.pack_path, &header, item.position)?;
                Ok::<_, Box<dyn std::error::Error + Send + Sync>>((item.position, header, data))
            },
            None::<fn(&(CellCoord, crate::lotheader::LotHeader, CellData)) -> bool>,
        );

        for batch in batches {
            for (position, header, data) in batch {
                let header_path = self.root_path.join(format!("{}_{}.lotheader", position.x, position.y));
                let pack_path = self.root_path.join(format!("world_{}_{}.lotpack", position.x, position.y));
                let mut cell = MapCell::new(position, header_path, pack_path);
                cell.header = Some(header);
                cell.data = Some(data);
                self.insert_cell(cell);
            }
        }

        self.last_stats = Some(stats);
    }

    fn parse_tile_definitions(&mut self) {
        for path in discover_tdef_files(&self.root_path) {
            let file_number = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(tiledef::parse_file_number)
                .unwrap_or(0);

            let result = (|| -> Result<(), Box<dyn std::error::Error>> {
                let file = File::open(&path)?;
                let mut reader = BinaryReader::new(BufReader::new(file));
                let (_version, sheets) = tiledef::decode_tdef(&mut reader, file_number, false)?;
                tiledef::merge_into_stores(sheets, &mut self.tile_store, &mut self.sheet_store);
                Ok(())
            })();

            if let Err(err) = result {
                tracing::warn!(path = %path.display(), error = %err, "failed to decode TDEF file, skipping");
            }
        }
    }

    fn insert_cell(&mut self, cell: MapCell) {
        let position = cell.position;
        match self.cell_index.get(&position) {
            Some(&idx) => self.cells[idx] = cell,
            None => {
                self.cell_index.insert(position, self.cells.len());
                self.cells.push(cell);
            }
        }
    }

    /// Lazy stream of `(cell position, hits)`: in parallel mode this drives
    /// the worker pool one batch at a time, so a caller that stops
    /// iterating halts submission of any batch not already running.
    /// Sequential mode has nothing to submit, so it's just a `Vec` iterator.
    /// Query names are lowercased once at this boundary.
    pub fn search_tiles(
        &mut self,
        names: &[String],
        parallel: bool,
        bounds: BoundsCoord,
    ) -> Box<dyn Iterator<Item = CellHits>> {
        let cell_items: Vec<CellItem> = discover_cells(&self.root_path)
            .into_iter()
            .filter(|item| bounds.contains(item.position))
            .collect();

        let engine = SearchEngine::new(self.max_workers);
        if parallel {
            let (batches, stats) = engine.search_parallel(cell_items, names);
            self.last_stats = Some(stats);
            Box::new(batches.flatten())
        } else {
            Box::new(engine.search_sequential(&cell_items, names).into_iter())
        }
    }

    /// Look up the in-memory cell covering `world_coord`, if it has been
    /// parsed (via `parse_all`) already.
    pub fn get_cell_at_world_position(&self, world_coord: WorldCoord) -> Option<&MapCell> {
        let (cell_coord, _local) = world_coord.to_cell();
        self.cell_index.get(&cell_coord).map(|&idx| &self.cells[idx])
    }

    pub fn get_statistics(&self) -> Statistics {
        let (processed_items, failed_items, total_batches) = match &self.last_stats {
            Some(stats) => (stats.processed_count(), stats.failed_count(), stats.current_batch()),
            None => (0, 0, 0),
        };
        Statistics { map_cells: self.cells.len(), processed_items, failed_items, total_batches }
    }

    /// Drop every tile definition and every parsed cell.
    pub fn clear_data(&mut self) {
        self.tile_store.clear();
        self.sheet_store.clear();
        self.cells.clear();
        self.cell_index.clear();
        self.last_stats = None;
    }

    pub fn tile_definitions(&self) -> &TileDefinitionStore {
        &self.tile_store
    }

    pub fn tilesheets(&self) -> &TilesheetStore {
        &self.sheet_store
    }
}

fn decode_header(
    path: &Path,
    config: LotHeaderConfig,
) -> Result<crate::lotheader::LotHeader, Box<dyn std::error::Error + Send + Sync>> {
    let file = File::open(path).map_err(|source| -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(ProcessCellError::Open { path: path.to_path_buf(), source })
    })?;
    let mut reader = BinaryReader::new(BufReader::new(file));
    lotheader::decode_lot_header(&mut reader, config)
        .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })
}

fn decode_pack(
    path: &Path,
    header: &crate::lotheader::LotHeader,
    position: CellCoord,
) -> Result<CellData, Box<dyn std::error::Error + Send + Sync>> {
    let file = File::open(path).map_err(|source| -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(ProcessCellError::Open { path: path.to_path_buf(), source })
    })?;
    let mut reader = BinaryReader::new(BufReader::new(file));
    lotpack::decode_lot_pack(&mut reader, header, position)
        .map_err(|e| -> Box<dyn std::error::Error + Send + Sync> { Box::new(e) })
}

/// Walk `root` for `<x>_<y>.lotheader` files and pair each with its sibling
/// `world_<x>_<y>.lotpack`. A header without a matching pack is skipped
/// with a warning, per the directory convention in the external interface.
fn discover_cells(root: &Path) -> Vec<CellItem> {
    let mut cells = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("lotheader") {
            continue;
        }
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(s) => s,
            None => continue,
        };
        let Some((x_str, y_str)) = stem.split_once('_') else {
            tracing::warn!(path = %path.display(), "lotheader filename does not match <x>_<y> convention, skipping");
            continue;
        };
        let (Ok(x), Ok(y)) = (x_str.parse::<i32>(), y_str.parse::<i32>()) else {
            tracing::warn!(path = %path.display(), "lotheader filename coordinates are not integers, skipping");
            continue;
        };

        let pack_path = path.with_file_name(format!("world_{}_{}.lotpack", x, y));
        if !pack_path.exists() {
            tracing::warn!(header = %path.display(), "no matching lotpack for header, skipping cell");
            continue;
        }

        cells.push(CellItem { position: CellCoord::new(x, y), header_path: path.to_path_buf(), pack_path });
    }
    cells
}

/// Walk `root` for `*.tiles` (TDEF) files.
fn discover_tdef_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .map(|entry| entry.path().to_path_buf())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("tiles"))
        .collect()
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
fn test_parse_all_and_get_cell_at_world_position() {
    use support::{write_header_file, write_pack_file};

    let dir = tempfile::tempdir().unwrap();
    write_header_file(&dir.path().join("0_0.lotheader"), &["floor_wood"]);
    write_pack_file(&dir.path().join("world_0_0.lotpack"), Some(0));

    let mut coordinator = Coordinator::new(dir.path(), 2);
    coordinator.parse_all(true, BoundsCoord::unbounded());

    let stats = coordinator.get_statistics();
    assert_eq!(stats.map_cells, 1);
    assert_eq!(stats.failed_items, 0);

    let cell = coordinator.get_cell_at_world_position(WorldCoord::new(5, 5, 0)).unwrap();
    assert!(cell.is_loaded());
    assert_eq!(cell.data.as_ref().unwrap().tile_count(), 1);
}

#[test]
fn test_header_without_matching_pack_is_skipped() {
    use support::write_header_file;

    let dir = tempfile::tempdir().unwrap();
    write_header_file(&dir.path().join("0_0.lotheader"), &["floor_wood"]);
    // no sibling world_0_0.lotpack written

    let cells = discover_cells(dir.path());
    assert!(cells.is_empty());
}

#[test]
fn test_clear_data_resets_everything() {
    use support::{write_header_file, write_pack_file};

    let dir = tempfile::tempdir().unwrap();
    write_header_file(&dir.path().join("0_0.lotheader"), &["floor_wood"]);
    write_pack_file(&dir.path().join("world_0_0.lotpack"), Some(0));

    let mut coordinator = Coordinator::new(dir.path(), 1);
    coordinator.parse_all(true, BoundsCoord::unbounded());
    assert_eq!(coordinator.get_statistics().map_cells, 1);

    coordinator.clear_data();
    let stats = coordinator.get_statistics();
    assert_eq!(stats.map_cells, 0);
    assert_eq!(stats.processed_items, 0);
}

#[test]
#[should_panic]
fn test_nonexistent_root_path_panics() {
    Coordinator::new("/this/path/does/not/exist/i_hope", 1);
}
