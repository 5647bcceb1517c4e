//! In-memory representation of a cell: the sparse grid of materialised
//! squares, and the owning `MapCell` handle a caller holds onto.

use crate::{lotheader::LotHeader, tile::Tile};
use coords::LocalCellCoord;
use std::{borrow::Cow, collections::HashMap, path::PathBuf};

/// The up-to-three-layer pile of tiles at a single `(x, y, z)`, plus an
/// optional room identifier.
#[derive(Clone, Debug, Default)]
pub struct GridSquare {
    pub position: Option<LocalCellCoord>,
    pub floor_tiles: Vec<Tile>,
    pub wall_tiles: Vec<Tile>,
    pub object_tiles: Vec<Tile>,
    pub room_id: Option<i32>,
}

impl GridSquare {
    pub fn new(position: LocalCellCoord) -> Self {
        GridSquare { position: Some(position), ..Default::default() }
    }

    /// Total tile count across all three layers.
    pub fn tile_count(&self) -> usize {
        self.floor_tiles.len() + self.wall_tiles.len() + self.object_tiles.len()
    }
}

/// A sparse mapping from `LocalCellCoord` to `GridSquare`. Only visited
/// squares are materialised — a fully populated cell would be
/// 300 * 300 * 8 = 720,000 entries, and real cells are typically under 1% of
/// that.
#[derive(Clone, Debug, Default)]
pub struct CellData {
    squares: HashMap<LocalCellCoord, GridSquare>,
}

impl CellData {
    pub fn new() -> Self {
        CellData::default()
    }

    /// Look up a square. If `create_if_missing` is set and no square exists
    /// at `pos`, a fresh one is inserted and returned. Otherwise, an unknown
    /// position yields a transient empty square that is never inserted into
    /// the map.
    pub fn get_square(&mut self, pos: LocalCellCoord, create_if_missing: bool) -> Cow<'_, GridSquare> {
        if create_if_missing {
            Cow::Borrowed(self.squares.entry(pos).or_insert_with(|| GridSquare::new(pos)))
        } else {
            match self.squares.get(&pos) {
                Some(square) => Cow::Borrowed(square),
                None => Cow::Owned(GridSquare::new(pos)),
            }
        }
    }

    /// Mutable access to (or creation of) the square at `pos`.
    pub fn get_square_mut(&mut self, pos: LocalCellCoord) -> &mut GridSquare {
        self.squares.entry(pos).or_insert_with(|| GridSquare::new(pos))
    }

    /// Iterate every materialised square, without forcing materialisation of
    /// unvisited positions.
    pub fn squares(&self) -> impl Iterator<Item = (&LocalCellCoord, &GridSquare)> {
        self.squares.iter()
    }

    pub fn materialised_count(&self) -> usize {
        self.squares.len()
    }

    /// Sum of tile counts over all three layers across every materialised
    /// square. Never visits the 720,000 theoretically-possible positions —
    /// only the ones actually stored.
    pub fn tile_count(&self) -> usize {
        self.squares.values().map(GridSquare::tile_count).sum()
    }
}

/// A cell's decode state, owned by whatever caller supplied its paths.
/// `header` and `data` are populated per-operation and mutated in place by
/// the decoders; `is_loaded()` iff both are set.
pub struct MapCell {
    pub position: coords::CellCoord,
    pub header_path: PathBuf,
    pub pack_path: PathBuf,
    pub header: Option<LotHeader>,
    pub data: Option<CellData>,
}

impl MapCell {
    pub fn new(position: coords::CellCoord, header_path: PathBuf, pack_path: PathBuf) -> Self {
        MapCell { position, header_path, pack_path, header: None, data: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.header.is_some() && self.data.is_some()
    }

    /// Drop decoded state, releasing its memory. Used by the search path so
    /// peak RSS scales with worker count, not with the number of cells that
    /// have ever been visited.
    pub fn release(&mut self) {
        self.header = None;
        self.data = None;
    }
}

#[test]
fn test_get_square_readonly_does_not_materialise() {
    let mut data = CellData::new();
    let pos = LocalCellCoord::new(1, 2, 0);
    {
        let square = data.get_square(pos, false);
        assert_eq!(square.tile_count(), 0);
    }
    assert_eq!(data.materialised_count(), 0);
}

#[test]
fn test_get_square_create_if_missing_persists() {
    let mut data = CellData::new();
    let pos = LocalCellCoord::new(1, 2, 0);
    data.get_square_mut(pos).floor_tiles.push(Tile::new(0, "floor_01".to_string()));
    assert_eq!(data.materialised_count(), 1);
    assert_eq!(data.tile_count(), 1);
}
