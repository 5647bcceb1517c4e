//! Global tile coords.

use crate::{
    cell::CellCoord,
    chunk::ChunkCoord,
    local::{LocalCellCoord, LocalChunkCoord},
    constants::{CELL_SIZE, CHUNK_SIZE},
};
use std::fmt;

/// Global tile position. `z` is the stacking axis, valid range `0..Z_LEVELS`.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct WorldCoord {
    pub x: i32,
    pub y: i32,
    pub z: u8,
}

impl WorldCoord {
    pub fn new(x: i32, y: i32, z: u8) -> Self {
        WorldCoord { x, y, z }
    }

    /// Split into the cell this position is in and its position relative to
    /// that cell. Floor-divides, so negative coordinates land in
    /// negatively-indexed cells rather than wrapping.
    pub fn to_cell(&self) -> (CellCoord, LocalCellCoord) {
        let cell_x = self.x.div_euclid(CELL_SIZE);
        let cell_y = self.y.div_euclid(CELL_SIZE);
        let local_x = self.x.rem_euclid(CELL_SIZE) as u16;
        let local_y = self.y.rem_euclid(CELL_SIZE) as u16;
        (
            CellCoord::new(cell_x, cell_y),
            LocalCellCoord::new(local_x, local_y, self.z),
        )
    }

    /// Split into the chunk this position is in and its position relative to
    /// that chunk.
    pub fn to_chunk(&self) -> (ChunkCoord, LocalChunkCoord) {
        let chunk_x = self.x.div_euclid(CHUNK_SIZE);
        let chunk_y = self.y.div_euclid(CHUNK_SIZE);
        let local_x = self.x.rem_euclid(CHUNK_SIZE) as u8;
        let local_y = self.y.rem_euclid(CHUNK_SIZE) as u8;
        (
            ChunkCoord::new(chunk_x, chunk_y),
            LocalChunkCoord::new(local_x, local_y, self.z),
        )
    }
}

impl fmt::Display for WorldCoord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{},{},{}>", self.x, self.y, self.z)
    }
}
