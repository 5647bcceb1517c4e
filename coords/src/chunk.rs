//! Chunk coords.

use crate::{
    world::WorldCoord,
    cell::CellCoord,
    local::LocalChunkCoord,
    constants::{CHUNK_SIZE, CHUNKS_PER_CELL},
};
use std::fmt;

/// Index of a 10x10 tile square, globally numbered (not relative to a cell).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ChunkCoord {
    pub x: i32,
    pub y: i32,
}

impl ChunkCoord {
    pub fn new(x: i32, y: i32) -> Self {
        ChunkCoord { x, y }
    }

    /// Reconstruct the world position of a tile at `local` within this chunk.
    pub fn to_world(&self, local: LocalChunkCoord) -> WorldCoord {
        WorldCoord::new(
            self.x * CHUNK_SIZE + local.x as i32,
            self.y * CHUNK_SIZE + local.y as i32,
            local.z,
        )
    }

    /// The cell this chunk belongs to, and this chunk's `(cx, cy)` position
    /// within that cell's 30x30 chunk grid.
    pub fn to_cell(&self) -> (CellCoord, i32, i32) {
        let cell_x = self.x.div_euclid(CHUNKS_PER_CELL);
        let cell_y = self.y.div_euclid(CHUNKS_PER_CELL);
        let cx = self.x.rem_euclid(CHUNKS_PER_CELL);
        let cy = self.y.rem_euclid(CHUNKS_PER_CELL);
        (CellCoord::new(cell_x, cell_y), cx, cy)
    }
}

impl fmt::Display for ChunkCoord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{},{}>", self.x, self.y)
    }
}
