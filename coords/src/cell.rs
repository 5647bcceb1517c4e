//! Cell coords.

use crate::{
    world::WorldCoord,
    chunk::ChunkCoord,
    local::LocalCellCoord,
    constants::{CELL_SIZE, CHUNKS_PER_CELL},
};
use std::fmt;

/// Index of a 300x300 tile square. Cell (0,0) covers world x,y in [0,300).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
}

impl CellCoord {
    pub fn new(x: i32, y: i32) -> Self {
        CellCoord { x, y }
    }

    /// Reconstruct the world position of a tile at `local` within this cell.
    pub fn to_world(&self, local: LocalCellCoord) -> WorldCoord {
        WorldCoord::new(
            self.x * CELL_SIZE + local.x as i32,
            self.y * CELL_SIZE + local.y as i32,
            local.z,
        )
    }

    /// The globally-numbered chunk coord of the chunk at `(cx, cy)` within
    /// this cell's 30x30 chunk grid (as iterated by the lot-pack chunk
    /// offset table, §4.3.1).
    pub fn chunk_at(&self, cx: i32, cy: i32) -> ChunkCoord {
        debug_assert!((0..CHUNKS_PER_CELL).contains(&cx));
        debug_assert!((0..CHUNKS_PER_CELL).contains(&cy));
        ChunkCoord::new(self.x * CHUNKS_PER_CELL + cx, self.y * CHUNKS_PER_CELL + cy)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{},{}>", self.x, self.y)
    }
}
