//! Coordinate algebra for the four grids a map tile can be addressed in:
//! world, cell, chunk, and the two local (in-cell / in-chunk) spaces.
//!
//! All conversions are exact integer floor-div/mod — they round toward
//! negative infinity, so a tile at a negative world coordinate lands in a
//! negatively-indexed cell rather than wrapping.

mod constants;
mod world;
mod cell;
mod chunk;
mod local;
mod bounds;

pub use crate::{
    constants::{
        CELL_SIZE,
        CHUNK_SIZE,
        CHUNKS_PER_CELL,
        Z_LEVELS,
    },
    world::WorldCoord,
    cell::CellCoord,
    chunk::ChunkCoord,
    local::{
        LocalCellCoord,
        LocalChunkCoord,
    },
    bounds::BoundsCoord,
};


#[test]
fn test_world_cell_round_trip() {
    for cx in -5..5 {
        for cy in -5..5 {
            let cell = CellCoord::new(cx, cy);
            for lx in [0, 1, 149, 298, 299] {
                for ly in [0, 1, 149, 298, 299] {
                    for lz in 0..Z_LEVELS {
                        let local = LocalCellCoord::new(lx, ly, lz);
                        let world = cell.to_world(local);
                        assert_eq!(world.to_cell(), (cell, local));
                    }
                }
            }
        }
    }
}

#[test]
fn test_chunk_round_trip() {
    for cx in -3..3 {
        for cy in -3..3 {
            let chunk = ChunkCoord::new(cx, cy);
            for lx in 0..CHUNK_SIZE as u8 {
                for ly in 0..CHUNK_SIZE as u8 {
                    for lz in 0..Z_LEVELS {
                        let local = LocalChunkCoord::new(lx, ly, lz);
                        let world = chunk.to_world(local);
                        assert_eq!(world.to_chunk(), (chunk, local));
                    }
                }
            }
        }
    }
}

#[test]
fn test_negative_world_position() {
    let world = WorldCoord::new(-1, -1, 0);
    let (cell, local) = world.to_cell();
    assert_eq!(cell, CellCoord::new(-1, -1));
    assert_eq!(local, LocalCellCoord::new(299, 299, 0));
}
