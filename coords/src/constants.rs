//! Compile-time grid dimensions. These are never read from a file — they are
//! baked into the map format itself.

/// Width/height, in tiles, of a cell.
pub const CELL_SIZE: i32 = 300;

/// Width/height, in tiles, of a chunk.
pub const CHUNK_SIZE: i32 = 10;

/// Chunks per cell along one axis (`CELL_SIZE / CHUNK_SIZE`).
pub const CHUNKS_PER_CELL: i32 = CELL_SIZE / CHUNK_SIZE;

/// Number of z-levels a tile coordinate can occupy.
pub const Z_LEVELS: u8 = 8;
