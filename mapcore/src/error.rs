//! The parser error taxonomy (§7 of the spec).
//!
//! `ParserError` is the root type every decoder in this crate ultimately
//! returns. Each binary format gets its own leaf variant set so a caller can
//! match on *what kind* of file failed to decode, not just that something
//! went wrong.

use coords::ChunkCoord;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParserError>;

/// Root error type for every decode operation in this crate.
#[derive(Debug, Error)]
pub enum ParserError {
    #[error(transparent)]
    TileDef(#[from] TileParserError),

    #[error(transparent)]
    LotHeader(#[from] LotHeaderParserError),

    #[error(transparent)]
    LotPack(#[from] LotPackParserError),

    #[error("failed to open {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from decoding a `.tiles` (TDEF) file.
#[derive(Debug, Error)]
pub enum TileParserError {
    #[error("bad TDEF magic: expected \"tdef\", found {found:?}")]
    InvalidMagic { found: [u8; 4] },

    #[error("malformed property block for tile {tile_index} in tilesheet {tilesheet_number}")]
    MalformedPropertyBlock {
        tilesheet_number: i32,
        tile_index: i32,
        #[source]
        source: binreader::ReaderError,
    },

    #[error(transparent)]
    Reader(#[from] binreader::ReaderError),
}

/// Errors from decoding a `.lotheader` file.
#[derive(Debug, Error)]
pub enum LotHeaderParserError {
    #[error("invalid tile_count {count} (must be in [0, {max}])")]
    InvalidTileCount { count: i64, max: usize },

    #[error("empty tile name at index {index}")]
    EmptyTileName { index: i32 },

    #[error(transparent)]
    Reader(#[from] binreader::ReaderError),
}

/// Errors from decoding a `.lotpack` file. Always carries the chunk
/// coordinate that was being decoded when the failure occurred, so a failure
/// in one chunk can be logged precisely without aborting the whole cell scan
/// at the caller (the map processor demotes this to a skipped cell).
#[derive(Debug, Error)]
pub enum LotPackParserError {
    #[error("failed to read the chunk offset table")]
    OffsetTable(#[source] binreader::ReaderError),

    #[error("failed to decode chunk {chunk}")]
    ChunkDecode {
        chunk: ChunkCoord,
        #[source]
        source: binreader::ReaderError,
    },
}
