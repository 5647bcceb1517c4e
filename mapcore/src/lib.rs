//! Binary decoders and parallel tile search for a cell-based voxel map
//! format: lot headers, lot packs, tile definitions, and the coordinator
//! that binds them to a directory on disk.

pub mod cell;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod lotheader;
pub mod lotpack;
pub mod processor;
pub mod search;
pub mod tile;
pub mod tiledef;

pub use cell::{CellData, GridSquare, MapCell};
pub use coordinator::{Coordinator, Statistics};
pub use error::{LotHeaderParserError, LotPackParserError, ParserError, TileParserError};
pub use executor::{ExecutorConfig, ExecutorStatistics};
pub use lotheader::{decode_lot_header, LotHeader, LotHeaderConfig};
pub use lotpack::decode_lot_pack;
pub use processor::{parse_cell, process_cell_for_search, ProcessCellError};
pub use search::{CellHits, CellItem, SearchEngine};
pub use tile::{Tile, TileCategory, TileDefinition, TileLayer, TileProperty, Tilesheet};
pub use tiledef::{compute_sprite_id, decode_tdef, parse_file_number, TileDefinitionStore, TilesheetStore};

pub use coords::{BoundsCoord, CellCoord, ChunkCoord, LocalCellCoord, LocalChunkCoord, WorldCoord};
pub use binreader::{BinaryReader, ReaderError};
