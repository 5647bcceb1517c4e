//! Tile-level entities: templates (`TileDefinition`/`Tilesheet`, from TDEF)
//! and placed instances (`Tile`, from a lot pack).

use std::collections::HashMap;

/// A free-form string property attached to a tile definition or instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileProperty {
    pub name: String,
    pub value: String,
}

/// The coarse role a tile plays in a grid square's layering. Inferred at
/// use-time from the tile's name (§4.3.3) — the decoder never sets it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileCategory {
    Floor,
    Wall,
    Object,
    Vegetation,
    Roof,
    Furniture,
}

/// A tile template: one entry in a tilesheet.
#[derive(Clone, Debug)]
pub struct TileDefinition {
    pub sprite_id: u32,
    pub name: String,
    pub tilesheet_name: String,
    pub category: Option<TileCategory>,
    pub properties: HashMap<String, TileProperty>,
}

/// A tilesheet: a grid of tile images plus the `TileDefinition` for each.
#[derive(Clone, Debug)]
pub struct Tilesheet {
    pub name: String,
    pub image_name: String,
    pub width_tiles: i32,
    pub height_tiles: i32,
    pub tilesheet_number: i32,
    pub tiles: HashMap<i32, TileDefinition>,
}

/// A placed instance of a tile inside a grid square.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tile {
    pub tile_id: i32,
    pub texture_name: String,
    pub offset_x: i32,
    pub offset_y: i32,
    pub properties: HashMap<String, TileProperty>,
}

impl Tile {
    pub fn new(tile_id: i32, texture_name: String) -> Self {
        Tile {
            tile_id,
            texture_name,
            offset_x: 0,
            offset_y: 0,
            properties: HashMap::new(),
        }
    }

    /// Which layer this tile belongs to, by case-insensitive substring match
    /// on its resolved name. Faithful to the source behavior: checked in
    /// this order, `"wall"` wins over `"floor"` (so `"floorwall_01"`
    /// resolves to wall), everything else falls to object. This is a stable
    /// API — callers filter by layer relying on this exact ordering.
    pub fn layer(&self) -> TileLayer {
        let lower = self.texture_name.to_lowercase();
        if lower.contains("wall") {
            TileLayer::Wall
        } else if lower.contains("floor") {
            TileLayer::Floor
        } else {
            TileLayer::Object
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileLayer {
    Floor,
    Wall,
    Object,
}

#[test]
fn test_layer_classification_wall_wins_over_floor() {
    let tile = Tile::new(0, "floorwall_01".to_string());
    assert_eq!(tile.layer(), TileLayer::Wall);
}

#[test]
fn test_layer_classification_floor() {
    let tile = Tile::new(0, "floors_tilea_01".to_string());
    assert_eq!(tile.layer(), TileLayer::Floor);
}

#[test]
fn test_layer_classification_object() {
    let tile = Tile::new(0, "furniture_seating_01".to_string());
    assert_eq!(tile.layer(), TileLayer::Object);
}
