//! The generation result for one chunk.

use serde::Serialize;
use tileworld_common::{ChunkCoord, ChunkKey};

use crate::biome::{Biome, TileType};
use crate::climate::ClimateBand;
use crate::features::ChunkFeatures;
use crate::grid::Grid;

/// Dense per-tile layers, all `chunk_size × chunk_size`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFields {
    /// Terrain height in `[0, 1]`.
    pub height: Grid<f64>,
    /// Temperature in `[0, 1]` after altitude cooling.
    pub temperature: Grid<f64>,
    /// Moisture in `[0, 1]`.
    pub moisture: Grid<f64>,
    /// Climate band of each tile.
    pub climate: Grid<ClimateBand>,
    /// Biome of each tile.
    pub biome: Grid<Biome>,
    /// River flag; only ever set on land below the mountain level.
    pub is_river: Grid<bool>,
    /// Water flag; set exactly where the tile type is water.
    pub is_water: Grid<bool>,
}

/// Everything generated for one chunk.
///
/// A pure function of `(seed, chunk_x, chunk_y, chunk_size)` and the
/// generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkPayload {
    /// Chunk X coordinate.
    pub chunk_x: i32,
    /// Chunk Y coordinate.
    pub chunk_y: i32,
    /// Tiles per side.
    pub chunk_size: u32,
    /// World seed this payload was generated from.
    pub seed: u64,
    /// Tile types, indexed `[row][col]`.
    pub tiles: Grid<TileType>,
    /// Dense per-tile layers.
    pub fields: ChunkFields,
    /// Chunk-level summary.
    pub features: ChunkFeatures,
}

impl ChunkPayload {
    /// Chunk coordinate.
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        ChunkCoord::new(self.chunk_x, self.chunk_y)
    }

    /// Canonical key of this chunk.
    #[must_use]
    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.chunk_x, self.chunk_y)
    }

    /// Number of tiles in the chunk.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Number of tiles with a river.
    #[must_use]
    pub fn river_tile_count(&self) -> usize {
        self.fields.is_river.iter().filter(|&&r| r).count()
    }
}
