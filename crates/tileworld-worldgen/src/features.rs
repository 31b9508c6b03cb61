//! Chunk-level feature summaries derived from the dense fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tileworld_common::TilePos;

use crate::biome::Biome;
use crate::climate::ClimateBand;
use crate::grid::Grid;
use crate::hydrology::RiverSegment;

/// Share of a chunk covered by one class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coverage<T> {
    /// Class identifier.
    pub kind: T,
    /// Number of tiles of this class.
    pub tiles: u32,
    /// Fraction of the chunk, in `[0, 1]`.
    pub coverage: f64,
}

/// Ranks classes by tile count, descending; ties go to the lower ordinal.
///
/// Classes with no tiles are omitted.
pub fn rank<'a, T>(values: impl IntoIterator<Item = &'a T>) -> Vec<Coverage<T>>
where
    T: Copy + Ord + 'a,
{
    let mut counts: BTreeMap<T, u32> = BTreeMap::new();
    let mut total = 0u32;
    for &value in values {
        *counts.entry(value).or_default() += 1;
        total += 1;
    }

    let mut ranked: Vec<Coverage<T>> = counts
        .into_iter()
        .map(|(kind, tiles)| Coverage {
            kind,
            tiles,
            coverage: f64::from(tiles) / f64::from(total.max(1)),
        })
        .collect();
    // BTreeMap yields ordinal order; a stable sort keeps it for equal counts.
    ranked.sort_by(|a, b| b.tiles.cmp(&a.tiles));
    ranked
}

/// Elevation statistics of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationSummary {
    /// Lowest height.
    pub min: f64,
    /// Highest height.
    pub max: f64,
    /// Mean height.
    pub mean: f64,
}

impl ElevationSummary {
    /// Summarises a height field. An empty field yields all zeros.
    #[must_use]
    pub fn from_heights(heights: &Grid<f64>) -> Self {
        if heights.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
            };
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &h in heights.iter() {
            min = min.min(h);
            max = max.max(h);
            sum += h;
        }
        Self {
            min,
            max,
            mean: sum / heights.len() as f64,
        }
    }
}

/// Feature summary of one chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFeatures {
    /// River segments inside the chunk.
    pub rivers: Vec<RiverSegment>,
    /// Coastline tiles in row-major order.
    pub coasts: Vec<TilePos>,
    /// Climate bands present, most common first.
    pub climate_bands: Vec<Coverage<ClimateBand>>,
    /// Biomes present, most common first.
    pub biome_distribution: Vec<Coverage<Biome>>,
    /// Height statistics.
    pub elevation: ElevationSummary,
}

impl ChunkFeatures {
    /// Most common climate band, if the chunk has any tiles.
    #[must_use]
    pub fn dominant_climate(&self) -> Option<ClimateBand> {
        self.climate_bands.first().map(|c| c.kind)
    }

    /// Most common biome, if the chunk has any tiles.
    #[must_use]
    pub fn dominant_biome(&self) -> Option<Biome> {
        self.biome_distribution.first().map(|c| c.kind)
    }
}
