//! Deterministic chunk generator.
//!
//! A [`WorldGenerator`] is built once per world seed and turns chunk
//! coordinates into [`ChunkPayload`]s. It holds no mutable state, so one
//! instance can be shared freely across threads.
//!
//! ## Pipeline
//!
//! | Step       | Input                     | Output                         |
//! |------------|---------------------------|--------------------------------|
//! | Sample     | world tile                | height, temperature, moisture  |
//! | Climate    | temperature, moisture     | climate band                   |
//! | Biome      | climate, height, moisture | biome and tile type            |
//! | Hydrology  | window heights            | river flags, segments, coasts  |
//! | Features   | dense fields              | rankings, elevation summary    |
//!
//! All noise is evaluated at world coordinates
//! `(chunk_x * chunk_size + col, chunk_y * chunk_size + row)`.

use serde::{Deserialize, Serialize};
use tileworld_common::{ChunkCoord, TilePos, WorldError, WorldResult};
use tracing::{debug, info};

use crate::biome::{self, Elevations};
use crate::climate::ClimateThresholds;
use crate::features::{rank, ChunkFeatures, ElevationSummary};
use crate::grid::Grid;
use crate::hydrology::{find_coasts, trace_rivers, RiverParams, TerrainWindow};
use crate::noise::{LayerSeeds, NoiseLayer, NoiseSettings};
use crate::payload::{ChunkFields, ChunkPayload};

/// Largest chunk side the generator accepts.
pub const MAX_CHUNK_SIZE: u32 = 4096;

/// Tunable generation parameters.
///
/// Payloads are deterministic for a fixed seed and fixed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Heights below this are water.
    pub sea_level: f64,
    /// Width of the beach band above sea level.
    pub beach_band: f64,
    /// Heights at or above this are mountain.
    pub mountain_level: f64,
    /// Moisture at which mild temperate land becomes forest.
    pub forest_moisture: f64,
    /// Temperature drop per unit of height above sea level.
    pub lapse_rate: f64,
    /// Height noise.
    pub height_noise: NoiseSettings,
    /// Temperature noise.
    pub temperature_noise: NoiseSettings,
    /// Moisture noise.
    pub moisture_noise: NoiseSettings,
    /// Climate band thresholds.
    pub climate: ClimateThresholds,
    /// River sources and tracing. Also sets how far around each chunk
    /// terrain is sampled.
    pub rivers: RiverParams,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            sea_level: 0.42,
            beach_band: 0.02,
            mountain_level: 0.7,
            forest_moisture: 0.55,
            lapse_rate: 0.6,
            height_noise: NoiseSettings {
                octaves: 5,
                ..NoiseSettings::with_frequency(1.0 / 128.0)
            },
            temperature_noise: NoiseSettings {
                octaves: 3,
                ..NoiseSettings::with_frequency(1.0 / 256.0)
            },
            moisture_noise: NoiseSettings::with_frequency(1.0 / 160.0),
            climate: ClimateThresholds::default(),
            rivers: RiverParams::default(),
        }
    }
}

impl GenerationParams {
    fn elevations(&self) -> Elevations {
        Elevations {
            sea_level: self.sea_level,
            beach_band: self.beach_band,
            mountain_level: self.mountain_level,
            forest_moisture: self.forest_moisture,
        }
    }
}

/// Deterministic world generator for one seed.
#[derive(Debug, Clone)]
pub struct WorldGenerator {
    seed: u64,
    params: GenerationParams,
    height: NoiseLayer,
    temperature: NoiseLayer,
    moisture: NoiseLayer,
    river_seed: u64,
}

impl WorldGenerator {
    /// Creates a generator with default parameters.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self::with_params(seed, GenerationParams::default())
    }

    /// Creates a generator with custom parameters.
    #[must_use]
    pub fn with_params(seed: u64, params: GenerationParams) -> Self {
        let seeds = LayerSeeds::derive(seed);
        info!(
            "WorldGenerator initialized: seed={}, sea_level={}, mountain_level={}",
            seed, params.sea_level, params.mountain_level
        );
        Self {
            seed,
            height: NoiseLayer::new(seeds.height, params.height_noise.clone()),
            temperature: NoiseLayer::new(seeds.temperature, params.temperature_noise.clone()),
            moisture: NoiseLayer::new(seeds.moisture, params.moisture_noise.clone()),
            river_seed: seeds.rivers,
            params,
        }
    }

    /// World seed.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Generation parameters.
    #[must_use]
    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Height at a world tile, in `[0, 1]`.
    #[must_use]
    pub fn sample_height(&self, world_x: i64, world_y: i64) -> f64 {
        self.height.sample(world_x, world_y)
    }

    /// Temperature at a world tile, cooled with altitude above sea level.
    #[must_use]
    pub fn sample_temperature(&self, world_x: i64, world_y: i64) -> f64 {
        let height = self.sample_height(world_x, world_y);
        self.temperature_at(world_x, world_y, height)
    }

    /// Moisture at a world tile, in `[0, 1]`.
    #[must_use]
    pub fn sample_moisture(&self, world_x: i64, world_y: i64) -> f64 {
        self.moisture.sample(world_x, world_y)
    }

    fn temperature_at(&self, world_x: i64, world_y: i64, height: f64) -> f64 {
        let base = self.temperature.sample(world_x, world_y);
        let altitude = (height - self.params.sea_level).max(0.0);
        (base - altitude * self.params.lapse_rate).clamp(0.0, 1.0)
    }

    /// Generates one chunk.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidArgument`] if `chunk_size` is zero or
    /// larger than [`MAX_CHUNK_SIZE`].
    pub fn generate_chunk(
        &self,
        chunk_x: i32,
        chunk_y: i32,
        chunk_size: u32,
    ) -> WorldResult<ChunkPayload> {
        if chunk_size == 0 || chunk_size > MAX_CHUNK_SIZE {
            return Err(WorldError::InvalidArgument(format!(
                "chunk_size must be in 1..={MAX_CHUNK_SIZE}, got {chunk_size}"
            )));
        }

        let coord = ChunkCoord::new(chunk_x, chunk_y);
        let params = &self.params;
        let window = TerrainWindow::sample(coord, chunk_size, params.rivers.window_apron(), |x, y| {
            (self.sample_height(x, y), self.sample_moisture(x, y))
        });

        let world_of = |pos: TilePos| window.world_of_local(pos);
        let height = Grid::from_fn(chunk_size, |pos| {
            let (wx, wy) = world_of(pos);
            window.height_at(wx, wy).unwrap_or_default()
        });
        let moisture = Grid::from_fn(chunk_size, |pos| {
            let (wx, wy) = world_of(pos);
            self.sample_moisture(wx, wy)
        });
        let temperature = Grid::from_fn(chunk_size, |pos| {
            let (wx, wy) = world_of(pos);
            self.temperature_at(wx, wy, height[pos])
        });
        let climate = Grid::from_fn(chunk_size, |pos| {
            params.climate.classify(temperature[pos], moisture[pos])
        });

        let elevations = params.elevations();
        let biome = Grid::from_fn(chunk_size, |pos| {
            biome::classify(height[pos], moisture[pos], climate[pos], &elevations)
        });
        let tiles = biome.map(|b| b.tile_type());
        let is_water = tiles.map(|t| t.is_water());

        let rivers = trace_rivers(
            &window,
            params.sea_level,
            params.mountain_level,
            &params.rivers,
            self.river_seed,
        );
        let coasts = find_coasts(&window, params.sea_level);

        let features = ChunkFeatures {
            climate_bands: rank(climate.iter()),
            biome_distribution: rank(biome.iter()),
            elevation: ElevationSummary::from_heights(&height),
            rivers: rivers.segments,
            coasts,
        };

        debug!(
            "Generated chunk ({}, {}) size={}: {} river segments, {} coast tiles",
            chunk_x,
            chunk_y,
            chunk_size,
            features.rivers.len(),
            features.coasts.len()
        );

        Ok(ChunkPayload {
            chunk_x,
            chunk_y,
            chunk_size,
            seed: self.seed,
            tiles,
            fields: ChunkFields {
                height,
                temperature,
                moisture,
                climate,
                biome,
                is_river: rivers.is_river,
                is_water,
            },
            features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biome::TileType;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_invalid_size() {
        let gen = WorldGenerator::new(1);
        assert!(matches!(
            gen.generate_chunk(0, 0, 0),
            Err(WorldError::InvalidArgument(_))
        ));
        assert!(gen.generate_chunk(0, 0, MAX_CHUNK_SIZE + 1).is_err());
    }

    #[test]
    fn test_payload_shape() {
        let gen = WorldGenerator::new(12345);
        let payload = gen.generate_chunk(2, -3, 16).expect("generate chunk");
        assert_eq!(payload.chunk_x, 2);
        assert_eq!(payload.chunk_y, -3);
        assert_eq!(payload.chunk_size, 16);
        assert_eq!(payload.seed, 12345);
        assert_eq!(payload.tiles.rows().count(), 16);
        assert!(payload.tiles.rows().all(|r| r.len() == 16));
        assert_eq!(payload.fields.height.len(), 256);
        assert_eq!(payload.key().as_str(), "2,-3");
    }

    #[test]
    fn test_water_flag_matches_tiles() {
        let gen = WorldGenerator::new(99);
        for (cx, cy) in [(0, 0), (5, 5), (-7, 2)] {
            let payload = gen.generate_chunk(cx, cy, 32).expect("generate chunk");
            for (pos, tile) in payload.tiles.iter_with_pos() {
                assert_eq!(payload.fields.is_water[pos], *tile == TileType::Water);
                if payload.fields.is_river[pos] {
                    assert!(tile.is_land());
                    assert_ne!(*tile, TileType::Mountain);
                }
            }
        }
    }

    #[test]
    fn test_fields_sampled_in_world_space() {
        let gen = WorldGenerator::new(4242);
        let payload = gen.generate_chunk(-2, 3, 16).expect("generate chunk");
        for (pos, &h) in payload.fields.height.iter_with_pos() {
            let wx = -32 + i64::from(pos.x);
            let wy = 48 + i64::from(pos.y);
            assert_eq!(h.to_bits(), gen.sample_height(wx, wy).to_bits());
            assert_eq!(
                payload.fields.temperature[pos].to_bits(),
                gen.sample_temperature(wx, wy).to_bits()
            );
            assert_eq!(
                payload.fields.moisture[pos].to_bits(),
                gen.sample_moisture(wx, wy).to_bits()
            );
        }
    }

    #[test]
    fn test_rankings_sorted() {
        let gen = WorldGenerator::new(7);
        let payload = gen.generate_chunk(1, 1, 64).expect("generate chunk");
        let bands = &payload.features.climate_bands;
        assert!(!bands.is_empty());
        for pair in bands.windows(2) {
            assert!(
                pair[0].tiles > pair[1].tiles
                    || (pair[0].tiles == pair[1].tiles && pair[0].kind < pair[1].kind)
            );
        }
        let total: u32 = payload.features.biome_distribution.iter().map(|c| c.tiles).sum();
        assert_eq!(total as usize, payload.tile_count());

        let e = payload.features.elevation;
        assert!(e.min <= e.mean && e.mean <= e.max);
    }

    #[test]
    fn test_coasts_are_land_next_to_water() {
        let gen = WorldGenerator::new(2024);
        let payload = gen.generate_chunk(0, 0, 48).expect("generate chunk");
        for &pos in &payload.features.coasts {
            assert!(!payload.fields.is_water[pos]);
        }
        for pos in payload.tiles.iter_with_pos().map(|(p, _)| p) {
            if payload.fields.is_water[pos] || payload.features.coasts.contains(&pos) {
                continue;
            }
            let inside: Vec<TilePos> = [(0i64, -1i64), (1, 0), (0, 1), (-1, 0)]
                .iter()
                .filter_map(|&(dx, dy)| {
                    let x = u32::try_from(i64::from(pos.x) + dx).ok()?;
                    let y = u32::try_from(i64::from(pos.y) + dy).ok()?;
                    (x < 48 && y < 48).then(|| TilePos::new(x, y))
                })
                .collect();
            assert!(inside.iter().all(|&n| !payload.fields.is_water[n]));
        }
    }

    #[test]
    fn test_edge_coasts_agree_across_chunks() {
        let gen = WorldGenerator::new(31337);
        let size = 16;
        for cx in -3..3 {
            let left = gen.generate_chunk(cx, 0, size).expect("left chunk");
            let right = gen.generate_chunk(cx + 1, 0, size).expect("right chunk");
            for row in 0..size {
                let edge = TilePos::new(size - 1, row);
                let across = TilePos::new(0, row);
                if !left.fields.is_water[edge] && right.fields.is_water[across] {
                    assert!(left.features.coasts.contains(&edge));
                }
                if !right.fields.is_water[across] && left.fields.is_water[edge] {
                    assert!(right.features.coasts.contains(&across));
                }
            }
        }
    }

    fn river_generator(seed: u64) -> WorldGenerator {
        let params = GenerationParams {
            rivers: RiverParams {
                rarity: 4,
                source_height: 0.45,
                ..RiverParams::default()
            },
            ..GenerationParams::default()
        };
        WorldGenerator::with_params(seed, params)
    }

    /// The tile a river on `(wx, wy)` flows into next, if it is land.
    fn downstream(gen: &WorldGenerator, wx: i64, wy: i64) -> Option<(i64, i64)> {
        let h = gen.sample_height(wx, wy);
        let mut lowest: Option<((i64, i64), f64)> = None;
        for (dx, dy) in [(0, -1), (1, 0), (0, 1), (-1, 0)] {
            let nh = gen.sample_height(wx + dx, wy + dy);
            if lowest.map_or(true, |(_, best)| nh < best) {
                lowest = Some(((wx + dx, wy + dy), nh));
            }
        }
        lowest
            .filter(|&(_, nh)| nh < h && nh >= gen.params().sea_level)
            .map(|(tile, _)| tile)
    }

    #[test]
    fn test_river_tiles_stay_below_mountains() {
        let gen = river_generator(8);
        let payload = gen.generate_chunk(0, 0, 64).expect("generate chunk");
        for (pos, &river) in payload.fields.is_river.iter_with_pos() {
            if river {
                let h = payload.fields.height[pos];
                assert!(h >= gen.params().sea_level && h < gen.params().mountain_level);
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn test_rivers_continue_across_borders(
            seed in any::<u64>(),
            cx in -300i32..300,
            cy in -300i32..300,
        ) {
            let gen = river_generator(seed);
            let size = 16u32;
            let last = size - 1;
            let left = gen.generate_chunk(cx, cy, size).expect("left chunk");
            let right = gen.generate_chunk(cx + 1, cy, size).expect("right chunk");
            let border_x = i64::from(cx + 1) * i64::from(size);

            for row in 0..size {
                let wy = i64::from(cy) * i64::from(size) + i64::from(row);
                let west = TilePos::new(last, row);
                let east = TilePos::new(0, row);
                if left.fields.is_river[west]
                    && downstream(&gen, border_x - 1, wy) == Some((border_x, wy))
                {
                    prop_assert!(
                        right.fields.is_river[east],
                        "river stops at {west:?} flowing east"
                    );
                }
                if right.fields.is_river[east]
                    && downstream(&gen, border_x, wy) == Some((border_x - 1, wy))
                {
                    prop_assert!(
                        left.fields.is_river[west],
                        "river stops at {east:?} flowing west"
                    );
                }
            }
        }

        #[test]
        fn test_river_flags_independent_of_chunk_size(
            seed in any::<u64>(),
            cx in -300i32..300,
            cy in -300i32..300,
        ) {
            let gen = river_generator(seed);
            let whole = gen.generate_chunk(cx, cy, 32).expect("whole chunk");
            for (qx, qy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let quarter = gen
                    .generate_chunk(2 * cx + qx, 2 * cy + qy, 16)
                    .expect("quarter chunk");
                for (pos, &river) in quarter.fields.is_river.iter_with_pos() {
                    let outer = TilePos::new(pos.x + 16 * qx as u32, pos.y + 16 * qy as u32);
                    prop_assert_eq!(river, whole.fields.is_river[outer]);
                }
            }
        }

        #[test]
        fn test_generation_deterministic(
            seed in any::<u64>(),
            cx in -1000i32..1000,
            cy in -1000i32..1000,
            size in 8u32..40,
        ) {
            let a = WorldGenerator::new(seed).generate_chunk(cx, cy, size).expect("first");
            let b = WorldGenerator::new(seed).generate_chunk(cx, cy, size).expect("second");
            prop_assert_eq!(&a, &b);
            let ja = serde_json::to_string(&a).expect("serialize first");
            let jb = serde_json::to_string(&b).expect("serialize second");
            prop_assert_eq!(ja, jb);
        }

        #[test]
        fn test_shared_edges_continuous(
            seed in any::<u64>(),
            cx in -500i32..500,
            cy in -500i32..500,
            size in 8u32..24,
        ) {
            let gen = WorldGenerator::new(seed);
            let here = gen.generate_chunk(cx, cy, size).expect("chunk");
            let east = gen.generate_chunk(cx + 1, cy, size).expect("east chunk");
            let south = gen.generate_chunk(cx, cy + 1, size).expect("south chunk");
            let last = size - 1;

            for i in 0..size {
                // Tiles on either side of the shared edge match direct world sampling.
                let wx = i64::from(cx + 1) * i64::from(size);
                let wy = i64::from(cy) * i64::from(size) + i64::from(i);
                prop_assert_eq!(
                    here.fields.height[TilePos::new(last, i)].to_bits(),
                    gen.sample_height(wx - 1, wy).to_bits()
                );
                prop_assert_eq!(
                    east.fields.height[TilePos::new(0, i)].to_bits(),
                    gen.sample_height(wx, wy).to_bits()
                );

                let wx = i64::from(cx) * i64::from(size) + i64::from(i);
                let wy = i64::from(cy + 1) * i64::from(size);
                prop_assert_eq!(
                    here.fields.moisture[TilePos::new(i, last)].to_bits(),
                    gen.sample_moisture(wx, wy - 1).to_bits()
                );
                prop_assert_eq!(
                    south.fields.temperature[TilePos::new(i, 0)].to_bits(),
                    gen.sample_temperature(wx, wy).to_bits()
                );
            }
        }
    }
}
