//! Biome and tile-type classification.
//!
//! Biomes are chosen from the climate band and the terrain height; every
//! biome maps onto exactly one tile type.

use serde::{Deserialize, Serialize};

use crate::climate::{ClimateBand, MoistureBand, TemperatureBand};

/// Tile-type label of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileType {
    /// Open land.
    Grass,
    /// Sea water below sea level.
    Water,
    /// Terrain above the mountain threshold.
    Mountain,
    /// Wooded land.
    Forest,
    /// Beaches and deserts.
    Sand,
}

impl TileType {
    /// Whether the tile is water.
    #[must_use]
    pub const fn is_water(self) -> bool {
        matches!(self, Self::Water)
    }

    /// Whether the tile is land.
    #[must_use]
    pub const fn is_land(self) -> bool {
        !self.is_water()
    }
}

/// Biome identifiers.
///
/// Declaration order is the ordinal used to break coverage ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Biome {
    /// Open water below sea level.
    Ocean,
    /// Narrow band of land just above sea level.
    Beach,
    /// Hot, arid lowland.
    Desert,
    /// Hot, temperate grassland.
    Savanna,
    /// Mild open land.
    Grassland,
    /// Cold, arid land.
    Tundra,
    /// Mild, moist woodland.
    Forest,
    /// Cold woodland.
    Taiga,
    /// Hot, wet woodland.
    Rainforest,
    /// High terrain.
    Mountain,
    /// High, cold terrain.
    SnowPeak,
}

impl Biome {
    /// All biomes in ordinal order.
    pub const ALL: [Self; 11] = [
        Self::Ocean,
        Self::Beach,
        Self::Desert,
        Self::Savanna,
        Self::Grassland,
        Self::Tundra,
        Self::Forest,
        Self::Taiga,
        Self::Rainforest,
        Self::Mountain,
        Self::SnowPeak,
    ];

    /// Tile type this biome renders as.
    #[must_use]
    pub const fn tile_type(self) -> TileType {
        match self {
            Self::Ocean => TileType::Water,
            Self::Beach | Self::Desert => TileType::Sand,
            Self::Savanna | Self::Grassland | Self::Tundra => TileType::Grass,
            Self::Forest | Self::Taiga | Self::Rainforest => TileType::Forest,
            Self::Mountain | Self::SnowPeak => TileType::Mountain,
        }
    }

    /// Position in [`Biome::ALL`].
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}

/// Height thresholds used by biome classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Elevations {
    /// Heights below this are water.
    pub sea_level: f64,
    /// Heights below `sea_level + beach_band` are beach.
    pub beach_band: f64,
    /// Heights at or above this are mountain.
    pub mountain_level: f64,
    /// Mild temperate tiles at or above this moisture are forest.
    pub forest_moisture: f64,
}

/// Classifies the biome of a tile.
#[must_use]
pub fn classify(height: f64, moisture: f64, climate: ClimateBand, levels: &Elevations) -> Biome {
    if height < levels.sea_level {
        return Biome::Ocean;
    }
    if height >= levels.mountain_level {
        return if climate.temperature() == TemperatureBand::Cold {
            Biome::SnowPeak
        } else {
            Biome::Mountain
        };
    }
    if height < levels.sea_level + levels.beach_band {
        return Biome::Beach;
    }

    match (climate.temperature(), climate.moisture()) {
        (TemperatureBand::Hot, MoistureBand::Arid) => Biome::Desert,
        (TemperatureBand::Mild, MoistureBand::Arid) => Biome::Grassland,
        (TemperatureBand::Cold, MoistureBand::Arid) => Biome::Tundra,
        (TemperatureBand::Hot, MoistureBand::Temperate) => Biome::Savanna,
        (TemperatureBand::Mild, MoistureBand::Temperate) => {
            if moisture >= levels.forest_moisture {
                Biome::Forest
            } else {
                Biome::Grassland
            }
        }
        (TemperatureBand::Hot, MoistureBand::Wet) => Biome::Rainforest,
        (TemperatureBand::Mild, MoistureBand::Wet) => Biome::Forest,
        (TemperatureBand::Cold, MoistureBand::Temperate | MoistureBand::Wet) => Biome::Taiga,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> Elevations {
        Elevations {
            sea_level: 0.42,
            beach_band: 0.02,
            mountain_level: 0.7,
            forest_moisture: 0.5,
        }
    }

    #[test]
    fn test_water_below_sea_level() {
        let biome = classify(0.1, 0.9, ClimateBand::HotWet, &levels());
        assert_eq!(biome, Biome::Ocean);
        assert_eq!(biome.tile_type(), TileType::Water);
    }

    #[test]
    fn test_mountain_above_threshold() {
        assert_eq!(
            classify(0.8, 0.5, ClimateBand::MildTemperate, &levels()),
            Biome::Mountain
        );
        assert_eq!(
            classify(0.8, 0.5, ClimateBand::ColdTemperate, &levels()),
            Biome::SnowPeak
        );
        assert_eq!(Biome::SnowPeak.tile_type(), TileType::Mountain);
    }

    #[test]
    fn test_beach_band() {
        assert_eq!(classify(0.43, 0.5, ClimateBand::MildWet, &levels()), Biome::Beach);
        assert_eq!(classify(0.45, 0.7, ClimateBand::MildWet, &levels()), Biome::Forest);
    }

    #[test]
    fn test_forest_or_grass_by_moisture() {
        let l = levels();
        assert_eq!(classify(0.5, 0.55, ClimateBand::MildTemperate, &l), Biome::Forest);
        assert_eq!(classify(0.5, 0.45, ClimateBand::MildTemperate, &l), Biome::Grassland);
        assert_eq!(classify(0.5, 0.1, ClimateBand::HotArid, &l), Biome::Desert);
    }

    #[test]
    fn test_only_ocean_is_water() {
        for biome in Biome::ALL {
            assert_eq!(biome.tile_type().is_water(), biome == Biome::Ocean, "{biome:?}");
        }
    }

    #[test]
    fn test_tile_serde_names() {
        let json = serde_json::to_string(&[TileType::Grass, TileType::Water]).expect("serialize");
        assert_eq!(json, "[\"grass\",\"water\"]");
        let json = serde_json::to_string(&Biome::SnowPeak).expect("serialize");
        assert_eq!(json, "\"snow_peak\"");
    }
}
