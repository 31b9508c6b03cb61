//! Climate classification from temperature and moisture.

use serde::{Deserialize, Serialize};

/// Temperature band of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureBand {
    /// Below the cold threshold.
    Cold,
    /// Between the thresholds.
    Mild,
    /// Above the hot threshold.
    Hot,
}

/// Moisture band of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoistureBand {
    /// Below the arid threshold.
    Arid,
    /// Between the thresholds.
    Temperate,
    /// Above the wet threshold.
    Wet,
}

/// Fixed thresholds splitting `[0, 1]` temperature and moisture into bands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateThresholds {
    /// Temperatures below this are cold.
    pub cold_below: f64,
    /// Temperatures at or above this are hot.
    pub hot_from: f64,
    /// Moisture below this is arid.
    pub arid_below: f64,
    /// Moisture at or above this is wet.
    pub wet_from: f64,
}

impl Default for ClimateThresholds {
    fn default() -> Self {
        Self {
            cold_below: 0.38,
            hot_from: 0.62,
            arid_below: 0.38,
            wet_from: 0.62,
        }
    }
}

impl ClimateThresholds {
    /// Band of a temperature value.
    #[must_use]
    pub fn temperature_band(&self, temperature: f64) -> TemperatureBand {
        if temperature < self.cold_below {
            TemperatureBand::Cold
        } else if temperature < self.hot_from {
            TemperatureBand::Mild
        } else {
            TemperatureBand::Hot
        }
    }

    /// Band of a moisture value.
    #[must_use]
    pub fn moisture_band(&self, moisture: f64) -> MoistureBand {
        if moisture < self.arid_below {
            MoistureBand::Arid
        } else if moisture < self.wet_from {
            MoistureBand::Temperate
        } else {
            MoistureBand::Wet
        }
    }

    /// Classifies a (temperature, moisture) pair.
    #[must_use]
    pub fn classify(&self, temperature: f64, moisture: f64) -> ClimateBand {
        ClimateBand::from_bands(
            self.temperature_band(temperature),
            self.moisture_band(moisture),
        )
    }
}

/// Climate classification: temperature band crossed with moisture band.
///
/// Declaration order is the ordinal used to break coverage ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClimateBand {
    /// Cold and arid.
    ColdArid,
    /// Cold and temperate.
    ColdTemperate,
    /// Cold and wet.
    ColdWet,
    /// Mild and arid.
    MildArid,
    /// Mild and temperate.
    MildTemperate,
    /// Mild and wet.
    MildWet,
    /// Hot and arid.
    HotArid,
    /// Hot and temperate.
    HotTemperate,
    /// Hot and wet.
    HotWet,
}

impl ClimateBand {
    /// All bands in ordinal order.
    pub const ALL: [Self; 9] = [
        Self::ColdArid,
        Self::ColdTemperate,
        Self::ColdWet,
        Self::MildArid,
        Self::MildTemperate,
        Self::MildWet,
        Self::HotArid,
        Self::HotTemperate,
        Self::HotWet,
    ];

    /// Combines a temperature band and a moisture band.
    #[must_use]
    pub const fn from_bands(temperature: TemperatureBand, moisture: MoistureBand) -> Self {
        match (temperature, moisture) {
            (TemperatureBand::Cold, MoistureBand::Arid) => Self::ColdArid,
            (TemperatureBand::Cold, MoistureBand::Temperate) => Self::ColdTemperate,
            (TemperatureBand::Cold, MoistureBand::Wet) => Self::ColdWet,
            (TemperatureBand::Mild, MoistureBand::Arid) => Self::MildArid,
            (TemperatureBand::Mild, MoistureBand::Temperate) => Self::MildTemperate,
            (TemperatureBand::Mild, MoistureBand::Wet) => Self::MildWet,
            (TemperatureBand::Hot, MoistureBand::Arid) => Self::HotArid,
            (TemperatureBand::Hot, MoistureBand::Temperate) => Self::HotTemperate,
            (TemperatureBand::Hot, MoistureBand::Wet) => Self::HotWet,
        }
    }

    /// Temperature component.
    #[must_use]
    pub const fn temperature(self) -> TemperatureBand {
        match self {
            Self::ColdArid | Self::ColdTemperate | Self::ColdWet => TemperatureBand::Cold,
            Self::MildArid | Self::MildTemperate | Self::MildWet => TemperatureBand::Mild,
            Self::HotArid | Self::HotTemperate | Self::HotWet => TemperatureBand::Hot,
        }
    }

    /// Moisture component.
    #[must_use]
    pub const fn moisture(self) -> MoistureBand {
        match self {
            Self::ColdArid | Self::MildArid | Self::HotArid => MoistureBand::Arid,
            Self::ColdTemperate | Self::MildTemperate | Self::HotTemperate => {
                MoistureBand::Temperate
            }
            Self::ColdWet | Self::MildWet | Self::HotWet => MoistureBand::Wet,
        }
    }

    /// Position in [`ClimateBand::ALL`].
    #[must_use]
    pub const fn ordinal(self) -> usize {
        self as usize
    }
}
