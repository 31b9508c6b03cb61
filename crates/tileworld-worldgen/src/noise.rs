//! Seeded coherent noise layers.
//!
//! Every layer is fractal Brownian motion over Perlin noise, sampled in world
//! space so that neighbouring chunks agree exactly on shared edges.

use ::noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Shape of one fractal noise layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Frequency of the first octave, in cycles per tile.
    pub frequency: f64,
    /// Number of octaves to composite.
    pub octaves: u32,
    /// Amplitude falloff per octave.
    pub persistence: f64,
    /// Frequency growth per octave.
    pub lacunarity: f64,
    /// Stretch applied around 0.5 after normalisation.
    pub contrast: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            frequency: 1.0 / 96.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            contrast: 1.6,
        }
    }
}

impl NoiseSettings {
    /// Settings with a custom base frequency.
    #[must_use]
    pub fn with_frequency(frequency: f64) -> Self {
        Self {
            frequency,
            ..Self::default()
        }
    }
}

/// A single seeded noise field returning values in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct NoiseLayer {
    perlin: Perlin,
    settings: NoiseSettings,
    /// Sum of octave amplitudes, used to normalise the fBm output.
    max_amplitude: f64,
}

impl NoiseLayer {
    /// Creates a layer from a 32-bit seed.
    #[must_use]
    pub fn new(seed: u32, settings: NoiseSettings) -> Self {
        let octaves = settings.octaves.max(1);
        let mut max_amplitude = 0.0;
        let mut amplitude = 1.0;
        for _ in 0..octaves {
            max_amplitude += amplitude;
            amplitude *= settings.persistence;
        }

        Self {
            perlin: Perlin::new(seed),
            settings: NoiseSettings { octaves, ..settings },
            max_amplitude,
        }
    }

    /// Returns the layer settings.
    #[must_use]
    pub fn settings(&self) -> &NoiseSettings {
        &self.settings
    }

    /// Raw fBm value in roughly `[-1, 1]`.
    #[must_use]
    pub fn fbm(&self, x: f64, y: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.settings.frequency;

        for _ in 0..self.settings.octaves {
            total += self.perlin.get([x * frequency, y * frequency]) * amplitude;
            amplitude *= self.settings.persistence;
            frequency *= self.settings.lacunarity;
        }

        total / self.max_amplitude
    }

    /// Samples the layer at a world tile, normalised to `[0, 1]`.
    #[must_use]
    pub fn sample(&self, world_x: i64, world_y: i64) -> f64 {
        let raw = self.fbm(world_x as f64, world_y as f64);
        (0.5 + 0.5 * raw * self.settings.contrast).clamp(0.0, 1.0)
    }
}

/// Derives the independent per-layer seeds of a world from its seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerSeeds {
    /// Seed of the height field.
    pub height: u32,
    /// Seed of the temperature field.
    pub temperature: u32,
    /// Seed of the moisture field.
    pub moisture: u32,
    /// Seed of the river source hash.
    pub rivers: u64,
}

impl LayerSeeds {
    /// Draws the layer seeds from a generator seeded with the world seed.
    #[must_use]
    pub fn derive(world_seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(world_seed);
        Self {
            height: rng.u32(..),
            temperature: rng.u32(..),
            moisture: rng.u32(..),
            rivers: rng.u64(..),
        }
    }
}

/// Stateless 64-bit hash of a world tile (splitmix64 finaliser).
#[must_use]
pub fn tile_hash(seed: u64, world_x: i64, world_y: i64) -> u64 {
    let mut z = seed
        ^ (world_x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ (world_y as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
