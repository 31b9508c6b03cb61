//! # Tileworld Worldgen
//!
//! Deterministic, infinite tile-world generation.
//!
//! This crate handles:
//! - Seeded fractal noise for height, temperature and moisture
//! - Climate bands and biome classification
//! - Downhill river tracing and coastline detection
//! - Chunk feature summaries (rankings, elevation statistics)
//! - The chunk request/response contract served over HTTP
//!
//! Every chunk is a pure function of the world seed, the chunk coordinate
//! and the chunk size; noise is sampled in world space so neighbouring
//! chunks line up.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod biome;
pub mod climate;
pub mod features;
pub mod generator;
pub mod grid;
pub mod hydrology;
pub mod noise;
pub mod payload;
pub mod request;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::biome::{Biome, TileType};
    pub use crate::climate::{ClimateBand, ClimateThresholds, MoistureBand, TemperatureBand};
    pub use crate::features::{ChunkFeatures, Coverage, ElevationSummary};
    pub use crate::generator::{GenerationParams, WorldGenerator, MAX_CHUNK_SIZE};
    pub use crate::grid::Grid;
    pub use crate::hydrology::{RiverParams, RiverSegment};
    pub use crate::noise::NoiseSettings;
    pub use crate::payload::{ChunkFields, ChunkPayload};
    pub use crate::request::{
        ChunkMetadata, ChunkRequest, ChunkResponse, DetailLevel, CACHE_CONTROL,
        DEFAULT_CHUNK_SIZE, DEFAULT_SEED, MAX_REQUEST_CHUNK_SIZE, MIN_REQUEST_CHUNK_SIZE,
    };
}

pub use prelude::*;
