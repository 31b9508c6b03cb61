//! Chunk request parsing and detail-level responses.
//!
//! This is the contract the HTTP layer serves: a query string selects a
//! chunk, a seed and a detail level, and the response is a JSON object
//! whose size grows with the detail level.

use serde::{Deserialize, Serialize};
use tileworld_common::{ChunkKey, WorldResult};

use crate::biome::{Biome, TileType};
use crate::climate::ClimateBand;
use crate::features::{ChunkFeatures, ElevationSummary};
use crate::generator::WorldGenerator;
use crate::grid::Grid;
use crate::payload::{ChunkFields, ChunkPayload};

/// Seed used when a request does not name one.
pub const DEFAULT_SEED: i64 = 12345;
/// Chunk size used when a request does not name one.
pub const DEFAULT_CHUNK_SIZE: u32 = 32;
/// Smallest chunk size a request may ask for.
pub const MIN_REQUEST_CHUNK_SIZE: u32 = 8;
/// Largest chunk size a request may ask for.
pub const MAX_REQUEST_CHUNK_SIZE: u32 = 128;
/// `Cache-Control` value for chunk responses. Chunks never change for fixed inputs.
pub const CACHE_CONTROL: &str = "public, max-age=3600";

/// How much of a payload a response carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    /// Tiles and summary metadata.
    Minimal,
    /// Adds the biome grid and feature summaries.
    Standard,
    /// Adds every dense field layer.
    #[default]
    Full,
}

impl DetailLevel {
    /// Parses a detail level, case-insensitively. Unknown values are `Full`.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "minimal" => Self::Minimal,
            "standard" => Self::Standard,
            _ => Self::Full,
        }
    }
}

/// A parsed chunk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Chunk X coordinate.
    pub chunk_x: i32,
    /// Chunk Y coordinate.
    pub chunk_y: i32,
    /// Tiles per side, clamped to the request range.
    pub chunk_size: u32,
    /// World seed, exactly as requested.
    pub seed: i64,
    /// Response detail.
    pub detail: DetailLevel,
}

impl Default for ChunkRequest {
    fn default() -> Self {
        Self {
            chunk_x: 0,
            chunk_y: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            seed: DEFAULT_SEED,
            detail: DetailLevel::Full,
        }
    }
}

#[derive(Default)]
struct RawQuery<'a> {
    chunk_x: Option<&'a str>,
    x: Option<&'a str>,
    chunk_y: Option<&'a str>,
    y: Option<&'a str>,
    chunk_size: Option<&'a str>,
    size: Option<&'a str>,
    seed: Option<&'a str>,
    detail: Option<&'a str>,
}

impl ChunkRequest {
    /// Builds a request from query pairs.
    ///
    /// `chunkX`/`x`, `chunkY`/`y` and `chunkSize`/`size` are aliases; the
    /// long name wins when both appear. Missing or unparsable values take
    /// their defaults, the size is clamped and unknown details mean `full`.
    pub fn from_query<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut raw = RawQuery::default();
        for (key, value) in pairs {
            let slot = match key {
                "chunkX" => &mut raw.chunk_x,
                "x" => &mut raw.x,
                "chunkY" => &mut raw.chunk_y,
                "y" => &mut raw.y,
                "chunkSize" => &mut raw.chunk_size,
                "size" => &mut raw.size,
                "seed" => &mut raw.seed,
                "detail" => &mut raw.detail,
                _ => continue,
            };
            *slot = Some(value);
        }

        let defaults = Self::default();
        let chunk_size = raw
            .chunk_size
            .or(raw.size)
            .and_then(parse_int)
            .map_or(defaults.chunk_size, |size| {
                size.clamp(
                    i64::from(MIN_REQUEST_CHUNK_SIZE),
                    i64::from(MAX_REQUEST_CHUNK_SIZE),
                ) as u32
            });

        Self {
            chunk_x: raw
                .chunk_x
                .or(raw.x)
                .and_then(parse_coord)
                .unwrap_or(defaults.chunk_x),
            chunk_y: raw
                .chunk_y
                .or(raw.y)
                .and_then(parse_coord)
                .unwrap_or(defaults.chunk_y),
            chunk_size,
            seed: raw.seed.and_then(parse_int).unwrap_or(defaults.seed),
            detail: raw
                .detail
                .map_or(defaults.detail, DetailLevel::parse_lenient),
        }
    }

    /// Builds a request from a raw query string such as `x=1&y=-2&detail=minimal`.
    #[must_use]
    pub fn from_query_str(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_query(
            query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| pair.split_once('=').unwrap_or((pair, ""))),
        )
    }

    /// Canonical key of the requested chunk.
    #[must_use]
    pub fn key(&self) -> ChunkKey {
        ChunkKey::new(self.chunk_x, self.chunk_y)
    }

    /// Generates the requested chunk.
    ///
    /// # Errors
    ///
    /// Propagates generator argument errors.
    pub fn generate(&self) -> WorldResult<ChunkPayload> {
        WorldGenerator::new(self.world_seed()).generate_chunk(
            self.chunk_x,
            self.chunk_y,
            self.chunk_size,
        )
    }

    /// Generator seed: the requested seed's two's-complement bits.
    #[must_use]
    pub const fn world_seed(&self) -> u64 {
        self.seed as u64
    }
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse().ok()
}

fn parse_coord(value: &str) -> Option<i32> {
    parse_int(value).and_then(|v| i32::try_from(v).ok())
}

/// Summary carried by every response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Most common climate band.
    pub dominant_climate: Option<ClimateBand>,
    /// Most common biome.
    pub dominant_biome: Option<Biome>,
    /// Number of river segments.
    pub river_count: usize,
    /// Number of coastline tiles.
    pub coastline_tiles: usize,
    /// Height statistics.
    pub elevation: ElevationSummary,
}

impl ChunkMetadata {
    /// Summarises a payload.
    #[must_use]
    pub fn from_features(features: &ChunkFeatures) -> Self {
        Self {
            dominant_climate: features.dominant_climate(),
            dominant_biome: features.dominant_biome(),
            river_count: features.rivers.len(),
            coastline_tiles: features.coasts.len(),
            elevation: features.elevation,
        }
    }
}

/// A detail-level view of a payload, ready for JSON serialization.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkResponse<'a> {
    /// Chunk X coordinate.
    pub chunk_x: i32,
    /// Chunk Y coordinate.
    pub chunk_y: i32,
    /// Tiles per side.
    pub chunk_size: u32,
    /// World seed as a signed integer, matching the request.
    pub seed: i64,
    /// Detail level of this response.
    pub detail: DetailLevel,
    /// Tile types, `[row][col]`.
    pub tiles: &'a Grid<TileType>,
    /// Summary metadata.
    pub metadata: ChunkMetadata,
    /// Biome grid (standard and full).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biomes: Option<&'a Grid<Biome>>,
    /// Feature summaries (standard and full).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<&'a ChunkFeatures>,
    /// Dense field layers (full only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<&'a ChunkFields>,
}

impl<'a> ChunkResponse<'a> {
    /// Builds the response view of a payload at the given detail level.
    #[must_use]
    pub fn from_payload(payload: &'a ChunkPayload, detail: DetailLevel) -> Self {
        let standard = detail >= DetailLevel::Standard;
        Self {
            chunk_x: payload.chunk_x,
            chunk_y: payload.chunk_y,
            chunk_size: payload.chunk_size,
            seed: payload.seed as i64,
            detail,
            tiles: &payload.tiles,
            metadata: ChunkMetadata::from_features(&payload.features),
            biomes: standard.then_some(&payload.fields.biome),
            features: standard.then_some(&payload.features),
            fields: (detail == DetailLevel::Full).then_some(&payload.fields),
        }
    }

    /// Serializes the response as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which only happens for non-finite floats.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = ChunkRequest::from_query_str("");
        assert_eq!(req, ChunkRequest::default());
        assert_eq!(req.seed, 12345);
        assert_eq!(req.chunk_size, 32);
        assert_eq!(req.detail, DetailLevel::Full);
    }

    #[test]
    fn test_aliases_and_precedence() {
        let req = ChunkRequest::from_query_str("?x=3&y=-4&size=16");
        assert_eq!((req.chunk_x, req.chunk_y, req.chunk_size), (3, -4, 16));

        let req = ChunkRequest::from_query_str("x=3&chunkX=7&chunkY=1&y=9");
        assert_eq!((req.chunk_x, req.chunk_y), (7, 1));
    }

    #[test]
    fn test_size_clamped() {
        assert_eq!(ChunkRequest::from_query_str("size=2").chunk_size, 8);
        assert_eq!(ChunkRequest::from_query_str("chunkSize=4000").chunk_size, 128);
        assert_eq!(ChunkRequest::from_query_str("size=-5").chunk_size, 8);
        assert_eq!(ChunkRequest::from_query_str("size=abc").chunk_size, 32);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let req = ChunkRequest::from_query_str("x=abc&seed=&detail=everything");
        assert_eq!(req.chunk_x, 0);
        assert_eq!(req.seed, DEFAULT_SEED);
        assert_eq!(req.detail, DetailLevel::Full);

        let req = ChunkRequest::from_query_str("x=99999999999");
        assert_eq!(req.chunk_x, 0);
    }

    #[test]
    fn test_seed_parsing() {
        assert_eq!(ChunkRequest::from_query_str("seed=42").seed, 42);
        assert_eq!(ChunkRequest::from_query_str("seed=18446744073709551615").seed, DEFAULT_SEED);
    }

    #[test]
    fn test_negative_seed_echoed() {
        let req = ChunkRequest::from_query_str("seed=-1&size=8&detail=minimal");
        assert_eq!(req.seed, -1);
        assert_eq!(req.world_seed(), u64::MAX);

        let payload = req.generate().expect("generate chunk");
        assert_eq!(payload.seed, u64::MAX);
        let json: serde_json::Value = serde_json::to_value(ChunkResponse::from_payload(
            &payload,
            req.detail,
        ))
        .expect("response json");
        assert_eq!(json["seed"], -1);
    }

    #[test]
    fn test_cache_control_value() {
        assert_eq!(CACHE_CONTROL, "public, max-age=3600");
    }

    #[test]
    fn test_detail_parsing() {
        assert_eq!(DetailLevel::parse_lenient("MINIMAL"), DetailLevel::Minimal);
        assert_eq!(DetailLevel::parse_lenient("standard"), DetailLevel::Standard);
        assert_eq!(DetailLevel::parse_lenient(""), DetailLevel::Full);
    }

    #[test]
    fn test_response_detail_levels() {
        let req = ChunkRequest::from_query_str("x=1&y=2&size=8&seed=5");
        let payload = req.generate().expect("generate chunk");

        let minimal: serde_json::Value = serde_json::from_str(
            &ChunkResponse::from_payload(&payload, DetailLevel::Minimal)
                .to_json()
                .expect("minimal json"),
        )
        .expect("parse minimal");
        assert_eq!(minimal["chunkX"], 1);
        assert_eq!(minimal["chunkY"], 2);
        assert_eq!(minimal["chunkSize"], 8);
        assert_eq!(minimal["seed"], 5);
        assert_eq!(minimal["tiles"].as_array().map(Vec::len), Some(8));
        assert!(minimal["metadata"]["riverCount"].is_u64());
        assert!(minimal.get("biomes").is_none());
        assert!(minimal.get("fields").is_none());

        let standard = serde_json::to_value(ChunkResponse::from_payload(
            &payload,
            DetailLevel::Standard,
        ))
        .expect("standard json");
        assert!(standard.get("biomes").is_some());
        assert!(standard["features"].get("biomeDistribution").is_some());
        assert!(standard.get("fields").is_none());

        let full = serde_json::to_value(ChunkResponse::from_payload(&payload, DetailLevel::Full))
            .expect("full json");
        for layer in ["height", "temperature", "moisture", "climate", "isRiver", "isWater"] {
            assert!(full["fields"].get(layer).is_some(), "missing {layer}");
        }
    }

    #[test]
    fn test_response_metadata_matches_features() {
        let payload = WorldGenerator::new(77).generate_chunk(0, 0, 32).expect("generate");
        let meta = ChunkMetadata::from_features(&payload.features);
        assert_eq!(meta.river_count, payload.features.rivers.len());
        assert_eq!(meta.coastline_tiles, payload.features.coasts.len());
        assert_eq!(meta.dominant_biome, payload.features.dominant_biome());
    }
}
