//! Command-line argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tileworld_streaming::StreamingConfig;
use tileworld_worldgen::{
    ChunkRequest, DetailLevel, MAX_REQUEST_CHUNK_SIZE, MIN_REQUEST_CHUNK_SIZE,
};

/// Tileworld command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "tileworld", version, about = "Deterministic tile world generator")]
pub struct CliArgs {
    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate one chunk and print it as JSON.
    Chunk(ChunkArgs),
    /// Walk a viewer through the world via the streaming manager.
    Walk(WalkArgs),
}

/// Arguments of `tileworld chunk`.
#[derive(Args, Debug, Default)]
pub struct ChunkArgs {
    /// Raw query string, e.g. `x=1&y=2&detail=minimal`.
    #[arg(long)]
    pub query: Option<String>,

    /// Chunk X coordinate.
    #[arg(long, allow_hyphen_values = true)]
    pub x: Option<i32>,

    /// Chunk Y coordinate.
    #[arg(long, allow_hyphen_values = true)]
    pub y: Option<i32>,

    /// Tiles per side (clamped to 8..=128).
    #[arg(long)]
    pub size: Option<u32>,

    /// World seed.
    #[arg(long, allow_hyphen_values = true)]
    pub seed: Option<i64>,

    /// Detail level: minimal, standard or full.
    #[arg(long)]
    pub detail: Option<String>,

    /// Print the Cache-Control header before the body.
    #[arg(long)]
    pub headers: bool,
}

impl ChunkArgs {
    /// Builds the request: the query string first, then explicit flags.
    #[must_use]
    pub fn to_request(&self) -> ChunkRequest {
        let mut request = ChunkRequest::from_query_str(self.query.as_deref().unwrap_or(""));
        if let Some(x) = self.x {
            request.chunk_x = x;
        }
        if let Some(y) = self.y {
            request.chunk_y = y;
        }
        if let Some(size) = self.size {
            request.chunk_size = size.clamp(MIN_REQUEST_CHUNK_SIZE, MAX_REQUEST_CHUNK_SIZE);
        }
        if let Some(seed) = self.seed {
            request.seed = seed;
        }
        if let Some(ref detail) = self.detail {
            request.detail = DetailLevel::parse_lenient(detail);
        }
        request
    }
}

/// Arguments of `tileworld walk`.
#[derive(Args, Debug, Default)]
pub struct WalkArgs {
    /// Streaming config file (TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the effective config to this path.
    #[arg(long)]
    pub save_config: Option<PathBuf>,

    /// World seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Tiles per chunk side.
    #[arg(long)]
    pub chunk_size: Option<u32>,

    /// Maximum resident chunks.
    #[arg(long)]
    pub max_loaded: Option<usize>,

    /// Idle cleanup period in milliseconds (0 disables cleanup).
    #[arg(long)]
    pub cleanup_ms: Option<u64>,

    /// View radius in chunks around the viewer.
    #[arg(long, default_value_t = 1)]
    pub radius: u32,

    /// Number of steps the viewer takes.
    #[arg(long, default_value_t = 8)]
    pub steps: u32,

    /// Direction of travel, in chunks per step.
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    pub dx: i32,

    /// Direction of travel, in chunks per step.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub dy: i32,
}

impl WalkArgs {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_overrides(&self, config: &mut StreamingConfig) {
        if let Some(seed) = self.seed {
            config.world_seed = seed;
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size;
        }
        if let Some(max) = self.max_loaded {
            config.max_loaded_chunks = max;
        }
        if let Some(ms) = self.cleanup_ms {
            config.cleanup_interval_ms = ms;
        }
    }
}
