//! Streaming configuration.
//!
//! Loaded from TOML; a missing or broken file falls back to defaults so a
//! viewer can always start.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{StreamingError, StreamingResult};

/// Default config file name.
pub const CONFIG_FILE: &str = "tileworld.toml";

/// Chunk streaming configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// World seed passed to the generator
    pub world_seed: u64,
    /// Tiles per chunk side
    pub chunk_size: u32,
    /// Maximum resident chunks
    pub max_loaded_chunks: usize,
    /// Idle cleanup period in milliseconds (0 disables cleanup)
    pub cleanup_interval_ms: u64,
    /// Cleanup ticks an untouched chunk survives
    pub idle_ticks: u32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            world_seed: 12345,
            chunk_size: 32,
            max_loaded_chunks: 64,
            cleanup_interval_ms: 0,
            idle_ticks: 4,
        }
    }
}

impl StreamingConfig {
    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match Self::try_load_from(path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            },
            Err(e) => {
                warn!("Failed to load config file: {e}");
                Self::default()
            },
        }
    }

    /// Load configuration, reporting read and parse failures.
    pub fn try_load_from<P: AsRef<Path>>(path: P) -> StreamingResult<Self> {
        let mut contents = String::new();
        fs::File::open(path.as_ref())?.read_to_string(&mut contents)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Reject values the manager cannot run with.
    pub fn validate(&self) -> StreamingResult<()> {
        if self.max_loaded_chunks < 1 {
            return Err(StreamingError::InvalidConfig(
                "max_loaded_chunks must be at least 1".into(),
            ));
        }
        if self.chunk_size == 0 {
            return Err(StreamingError::InvalidConfig(
                "chunk_size must be positive".into(),
            ));
        }
        if self.cleanup_interval_ms > 0 && self.idle_ticks == 0 {
            return Err(StreamingError::InvalidConfig(
                "idle_ticks must be positive when cleanup is enabled".into(),
            ));
        }
        Ok(())
    }

    /// Cleanup period, if cleanup is enabled.
    #[must_use]
    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_ms > 0).then(|| Duration::from_millis(self.cleanup_interval_ms))
    }
}
