//! # Tileworld Streaming
//!
//! Keeps a bounded working set of generated chunks resident as a viewer
//! moves through an infinite world.
//!
//! This crate handles:
//! - Least-recently-used chunk caching with a hard capacity
//! - De-duplication of concurrent loads for the same chunk
//! - Eviction notification and structured telemetry
//! - Periodic idle-chunk pruning
//! - TOML streaming configuration
//!
//! The manager never generates chunks itself; it asks an injected
//! [`ChunkLoader`], which in production is a [`GeneratorLoader`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod manager;
pub mod telemetry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::ChunkCache;
    pub use crate::config::{StreamingConfig, CONFIG_FILE};
    pub use crate::error::{LoadError, StreamingError, StreamingResult};
    pub use crate::loader::{ChunkLoader, GeneratorLoader, LoadFuture};
    pub use crate::manager::{
        ChunkStreamingManager, EnsureResult, EvictionCallback, ManagerOptions,
    };
    pub use crate::telemetry::{
        CleanupCallback, CleanupHandle, TelemetryCounters, TelemetrySink, TracingTelemetry,
        TELEMETRY_TARGET,
    };
}

pub use prelude::*;
