//! Streaming error types.

use thiserror::Error;
use tileworld_common::WorldError;

/// A failed chunk load.
///
/// `Clone` so one failure can be handed to every caller waiting on the
/// same in-flight load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The generator rejected the request
    #[error("Generation failed: {0}")]
    Generation(#[from] WorldError),

    /// The loader reported a failure
    #[error("Load failed: {0}")]
    Failed(String),

    /// The load task ended without producing a result
    #[error("Load aborted: {0}")]
    Aborted(String),
}

impl LoadError {
    /// Creates a loader failure from any message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors surfaced by the streaming manager.
#[derive(Debug, Error)]
pub enum StreamingError {
    /// Configuration rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The loader failed for a chunk
    #[error("Failed to load chunk {key}: {source}")]
    Load {
        /// Canonical key of the chunk
        key: String,
        /// Underlying failure
        #[source]
        source: LoadError,
    },

    /// The manager has been disposed
    #[error("Chunk streaming manager is disposed")]
    Disposed,

    /// Config file could not be read or written
    #[error("Config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// Config file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl StreamingError {
    /// The underlying load failure, if this is one.
    #[must_use]
    pub fn load_error(&self) -> Option<&LoadError> {
        match self {
            Self::Load { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Result type alias for streaming operations.
pub type StreamingResult<T> = Result<T, StreamingError>;
