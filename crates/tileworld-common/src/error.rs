//! Error types shared across Tileworld crates.

use thiserror::Error;

/// World and chunk errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    /// A caller passed an argument outside its valid domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A chunk key did not have the `"{x},{y}"` shape
    #[error("Invalid chunk key: {0:?}")]
    InvalidChunkKey(String),
}

/// Result type alias for world operations.
pub type WorldResult<T> = Result<T, WorldError>;
