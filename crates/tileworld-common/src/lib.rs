//! # Tileworld Common
//!
//! Common types shared by the generator and the streaming manager:
//! - Coordinate types (world, chunk, local tile)
//! - The canonical chunk key (`"{chunkX},{chunkY}"`)
//! - Common error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod coords;
pub mod error;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::coords::*;
    pub use crate::error::*;
}

pub use prelude::*;
