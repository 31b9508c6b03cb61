//! Chunk data sources.
//!
//! The manager never calls the generator directly; it asks a
//! [`ChunkLoader`]. Production wires in [`GeneratorLoader`], tests pass a
//! closure.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tileworld_worldgen::{ChunkPayload, WorldGenerator};
use tracing::debug;

use crate::config::StreamingConfig;
use crate::error::LoadError;

/// Future returned by a loader.
pub type LoadFuture = BoxFuture<'static, Result<ChunkPayload, LoadError>>;

/// Asynchronous source of chunk payloads.
pub trait ChunkLoader: Send + Sync {
    /// Loads the payload of chunk `(chunk_x, chunk_y)`.
    fn load_chunk_data(&self, chunk_x: i32, chunk_y: i32) -> LoadFuture;
}

impl<F, Fut> ChunkLoader for F
where
    F: Fn(i32, i32) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ChunkPayload, LoadError>> + Send + 'static,
{
    fn load_chunk_data(&self, chunk_x: i32, chunk_y: i32) -> LoadFuture {
        Box::pin(self(chunk_x, chunk_y))
    }
}

/// Loader that runs a shared [`WorldGenerator`] on the blocking pool.
#[derive(Debug, Clone)]
pub struct GeneratorLoader {
    generator: Arc<WorldGenerator>,
    chunk_size: u32,
}

impl GeneratorLoader {
    /// Wraps a generator producing chunks of `chunk_size` tiles per side.
    #[must_use]
    pub fn new(generator: Arc<WorldGenerator>, chunk_size: u32) -> Self {
        Self {
            generator,
            chunk_size,
        }
    }

    /// Builds a generator from the configured seed and chunk size.
    #[must_use]
    pub fn from_config(config: &StreamingConfig) -> Self {
        Self::new(
            Arc::new(WorldGenerator::new(config.world_seed)),
            config.chunk_size,
        )
    }

    /// The wrapped generator.
    #[must_use]
    pub fn generator(&self) -> &Arc<WorldGenerator> {
        &self.generator
    }
}

impl ChunkLoader for GeneratorLoader {
    fn load_chunk_data(&self, chunk_x: i32, chunk_y: i32) -> LoadFuture {
        let generator = Arc::clone(&self.generator);
        let chunk_size = self.chunk_size;
        Box::pin(async move {
            debug!("Generating chunk ({chunk_x}, {chunk_y}) on blocking pool");
            let payload = tokio::task::spawn_blocking(move || {
                generator.generate_chunk(chunk_x, chunk_y, chunk_size)
            })
            .await
            .map_err(|e| LoadError::Aborted(e.to_string()))??;
            Ok::<_, LoadError>(payload)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tileworld_common::WorldError;

    #[tokio::test]
    async fn test_generator_loader_matches_generator() {
        let generator = Arc::new(WorldGenerator::new(5));
        let loader = GeneratorLoader::new(Arc::clone(&generator), 8);
        let loaded = loader.load_chunk_data(3, -2).await.expect("load chunk");
        let direct = generator.generate_chunk(3, -2, 8).expect("generate chunk");
        assert_eq!(loaded, direct);
    }

    #[tokio::test]
    async fn test_generator_loader_reports_invalid_size() {
        let loader = GeneratorLoader::new(Arc::new(WorldGenerator::new(5)), 0);
        let err = loader.load_chunk_data(0, 0).await.expect_err("size 0 must fail");
        assert!(matches!(
            err,
            LoadError::Generation(WorldError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_closure_loader() {
        let loader = |x: i32, _y: i32| async move {
            if x < 0 {
                Err(LoadError::failed("negative"))
            } else {
                WorldGenerator::new(1).generate_chunk(x, 0, 8).map_err(LoadError::from)
            }
        };
        assert!(loader.load_chunk_data(1, 0).await.is_ok());
        assert_eq!(
            loader.load_chunk_data(-1, 0).await,
            Err(LoadError::failed("negative"))
        );
    }

    #[test]
    fn test_from_config() {
        let config = StreamingConfig {
            world_seed: 99,
            chunk_size: 16,
            ..StreamingConfig::default()
        };
        let loader = GeneratorLoader::from_config(&config);
        assert_eq!(loader.generator().seed(), 99);
        assert_eq!(loader.chunk_size, 16);
    }
}
