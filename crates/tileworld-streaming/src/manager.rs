//! Chunk streaming manager.
//!
//! Keeps a bounded, least-recently-used working set of chunk payloads and
//! collapses concurrent requests for the same chunk into one load.
//!
//! All cache mutation happens under one `parking_lot` mutex that is never
//! held across an `.await`. Loads run in their own tokio task and commit
//! their result to the cache themselves, so a caller that stops waiting
//! does not waste the work.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tileworld_common::ChunkKey;
use tileworld_worldgen::ChunkPayload;
use tracing::{debug, info, warn};

use crate::cache::{ChunkCache, Evicted};
use crate::config::StreamingConfig;
use crate::error::{LoadError, StreamingError, StreamingResult};
use crate::loader::ChunkLoader;
use crate::telemetry::{CleanupHandle, TelemetrySink};

/// Called with the canonical key (`"{x},{y}"`) of every evicted chunk.
pub type EvictionCallback = Arc<dyn Fn(&str) + Send + Sync>;

type SharedLoad = Shared<BoxFuture<'static, Result<Arc<ChunkPayload>, LoadError>>>;

/// Construction parameters for [`ChunkStreamingManager`].
pub struct ManagerOptions {
    /// Seed, chunk size, capacity and cleanup settings
    pub config: StreamingConfig,
    /// Source of chunk payloads
    pub loader: Arc<dyn ChunkLoader>,
    /// Telemetry sink, shared with the render layer
    pub telemetry: Arc<dyn TelemetrySink>,
    /// Optional eviction notification
    pub on_chunk_evicted: Option<EvictionCallback>,
}

impl ManagerOptions {
    /// Options without an eviction callback.
    pub fn new(
        config: StreamingConfig,
        loader: impl ChunkLoader + 'static,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            config,
            loader: Arc::new(loader),
            telemetry,
            on_chunk_evicted: None,
        }
    }

    /// Sets the eviction callback.
    #[must_use]
    pub fn with_eviction_callback(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_chunk_evicted = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for ManagerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerOptions")
            .field("config", &self.config)
            .field("on_chunk_evicted", &self.on_chunk_evicted.is_some())
            .finish_non_exhaustive()
    }
}

/// Outcome of [`ChunkStreamingManager::ensure_chunk_loaded`].
#[derive(Debug, Clone)]
pub struct EnsureResult {
    /// The chunk payload.
    pub payload: Arc<ChunkPayload>,
    /// `false` when served from the cache, `true` when a load produced it.
    pub is_new: bool,
}

struct InFlight {
    id: u64,
    load: SharedLoad,
}

struct ManagerState {
    cache: ChunkCache,
    in_flight: HashMap<ChunkKey, InFlight>,
    next_load_id: u64,
    disposed: bool,
}

impl ManagerState {
    /// Drops the in-flight entry for `key` if it still belongs to load `id`.
    fn finish_load(&mut self, key: &ChunkKey, id: u64) {
        if self.in_flight.get(key).is_some_and(|entry| entry.id == id) {
            self.in_flight.remove(key);
        }
    }
}

struct Inner {
    config: StreamingConfig,
    loader: Arc<dyn ChunkLoader>,
    telemetry: Arc<dyn TelemetrySink>,
    on_chunk_evicted: Option<EvictionCallback>,
    state: Mutex<ManagerState>,
    cleanup: Mutex<Option<CleanupHandle>>,
}

/// Bounded LRU chunk cache with in-flight load de-duplication.
///
/// Cloning yields another handle to the same manager.
#[derive(Clone)]
pub struct ChunkStreamingManager {
    inner: Arc<Inner>,
}

impl ChunkStreamingManager {
    /// Creates a manager and, if configured, schedules idle cleanup.
    ///
    /// # Errors
    ///
    /// Returns [`StreamingError::InvalidConfig`] if the config is invalid.
    pub fn new(options: ManagerOptions) -> StreamingResult<Self> {
        options.config.validate()?;
        let ManagerOptions {
            config,
            loader,
            telemetry,
            on_chunk_evicted,
        } = options;

        let inner = Arc::new(Inner {
            config,
            loader,
            telemetry,
            on_chunk_evicted,
            state: Mutex::new(ManagerState {
                cache: ChunkCache::new(),
                in_flight: HashMap::new(),
                next_load_id: 0,
                disposed: false,
            }),
            cleanup: Mutex::new(None),
        });

        if let Some(interval) = inner.config.cleanup_interval() {
            let weak: Weak<Inner> = Arc::downgrade(&inner);
            let handle = inner.telemetry.schedule_cleanup(
                interval,
                Box::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.prune_idle();
                    }
                }),
            );
            *inner.cleanup.lock() = Some(handle);
        }

        info!(
            "ChunkStreamingManager initialized: seed={}, chunk_size={}, max_loaded_chunks={}",
            inner.config.world_seed, inner.config.chunk_size, inner.config.max_loaded_chunks
        );
        Ok(Self { inner })
    }

    /// Makes sure chunk `(chunk_x, chunk_y)` is resident and returns it.
    ///
    /// A resident chunk is returned with `is_new: false` without calling
    /// the loader. Otherwise the chunk is loaded once, no matter how many
    /// callers ask for it concurrently, and every waiter receives the same
    /// payload with `is_new: true`.
    ///
    /// # Errors
    ///
    /// Returns [`StreamingError::Load`] if the loader fails and
    /// [`StreamingError::Disposed`] after [`dispose`](Self::dispose).
    pub async fn ensure_chunk_loaded(
        &self,
        chunk_x: i32,
        chunk_y: i32,
    ) -> StreamingResult<EnsureResult> {
        let key = ChunkKey::new(chunk_x, chunk_y);

        let load = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return Err(StreamingError::Disposed);
            }

            if let Some(payload) = state.cache.touch(&key) {
                drop(state);
                self.inner.telemetry.log_cache_hit(&key);
                return Ok(EnsureResult {
                    payload,
                    is_new: false,
                });
            }

            if let Some(entry) = state.in_flight.get(&key) {
                debug!("Joining in-flight load for chunk {key}");
                entry.load.clone()
            } else {
                let id = state.next_load_id;
                state.next_load_id += 1;
                let load = Arc::clone(&self.inner).spawn_load(key.clone(), id, chunk_x, chunk_y);
                state.in_flight.insert(
                    key.clone(),
                    InFlight {
                        id,
                        load: load.clone(),
                    },
                );
                load
            }
        };

        match load.await {
            Ok(payload) => Ok(EnsureResult {
                payload,
                is_new: true,
            }),
            Err(source) => Err(StreamingError::Load {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Evicts chunks untouched for the configured number of cleanup ticks.
    ///
    /// Called by the scheduled cleanup; exposed so callers can drive it
    /// directly. Returns the number of evicted chunks.
    pub fn prune_idle(&self) -> usize {
        self.inner.prune_idle()
    }

    /// Tears the manager down.
    ///
    /// Cancels scheduled cleanup, drops every cached chunk without calling
    /// the eviction callback and disposes the telemetry sink. Later calls
    /// are no-ops.
    pub fn dispose(&self) {
        let dropped = {
            let mut state = self.inner.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            state.in_flight.clear();
            state.cache.clear()
        };

        if let Some(handle) = self.inner.cleanup.lock().take() {
            handle.cancel();
        }
        self.inner.telemetry.dispose();
        info!("ChunkStreamingManager disposed ({dropped} chunks dropped)");
    }

    /// Number of resident chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.lock().cache.len()
    }

    /// Whether no chunks are resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().cache.is_empty()
    }

    /// Whether chunk `(chunk_x, chunk_y)` is resident.
    #[must_use]
    pub fn contains(&self, chunk_x: i32, chunk_y: i32) -> bool {
        self.inner
            .state
            .lock()
            .cache
            .contains(&ChunkKey::new(chunk_x, chunk_y))
    }

    /// Resident keys from least to most recently used.
    #[must_use]
    pub fn loaded_keys(&self) -> Vec<ChunkKey> {
        self.inner.state.lock().cache.keys_lru()
    }

    /// Number of loads currently in flight.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    /// Whether [`dispose`](Self::dispose) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.inner.state.lock().disposed
    }

    /// Configuration the manager was built with.
    #[must_use]
    pub fn config(&self) -> &StreamingConfig {
        &self.inner.config
    }

    /// The telemetry sink, for the render layer's own events.
    #[must_use]
    pub fn telemetry(&self) -> Arc<dyn TelemetrySink> {
        Arc::clone(&self.inner.telemetry)
    }
}

impl fmt::Debug for ChunkStreamingManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ChunkStreamingManager")
            .field("config", &self.inner.config)
            .field("loaded", &state.cache.len())
            .field("in_flight", &state.in_flight.len())
            .field("disposed", &state.disposed)
            .finish()
    }
}

impl Inner {
    /// Starts a load task and returns a future every waiter can share.
    ///
    /// However the task ends, its in-flight entry is removed, so a later
    /// request for the same chunk starts a fresh load.
    fn spawn_load(
        self: Arc<Self>,
        key: ChunkKey,
        id: u64,
        chunk_x: i32,
        chunk_y: i32,
    ) -> SharedLoad {
        let weak = Arc::downgrade(&self);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let outcome = AssertUnwindSafe(self.run_load(&task_key, id, chunk_x, chunk_y))
                .catch_unwind()
                .await;
            outcome.unwrap_or_else(|_| {
                self.state.lock().finish_load(&task_key, id);
                warn!("Load task for chunk {task_key} panicked");
                Err(LoadError::Aborted("load task panicked".into()))
            })
        });

        async move {
            task.await.unwrap_or_else(|e| {
                if let Some(inner) = weak.upgrade() {
                    inner.state.lock().finish_load(&key, id);
                }
                Err(LoadError::Aborted(e.to_string()))
            })
        }
        .boxed()
        .shared()
    }

    async fn run_load(
        &self,
        key: &ChunkKey,
        id: u64,
        chunk_x: i32,
        chunk_y: i32,
    ) -> Result<Arc<ChunkPayload>, LoadError> {
        self.telemetry.log_load_start(key);
        let result = AssertUnwindSafe(self.loader.load_chunk_data(chunk_x, chunk_y))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(LoadError::Aborted("loader panicked".into())));

        match result {
            Ok(payload) => {
                let payload = Arc::new(payload);
                self.commit(key, id, Arc::clone(&payload));
                Ok(payload)
            },
            Err(e) => {
                self.state.lock().finish_load(key, id);
                warn!("Failed to load chunk {key}: {e}");
                self.telemetry.log_load_error(key, &e);
                Err(e)
            },
        }
    }

    /// Inserts a loaded chunk and evicts down to capacity.
    fn commit(&self, key: &ChunkKey, id: u64, payload: Arc<ChunkPayload>) {
        let tiles = payload.tile_count();
        let (evicted, cache_size) = {
            let mut state = self.state.lock();
            state.finish_load(key, id);
            if state.disposed {
                drop(state);
                debug!("Chunk {key} finished loading after dispose; not cached");
                return;
            }
            state.cache.insert(key.clone(), payload);
            let evicted = state.cache.evict_over(self.config.max_loaded_chunks);
            (evicted, state.cache.len())
        };

        self.telemetry.log_load_success(key, tiles, cache_size);
        debug!("Loaded chunk {key} ({tiles} tiles, {cache_size} resident)");
        self.release(evicted, cache_size);
    }

    fn prune_idle(&self) -> usize {
        let (evicted, cache_size) = {
            let mut state = self.state.lock();
            if state.disposed {
                return 0;
            }
            let evicted = state.cache.prune_idle(self.config.idle_ticks);
            (evicted, state.cache.len())
        };

        let count = evicted.len();
        if count > 0 {
            debug!("Pruned {count} idle chunks");
        }
        self.release(evicted, cache_size);
        count
    }

    /// Notifies the callback and telemetry of evictions already applied.
    fn release(&self, evicted: Vec<Evicted>, cache_size: usize) {
        for (key, payload) in evicted {
            if let Some(callback) = &self.on_chunk_evicted {
                if catch_unwind(AssertUnwindSafe(|| callback(key.as_str()))).is_err() {
                    warn!("Eviction callback panicked for chunk {key}");
                }
            }
            self.telemetry
                .log_release(&key, payload.tile_count(), cache_size);
            debug!("Evicted chunk {key}");
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(handle) = self.cleanup.get_mut().take() {
            handle.cancel();
        }
    }
}
