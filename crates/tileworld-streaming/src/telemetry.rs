//! Telemetry sink for chunk streaming.
//!
//! The manager reports load, release and hit events through a
//! [`TelemetrySink`]. The render layer reports its own create/dispose
//! events through the same sink. [`TracingTelemetry`] is the production
//! sink: it emits `tracing` events and keeps running counters.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tileworld_common::ChunkKey;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::LoadError;

/// Tracing target for telemetry events.
pub const TELEMETRY_TARGET: &str = "tileworld::telemetry";

/// Periodic callback registered through [`TelemetrySink::schedule_cleanup`].
pub type CleanupCallback = Box<dyn Fn() + Send + Sync>;

/// Cancels a scheduled cleanup.
pub struct CleanupHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl CleanupHandle {
    /// Wraps a cancel function.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to cancel.
    #[must_use]
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    /// Stops the scheduled cleanup.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for CleanupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Structured observability events for chunk streaming.
///
/// Calls are fire-and-forget; the manager never depends on their outcome.
pub trait TelemetrySink: Send + Sync {
    /// A load for `key` is starting.
    fn log_load_start(&self, key: &ChunkKey);

    /// A load for `key` finished with `tiles` tiles; the cache now holds `cache_size` chunks.
    fn log_load_success(&self, key: &ChunkKey, tiles: usize, cache_size: usize);

    /// A load for `key` failed.
    fn log_load_error(&self, key: &ChunkKey, error: &LoadError);

    /// `key` was evicted, releasing `tiles` tiles.
    fn log_release(&self, key: &ChunkKey, tiles: usize, cache_size: usize);

    /// `key` was served from the cache.
    fn log_cache_hit(&self, key: &ChunkKey);

    /// The render layer materialized visuals for `key`.
    fn log_render_create(&self, key: &ChunkKey);

    /// The render layer destroyed visuals for `key`.
    fn log_render_dispose(&self, key: &ChunkKey);

    /// Runs `callback` every `interval` until the returned handle is cancelled.
    fn schedule_cleanup(&self, interval: Duration, callback: CleanupCallback) -> CleanupHandle;

    /// Releases sink resources.
    fn dispose(&self);
}

/// Point-in-time copy of the telemetry counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TelemetryCounters {
    /// Successful loads.
    pub loads: u64,
    /// Failed loads.
    pub load_errors: u64,
    /// Cache hits.
    pub cache_hits: u64,
    /// Evicted chunks.
    pub releases: u64,
    /// Tiles brought in by loads.
    pub tiles_loaded: u64,
    /// Tiles dropped by evictions.
    pub tiles_released: u64,
    /// Cache size reported by the latest load or release.
    pub last_cache_size: u64,
    /// Render-create events.
    pub render_creates: u64,
    /// Render-dispose events.
    pub render_disposes: u64,
}

/// Telemetry sink that logs through `tracing` and keeps counters.
#[derive(Debug, Default)]
pub struct TracingTelemetry {
    loads: AtomicU64,
    load_errors: AtomicU64,
    cache_hits: AtomicU64,
    releases: AtomicU64,
    tiles_loaded: AtomicU64,
    tiles_released: AtomicU64,
    last_cache_size: AtomicU64,
    render_creates: AtomicU64,
    render_disposes: AtomicU64,
    disposed: AtomicBool,
}

impl TracingTelemetry {
    /// Creates a sink with zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter values.
    #[must_use]
    pub fn snapshot(&self) -> TelemetryCounters {
        TelemetryCounters {
            loads: self.loads.load(Ordering::Relaxed),
            load_errors: self.load_errors.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            tiles_loaded: self.tiles_loaded.load(Ordering::Relaxed),
            tiles_released: self.tiles_released.load(Ordering::Relaxed),
            last_cache_size: self.last_cache_size.load(Ordering::Relaxed),
            render_creates: self.render_creates.load(Ordering::Relaxed),
            render_disposes: self.render_disposes.load(Ordering::Relaxed),
        }
    }

    /// Whether [`TelemetrySink::dispose`] has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl TelemetrySink for TracingTelemetry {
    fn log_load_start(&self, key: &ChunkKey) {
        debug!(target: TELEMETRY_TARGET, chunk = %key, "load start");
    }

    fn log_load_success(&self, key: &ChunkKey, tiles: usize, cache_size: usize) {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.tiles_loaded.fetch_add(tiles as u64, Ordering::Relaxed);
        self.last_cache_size.store(cache_size as u64, Ordering::Relaxed);
        debug!(target: TELEMETRY_TARGET, chunk = %key, tiles, cache_size, "load success");
    }

    fn log_load_error(&self, key: &ChunkKey, error: &LoadError) {
        self.load_errors.fetch_add(1, Ordering::Relaxed);
        warn!(target: TELEMETRY_TARGET, chunk = %key, %error, "load error");
    }

    fn log_release(&self, key: &ChunkKey, tiles: usize, cache_size: usize) {
        self.releases.fetch_add(1, Ordering::Relaxed);
        self.tiles_released.fetch_add(tiles as u64, Ordering::Relaxed);
        self.last_cache_size.store(cache_size as u64, Ordering::Relaxed);
        debug!(target: TELEMETRY_TARGET, chunk = %key, tiles, cache_size, "release");
    }

    fn log_cache_hit(&self, key: &ChunkKey) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
        debug!(target: TELEMETRY_TARGET, chunk = %key, "cache hit");
    }

    fn log_render_create(&self, key: &ChunkKey) {
        self.render_creates.fetch_add(1, Ordering::Relaxed);
        debug!(target: TELEMETRY_TARGET, chunk = %key, "render create");
    }

    fn log_render_dispose(&self, key: &ChunkKey) {
        self.render_disposes.fetch_add(1, Ordering::Relaxed);
        debug!(target: TELEMETRY_TARGET, chunk = %key, "render dispose");
    }

    fn schedule_cleanup(&self, interval: Duration, callback: CleanupCallback) -> CleanupHandle {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(target: TELEMETRY_TARGET, "No tokio runtime; idle cleanup disabled");
            return CleanupHandle::noop();
        };

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                callback();
            }
        });
        info!(target: TELEMETRY_TARGET, "Scheduled idle cleanup every {interval:?}");
        CleanupHandle::new(move || task.abort())
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            info!(target: TELEMETRY_TARGET, counters = ?self.snapshot(), "telemetry disposed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_counters_accumulate() {
        let sink = TracingTelemetry::new();
        let key = ChunkKey::new(1, -1);
        sink.log_load_start(&key);
        sink.log_load_success(&key, 64, 1);
        sink.log_load_success(&key, 64, 2);
        sink.log_release(&key, 64, 1);
        sink.log_cache_hit(&key);
        sink.log_render_create(&key);
        sink.log_render_dispose(&key);
        sink.log_load_error(&key, &LoadError::failed("boom"));

        let counters = sink.snapshot();
        assert_eq!(counters.loads, 2);
        assert_eq!(counters.tiles_loaded, 128);
        assert_eq!(counters.releases, 1);
        assert_eq!(counters.tiles_released, 64);
        assert_eq!(counters.last_cache_size, 1);
        assert_eq!(counters.cache_hits, 1);
        assert_eq!(counters.render_creates, 1);
        assert_eq!(counters.render_disposes, 1);
        assert_eq!(counters.load_errors, 1);
    }

    #[test]
    fn test_dispose_idempotent() {
        let sink = TracingTelemetry::new();
        assert!(!sink.is_disposed());
        sink.dispose();
        sink.dispose();
        assert!(sink.is_disposed());
    }

    #[test]
    fn test_cleanup_without_runtime_is_noop() {
        let sink = TracingTelemetry::new();
        let handle = sink.schedule_cleanup(Duration::from_millis(1), Box::new(|| {}));
        assert!(format!("{handle:?}").contains("armed: false"));
        handle.cancel();
    }

    #[test]
    fn test_handle_cancel_runs_once() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&cancelled);
        let handle = CleanupHandle::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        handle.cancel();
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cleanup_ticks_until_cancelled() {
        let sink = TracingTelemetry::new();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let handle = sink.schedule_cleanup(
            Duration::from_millis(5),
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.cancel();
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 1, "expected cleanup ticks, saw {seen}");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }
}
