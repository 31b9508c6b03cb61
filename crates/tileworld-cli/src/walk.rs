//! Simulated viewer walk through the streaming manager.

use std::sync::Arc;

use anyhow::Result;
use tileworld_common::ChunkCoord;
use tileworld_streaming::{
    ChunkStreamingManager, GeneratorLoader, ManagerOptions, StreamingConfig, TelemetryCounters,
    TracingTelemetry,
};
use tracing::info;

/// Chunks within `radius` of `center`, ring by ring, nearest first.
///
/// Each ring is walked clockwise from its north-west corner.
#[must_use]
pub fn spiral(center: ChunkCoord, radius: u32) -> Vec<ChunkCoord> {
    let mut coords = vec![center];
    for ring in 1..=radius as i32 {
        let (cx, cy) = (center.x, center.y);
        // Top edge, left to right.
        for x in (cx - ring)..=(cx + ring) {
            coords.push(ChunkCoord::new(x, cy - ring));
        }
        // Right edge, top to bottom.
        for y in (cy - ring + 1)..=(cy + ring) {
            coords.push(ChunkCoord::new(cx + ring, y));
        }
        // Bottom edge, right to left.
        for x in ((cx - ring)..(cx + ring)).rev() {
            coords.push(ChunkCoord::new(x, cy + ring));
        }
        // Left edge, bottom to top.
        for y in ((cy - ring + 1)..(cy + ring)).rev() {
            coords.push(ChunkCoord::new(cx - ring, y));
        }
    }
    coords
}

/// Summary of a finished walk.
#[derive(Debug, Clone)]
pub struct WalkReport {
    /// Chunks requested, including hits.
    pub requests: u64,
    /// Requests served by a fresh load.
    pub new_chunks: u64,
    /// Chunks resident at the end.
    pub resident: usize,
    /// Telemetry counters at the end.
    pub counters: TelemetryCounters,
}

/// Walks a viewer `steps` times by `(dx, dy)`, keeping its view loaded.
pub async fn run_walk(
    config: StreamingConfig,
    radius: u32,
    steps: u32,
    direction: (i32, i32),
) -> Result<WalkReport> {
    let telemetry = Arc::new(TracingTelemetry::new());
    let loader = GeneratorLoader::from_config(&config);
    let manager = ChunkStreamingManager::new(
        ManagerOptions::new(config, loader, telemetry.clone())
            .with_eviction_callback(|key| tracing::debug!("Viewer dropped chunk {key}")),
    )?;

    let mut requests = 0;
    let mut new_chunks = 0;
    let mut center = ChunkCoord::new(0, 0);
    for step in 0..=steps {
        let view = spiral(center, radius);
        // Refresh what is still resident before loading what entered the
        // view, so new loads only push out chunks the viewer left behind.
        let (resident, entering): (Vec<&ChunkCoord>, Vec<&ChunkCoord>) =
            view.iter().partition(|c| manager.contains(c.x, c.y));
        let mut fresh = 0;
        for coord in resident.into_iter().chain(entering) {
            let result = manager.ensure_chunk_loaded(coord.x, coord.y).await?;
            requests += 1;
            if result.is_new {
                fresh += 1;
            }
        }
        new_chunks += fresh;
        info!(
            "Step {step}: viewer at {center}, {} chunks in view, {fresh} loaded, {} resident",
            view.len(),
            manager.len()
        );
        center = ChunkCoord::new(center.x + direction.0, center.y + direction.1);
    }

    let resident = manager.len();
    manager.dispose();
    Ok(WalkReport {
        requests,
        new_chunks,
        resident,
        counters: telemetry.snapshot(),
    })
}
