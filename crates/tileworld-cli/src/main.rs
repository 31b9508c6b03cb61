//! # Tileworld CLI
//!
//! Command-line front end for the tile world:
//! - `chunk`: generate one chunk from a query and print the JSON response
//! - `walk`: stream chunks around a moving viewer and report telemetry

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod cli;
mod walk;

use anyhow::{Context, Result};
use clap::Parser;
use tileworld_streaming::{StreamingConfig, CONFIG_FILE};
use tileworld_worldgen::{ChunkResponse, CACHE_CONTROL};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cli::{ChunkArgs, CliArgs, Command, WalkArgs};

/// Main entry point.
#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("tileworld=info".parse()?))
        .init();

    info!("Tileworld {}", env!("CARGO_PKG_VERSION"));

    let args = CliArgs::parse();
    match args.command {
        Command::Chunk(chunk) => run_chunk(&chunk),
        Command::Walk(walk) => run_walk(walk).await,
    }
}

fn run_chunk(args: &ChunkArgs) -> Result<()> {
    let request = args.to_request();
    info!(
        "Generating chunk {} ({} tiles/side, seed {}, detail {:?})",
        request.key(),
        request.chunk_size,
        request.seed,
        request.detail
    );

    let payload = request.generate().context("chunk generation failed")?;
    let body = ChunkResponse::from_payload(&payload, request.detail).to_json()?;

    if args.headers {
        println!("Content-Type: application/json");
        println!("Cache-Control: {CACHE_CONTROL}");
        println!();
    }
    println!("{body}");
    Ok(())
}

async fn run_walk(args: WalkArgs) -> Result<()> {
    let path = args.config.clone().unwrap_or_else(|| CONFIG_FILE.into());
    let mut config = StreamingConfig::load_from(&path);
    args.apply_overrides(&mut config);
    config.validate()?;

    if let Some(ref out) = args.save_config {
        config
            .save_to(out)
            .with_context(|| format!("failed to write config to {}", out.display()))?;
        info!("Saved config to {:?}", out);
    }

    let report = walk::run_walk(config, args.radius, args.steps, (args.dx, args.dy)).await?;
    info!(
        "Walk finished: {} requests, {} new chunks, {} resident",
        report.requests, report.new_chunks, report.resident
    );
    println!("{}", serde_json::to_string_pretty(&report.counters)?);
    Ok(())
}
