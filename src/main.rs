//! Headless streaming demo that walks a viewer across procedural terrain.
//!
//! Usage: cargo run --release -- [OPTIONS]
//!
//! Options:
//!   --config <PATH>   Load engine configuration from a JSON file
//!   --save <PATH>     Write the effective configuration to a JSON file and exit
//!   --seed <SEED>     Noise / placement seed (default: from config)
//!   --ticks <N>       Simulation ticks to run (default: 600)
//!   --speed <M>       Viewer speed in meters per tick (default: 6.0)
//!   --inline          Compute geometry on the scheduler thread instead of
//!                     the background worker

use std::path::PathBuf;
use std::time::Instant;

use glam::Vec3;

use relief::mesh::{MeshBuffers, SurfaceSink};
use relief::streaming::{EngineConfig, GridCoord, TerrainEngine};

/// Sink that tallies committed geometry instead of uploading it anywhere.
#[derive(Default)]
struct StatsSink {
    commits: usize,
    triangles: usize,
    vertices: usize,
}

impl SurfaceSink for StatsSink {
    fn commit(&mut self, coord: GridCoord, buffers: &MeshBuffers) {
        self.commits += 1;
        self.triangles += buffers.indices.len() / 3;
        self.vertices += buffers.positions.len();
        log::debug!(
            "chunk ({}, {}): {} vertices, {} triangles",
            coord.x,
            coord.z,
            buffers.positions.len(),
            buffers.indices.len() / 3
        );
    }
}

fn main() {
    relief::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    let ticks = parse_usize_arg(&args, "--ticks").unwrap_or(600);
    let speed = parse_f32_arg(&args, "--speed").unwrap_or(6.0);

    let mut config = match parse_str_arg(&args, "--config") {
        Some(path) => match EngineConfig::load_sync(&PathBuf::from(&path)) {
            Ok(config) => config,
            Err(e) => {
                log::error!("failed to load config from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };
    if let Some(seed) = parse_u32_arg(&args, "--seed") {
        config.seed = seed;
    }
    if args.iter().any(|a| a == "--inline") {
        config.threaded = false;
    }

    if let Some(path) = parse_str_arg(&args, "--save") {
        if let Err(e) = config.save_sync(&PathBuf::from(&path)) {
            log::error!("failed to save config to {}: {}", path, e);
            std::process::exit(1);
        }
        log::info!("configuration written to {}", path);
        return;
    }

    let mut engine = match TerrainEngine::new(config.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("engine startup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Spawn on the surface at the origin, then wander outward on a spiral
    // so the streaming window keeps crossing cell boundaries.
    let spawn_height = engine.surface_height(0.0, 0.0);
    log::info!("spawn at (0, {:.2}, 0), seed {}", spawn_height, config.seed);

    let mut sink = StatsSink::default();
    let start = Instant::now();

    for tick in 0..ticks {
        let t = tick as f32 * 0.01;
        let radius = speed * tick as f32 * 0.1;
        let pos = Vec3::new(t.cos() * radius, spawn_height, t.sin() * radius);

        engine.update(pos);
        engine.apply(&mut sink);

        if tick % 100 == 0 {
            log::info!(
                "tick {}: viewer ({:.0}, {:.0}), {} active chunks, {} free slots, {} queued",
                tick,
                pos.x,
                pos.z,
                engine.active_chunks(),
                engine.pool_free(),
                engine.pending_apply()
            );
        }
    }

    // Let the worker finish whatever the last updates queued
    let drain_deadline = Instant::now() + std::time::Duration::from_secs(5);
    while engine.pending_apply() > 0 && Instant::now() < drain_deadline {
        engine.apply(&mut sink);
        std::thread::sleep(std::time::Duration::from_millis(2));
    }

    let elapsed = start.elapsed();
    log::info!(
        "{} ticks in {:.2?}: {} commits, {} vertices, {} triangles",
        ticks,
        elapsed,
        sink.commits,
        sink.vertices,
        sink.triangles
    );

    engine.shutdown();
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
