//! Chunk streaming, LOD scheduling, and the async mesh pipeline

pub mod lod;
pub mod chunk;
pub mod pool;
pub mod config;
pub mod engine;
pub mod worker;

pub use lod::{lod_eq, LodPreset, LodResolver, LOD_EPSILON};
pub use chunk::{ChunkState, ChunkStore, GridCoord, SlotId, NEIGHBOR_OFFSETS};
pub use pool::ChunkPool;
pub use config::EngineConfig;
pub use engine::TerrainEngine;
pub use worker::MeshWorker;
