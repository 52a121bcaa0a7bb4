//! Engine configuration surface with JSON load/save helpers

use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::decor::DecorLayerConfig;
use crate::streaming::lod::LodPreset;
use crate::terrain::heightfield::OctaveParams;
use crate::terrain::palette::PaletteConfig;

/// Full streaming engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    /// World-space edge length of one chunk
    pub chunk_size: f32,
    /// Square radius (in grid cells) of the streaming window kept active
    /// around the viewer
    pub reach: i32,
    /// Chunk pool capacity override; None uses `(2*reach + 1)^2 - 1`
    pub pool_capacity: Option<usize>,
    /// Global noise / placement seed
    pub seed: u32,
    /// Noise layers, summed in list order
    pub octaves: Vec<OctaveParams>,
    /// Round the running height to multiples of this after every octave
    /// (blocky terrain), or None for smooth terrain
    pub block_snap: Option<f32>,
    /// Ordered LOD presets; first enabled match wins
    pub lod_presets: Vec<LodPreset>,
    /// Fallback LOD for offsets outside every preset; also the threshold
    /// below which decorative objects are removed
    pub far_lod: f32,
    /// Run the seam stitcher on chunks finer than the far LOD
    pub fix_seams: bool,
    /// Spawn the background mesh worker; false computes geometry inline
    /// during apply
    pub threaded: bool,
    /// Maximum chunks committed per apply call (frame-time ceiling)
    pub apply_cap: usize,
    /// Chebyshev rings of neighbors refreshed by an explicit mesh
    /// regeneration
    pub neighbor_depth: i32,
    /// Vertex coloring
    pub palette: PaletteConfig,
    /// Decorative object layers
    pub decor_layers: Vec<DecorLayerConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 40.0,
            reach: 8,
            pool_capacity: None,
            seed: 1337,
            octaves: vec![
                OctaveParams { distance: 200.0, height: 40.0, enabled: true },
                OctaveParams { distance: 50.0, height: 10.0, enabled: true },
                OctaveParams { distance: 9.0, height: 1.5, enabled: true },
            ],
            block_snap: None,
            // Each step doubles vertex spacing so adjacent rings stitch 2:1
            lod_presets: vec![
                LodPreset { lod: 0.625, range: 2, enabled: true },
                LodPreset { lod: 1.25, range: 3, enabled: true },
                LodPreset { lod: 2.5, range: 5, enabled: true },
                LodPreset { lod: 5.0, range: 7, enabled: true },
            ],
            far_lod: 10.0,
            fix_seams: true,
            threaded: true,
            apply_cap: 200,
            neighbor_depth: 2,
            palette: PaletteConfig::default(),
            decor_layers: vec![
                DecorLayerConfig {
                    name: "trees".to_string(),
                    min_height: 6.0,
                    max_height: 38.0,
                    per_chunk: 24,
                    pool_size: 4096,
                    enabled: true,
                },
                DecorLayerConfig {
                    name: "rocks".to_string(),
                    min_height: 4.5,
                    max_height: 50.0,
                    per_chunk: 8,
                    pool_size: 2048,
                    enabled: true,
                },
            ],
        }
    }
}

impl EngineConfig {
    /// Reject structurally impossible values before the engine starts.
    /// Degenerate LOD values themselves are caught at template build time.
    pub fn validate(&self) -> Result<()> {
        if !self.chunk_size.is_finite() || self.chunk_size <= 0.0 {
            return Err(Error::Config(format!(
                "chunk_size must be a positive finite number, got {}",
                self.chunk_size
            )));
        }
        if self.reach < 1 {
            return Err(Error::Config(format!(
                "reach must be at least 1, got {}",
                self.reach
            )));
        }
        if self.apply_cap == 0 {
            return Err(Error::Config("apply_cap must be at least 1".to_string()));
        }
        if self.neighbor_depth < 0 {
            return Err(Error::Config(format!(
                "neighbor_depth must be non-negative, got {}",
                self.neighbor_depth
            )));
        }
        if let Some(block) = self.block_snap {
            if !block.is_finite() || block <= 0.0 {
                return Err(Error::Config(format!(
                    "block_snap must be a positive finite number, got {}",
                    block
                )));
            }
        }
        for octave in &self.octaves {
            if octave.enabled && (!octave.distance.is_finite() || octave.distance == 0.0) {
                return Err(Error::Config(format!(
                    "octave distance must be a nonzero finite number, got {}",
                    octave.distance
                )));
            }
        }
        if let Some(capacity) = self.pool_capacity {
            if capacity == 0 {
                return Err(Error::Config("pool_capacity override must be at least 1".to_string()));
            }
        }
        if self.palette.ramp.is_empty() {
            return Err(Error::Config("palette ramp needs at least one key".to_string()));
        }
        Ok(())
    }

    /// Effective pool capacity: the override if set, otherwise sized from
    /// the reach.
    pub fn effective_pool_capacity(&self) -> usize {
        self.pool_capacity
            .unwrap_or_else(|| crate::streaming::pool::ChunkPool::default_capacity(self.reach))
    }

    /// Save to file (sync)
    pub fn save_sync(&self, path: &Path) -> std::result::Result<(), io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, json)
    }

    /// Load from file (sync)
    pub fn load_sync(path: &Path) -> std::result::Result<Self, io::Error> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}
