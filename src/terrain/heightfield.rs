//! Layered noise heightfield sampling
//!
//! The terrain surface is a sum of Perlin octaves, each with its own spatial
//! frequency divisor and amplitude. Sampling is pure and deterministic, so it
//! is safe to call concurrently from the mesh worker and the scheduler.

use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// One layer of the summed noise heightfield.
///
/// Octaves are evaluated in configured order; each contributes
/// `noise(coord / distance) * height` to the running total.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OctaveParams {
    /// Spatial frequency divisor (larger = smoother features)
    pub distance: f32,
    /// Amplitude of this layer
    pub height: f32,
    /// Disabled octaves are skipped entirely
    pub enabled: bool,
}

/// Noise-based heightfield sampler.
///
/// Two coordinate spaces exist: the *local* path samples in mesh-vertex space
/// during chunk generation, the *world* path divides by the chunk's
/// horizontal scale first and is used for spawn placement and decorative
/// objects. Both apply the identical octave formula.
pub struct HeightField {
    perlin: Perlin,
    octaves: Vec<OctaveParams>,
    /// Coordinate offset derived from the global seed, applied after the
    /// frequency division so different seeds sample disjoint noise regions.
    seed_offset: f32,
    /// Round the running height to a multiple of this after every octave
    /// (compounding block quantization), or None for smooth terrain.
    block_snap: Option<f32>,
    /// chunk_size / mesh span; converts world coordinates to local ones
    world_scale: f32,
}

impl HeightField {
    pub fn new(
        seed: u32,
        octaves: Vec<OctaveParams>,
        block_snap: Option<f32>,
        world_scale: f32,
    ) -> Self {
        Self {
            perlin: Perlin::new(seed),
            octaves,
            seed_offset: (seed % 100_000) as f32,
            block_snap,
            world_scale,
        }
    }

    /// Sample the height at a local (mesh-vertex-relative) coordinate.
    pub fn sample_local(&self, x: f32, z: f32) -> f32 {
        let mut y = 0.0f32;
        for octave in &self.octaves {
            if !octave.enabled {
                continue;
            }
            let xc = (x / octave.distance + self.seed_offset) as f64;
            let zc = (z / octave.distance + self.seed_offset) as f64;
            // Perlin returns [-1, 1]; remap to [0, 1] so amplitudes add up
            let noise = (self.perlin.get([xc, zc]) as f32 + 1.0) * 0.5;
            y += noise * octave.height;
            if let Some(block) = self.block_snap {
                y = (y / block).round() * block;
            }
        }
        y
    }

    /// Sample the height at a world coordinate.
    pub fn sample_world(&self, x: f32, z: f32) -> f32 {
        self.sample_local(x / self.world_scale, z / self.world_scale)
    }

    /// World-to-local horizontal scale factor.
    pub fn world_scale(&self) -> f32 {
        self.world_scale
    }
}
