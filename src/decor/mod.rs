//! Pooled decorative object placement
//!
//! Decorative instances (vegetation, props) live in fixed per-layer pools
//! mirroring the chunk pool's reuse semantics: nothing is allocated during
//! streaming, and an exhausted layer simply stops placing. Placement is
//! seeded from the global seed mixed with the chunk coordinate, so a given
//! seed always decorates a given cell identically.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::streaming::chunk::ChunkState;
use crate::terrain::heightfield::HeightField;

/// Configuration for one decorative layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecorLayerConfig {
    pub name: String,
    /// Candidates below this surface height are discarded
    pub min_height: f32,
    /// Candidates at or above this surface height are discarded (exclusive)
    pub max_height: f32,
    /// Candidate positions drawn per chunk
    pub per_chunk: usize,
    /// Fixed pool size for this layer
    pub pool_size: usize,
    pub enabled: bool,
}

/// One placed instance. `id` identifies the pooled object the renderer
/// binding should move to `position`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecorInstance {
    pub position: Vec3,
    pub layer: usize,
    pub id: u32,
}

/// Small deterministic random stream for placement candidates.
struct PlacementRng {
    state: u32,
}

impl PlacementRng {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in [0, 1].
    fn next_f32(&mut self) -> f32 {
        self.state = self.state.wrapping_mul(747796405).wrapping_add(2891336453);
        let mut h = self.state;
        h = (h ^ (h >> 13)).wrapping_mul(1103515245);
        h ^= h >> 16;
        (h & 0x7FFF_FFFF) as f32 / 0x7FFF_FFFF_u32 as f32
    }

    /// Next value in [min, max).
    fn next_range(&mut self, min: f32, max: f32) -> f32 {
        self.next_f32() * (max - min) + min
    }
}

/// Owns the per-layer instance pools and fills/clears chunk decor buckets.
///
/// All placement and removal runs on the scheduler context only.
pub struct DecorManager {
    layers: Vec<DecorLayerConfig>,
    /// Free instance ids per layer
    free: Vec<Vec<u32>>,
    seed: u32,
    chunk_size: f32,
}

impl DecorManager {
    pub fn new(layers: Vec<DecorLayerConfig>, seed: u32, chunk_size: f32) -> Self {
        let free = layers
            .iter()
            .map(|layer| (0..layer.pool_size as u32).rev().collect())
            .collect();
        Self { layers, free, seed, chunk_size }
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn free_count(&self, layer: usize) -> usize {
        self.free[layer].len()
    }

    /// Place decorative objects on a chunk.
    ///
    /// Draws `per_chunk` candidate XZ positions per enabled layer from the
    /// chunk-seeded stream, keeps those whose surface height falls inside
    /// the layer's band, and checks instances out of the layer pool until it
    /// runs dry. Layers whose bucket is already populated are skipped, so
    /// re-placing without an intervening removal is a no-op.
    pub fn place(&mut self, meta: &mut ChunkState, height: &HeightField) {
        let anchor = meta.coord.anchor(self.chunk_size);
        let mut rng = PlacementRng::new(meta.coord.seed_mix(self.seed));

        for (li, layer) in self.layers.iter().enumerate() {
            if !layer.enabled || !meta.decor[li].is_empty() {
                continue;
            }
            for _ in 0..layer.per_chunk {
                // Draw both coordinates unconditionally so the stream stays
                // aligned regardless of how many candidates are kept
                let x = rng.next_range(anchor.x, anchor.x + self.chunk_size);
                let z = rng.next_range(anchor.z, anchor.z + self.chunk_size);
                let y = height.sample_world(x, z);
                if y < layer.min_height || y >= layer.max_height {
                    continue;
                }
                let Some(id) = self.free[li].pop() else {
                    log::debug!("decor layer '{}' pool exhausted", layer.name);
                    break;
                };
                meta.decor[li].push(DecorInstance {
                    position: Vec3::new(x, y, z),
                    layer: li,
                    id,
                });
            }
        }
    }

    /// Return every instance on the chunk to its layer pool and clear the
    /// buckets. Runs on far-LOD apply and on chunk release; afterwards the
    /// (soon to be) parked chunk holds no instances.
    pub fn remove(&mut self, meta: &mut ChunkState) {
        for (li, bucket) in meta.decor.iter_mut().enumerate() {
            for instance in bucket.drain(..) {
                self.free[li].push(instance.id);
            }
        }
    }
}
