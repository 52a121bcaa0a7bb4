//! Chunk records, the spatial index, and the shared chunk store
//!
//! A chunk occupies exactly one integer grid cell. Chunks are created once
//! at startup (pool pre-allocation) and transition parked <-> active forever
//! after; they are never destroyed. Neighbor links are never stored on the
//! chunk - they are resolved through the spatial index on demand, which
//! keeps the records free of reference cycles.

use std::collections::HashMap;
use std::sync::Mutex;

use glam::Vec3;

use crate::decor::DecorInstance;
use crate::mesh::MeshBuffers;

/// Integer grid coordinate identifying one chunk cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridCoord {
    pub x: i32,
    pub z: i32,
}

/// Cardinal neighbor offsets in +x, -x, +z, -z order. The seam stitcher's
/// neighbor array uses the same ordering.
pub const NEIGHBOR_OFFSETS: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

impl GridCoord {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Snap a world position to its grid cell via `floor(coord / chunk_size)`.
    pub fn from_world(pos: Vec3, chunk_size: f32) -> Self {
        Self {
            x: (pos.x / chunk_size).floor() as i32,
            z: (pos.z / chunk_size).floor() as i32,
        }
    }

    /// World-space anchor of the chunk (y fixed at 0).
    pub fn anchor(&self, chunk_size: f32) -> Vec3 {
        Vec3::new(self.x as f32 * chunk_size, 0.0, self.z as f32 * chunk_size)
    }

    pub fn offset(&self, d: (i32, i32)) -> Self {
        Self { x: self.x + d.0, z: self.z + d.1 }
    }

    /// Chebyshev distance to another cell.
    pub fn grid_distance(&self, other: GridCoord) -> i32 {
        (self.x - other.x).abs().max((self.z - other.z).abs())
    }

    /// Mix the global seed with the coordinate into a per-chunk seed, so
    /// decorative placement is reproducible for a given seed and cell.
    pub fn seed_mix(&self, seed: u32) -> u32 {
        (self.x as u32)
            .wrapping_mul(374761393)
            .wrapping_add((self.z as u32).wrapping_mul(668265263))
            .wrapping_add(seed.wrapping_mul(1274126177))
    }
}

/// Stable handle to a chunk slot in the store.
pub type SlotId = usize;

/// Mutable chunk metadata.
#[derive(Debug)]
pub struct ChunkState {
    pub coord: GridCoord,
    /// Current LOD value (vertex spacing)
    pub lod: f32,
    /// Parked chunks are idle in the pool: no index entry, no decor
    pub parked: bool,
    /// Bumped on every release; queued jobs carry the generation they were
    /// created under and are skipped once it no longer matches
    pub generation: u64,
    /// Set while a queue slot references this chunk. A chunk is never
    /// referenced by both queues at once.
    pub in_flight: bool,
    /// Geometry must be fully recomputed (LOD changed or fresh checkout)
    pub force: bool,
    /// Decorative objects should be placed on the next apply
    pub wants_decor: bool,
    /// One bucket of placed decorative instances per configured layer
    pub decor: Vec<Vec<DecorInstance>>,
}

impl ChunkState {
    fn new(decor_layers: usize) -> Self {
        Self {
            coord: GridCoord::new(0, 0),
            lod: 0.0,
            parked: true,
            generation: 0,
            in_flight: false,
            force: false,
            wants_decor: false,
            decor: (0..decor_layers).map(|_| Vec::new()).collect(),
        }
    }

    pub fn decor_count(&self) -> usize {
        self.decor.iter().map(|bucket| bucket.len()).sum()
    }
}

/// One pre-allocated chunk slot. Metadata and geometry are locked
/// independently so the scheduler can inspect state while the worker fills
/// buffers; when both are needed, metadata is locked first.
pub struct ChunkSlot {
    pub meta: Mutex<ChunkState>,
    pub geometry: Mutex<MeshBuffers>,
}

/// Fixed set of chunk slots plus the spatial index mapping grid coordinates
/// to the active chunk occupying them.
pub struct ChunkStore {
    slots: Vec<ChunkSlot>,
    index: Mutex<HashMap<GridCoord, SlotId>>,
}

impl ChunkStore {
    /// Pre-allocate `capacity` slots, all parked.
    pub fn new(capacity: usize, decor_layers: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| ChunkSlot {
                meta: Mutex::new(ChunkState::new(decor_layers)),
                geometry: Mutex::new(MeshBuffers::default()),
            })
            .collect();
        Self {
            slots,
            index: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    pub fn slot(&self, id: SlotId) -> &ChunkSlot {
        &self.slots[id]
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Active chunk occupying a cell, if any.
    pub fn lookup(&self, coord: GridCoord) -> Option<SlotId> {
        self.index.lock().unwrap().get(&coord).copied()
    }

    /// Claim a cell for a slot. A non-parked chunk's coordinate is unique
    /// across the index; inserting over an existing entry is a logic error
    /// upstream and is logged rather than silently replacing.
    pub fn insert(&self, coord: GridCoord, slot: SlotId) {
        let previous = self.index.lock().unwrap().insert(coord, slot);
        if let Some(previous) = previous {
            log::error!(
                "spatial index collision at ({}, {}): slot {} replaced slot {}",
                coord.x,
                coord.z,
                slot,
                previous
            );
        }
    }

    pub fn remove(&self, coord: GridCoord) {
        self.index.lock().unwrap().remove(&coord);
    }

    pub fn active_count(&self) -> usize {
        self.index.lock().unwrap().len()
    }

    /// Snapshot of all active (coord, slot) pairs.
    pub fn active_entries(&self) -> Vec<(GridCoord, SlotId)> {
        self.index
            .lock()
            .unwrap()
            .iter()
            .map(|(coord, slot)| (*coord, *slot))
            .collect()
    }

    /// LOD of each cardinal neighbor of `coord` (+x, -x, +z, -z order),
    /// resolved through the index on demand. Parked or absent neighbors
    /// report None.
    pub fn neighbor_lods(&self, coord: GridCoord) -> [Option<f32>; 4] {
        let mut lods = [None; 4];
        for (i, offset) in NEIGHBOR_OFFSETS.iter().enumerate() {
            let Some(slot) = self.lookup(coord.offset(*offset)) else {
                continue;
            };
            let meta = self.slots[slot].meta.lock().unwrap();
            if !meta.parked {
                lods[i] = Some(meta.lod);
            }
        }
        lods
    }

    /// Whether a queued job still refers to live chunk state. False once the
    /// chunk was released back to the pool (generation bumped) - the consumer
    /// must skip the job rather than operate on recycled state.
    pub fn job_valid(&self, slot: SlotId, generation: u64) -> bool {
        let meta = self.slots[slot].meta.lock().unwrap();
        !meta.parked && meta.generation == generation
    }
}
