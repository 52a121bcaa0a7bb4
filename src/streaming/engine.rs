//! Streaming scheduler and engine context
//!
//! [`TerrainEngine`] is the single explicitly constructed object owning all
//! shared streaming state: the chunk store and spatial index, the pool, the
//! heightfield, the template cache, the decor manager, both work queues, and
//! the worker handle. The scheduler side (`update` / `apply`) runs on one
//! thread; the mesh worker is the only other execution context.

use std::sync::Arc;

use glam::Vec3;
use tokio::sync::mpsc;

use crate::core::error::Result;
use crate::decor::DecorManager;
use crate::mesh::template::{TemplateCache, MESH_SPAN};
use crate::mesh::{SeamStitcher, SurfaceSink};
use crate::streaming::chunk::{ChunkStore, GridCoord, SlotId};
use crate::streaming::config::EngineConfig;
use crate::streaming::lod::{lod_eq, LodResolver, LOD_EPSILON};
use crate::streaming::pool::ChunkPool;
use crate::streaming::worker::{generate_chunk_geometry, Job, JobKind, MeshWorker};
use crate::terrain::heightfield::HeightField;
use crate::terrain::palette::HeightPalette;

/// Read-mostly state shared between the scheduler and the mesh worker.
/// Everything mutable inside is behind the store's per-slot locks.
pub(crate) struct Shared {
    pub store: ChunkStore,
    pub height: HeightField,
    pub templates: TemplateCache,
    pub palette: HeightPalette,
    pub stitcher: SeamStitcher,
    pub chunk_size: f32,
    pub far_lod: f32,
}

/// The chunk streaming engine.
pub struct TerrainEngine {
    shared: Arc<Shared>,
    resolver: LodResolver,
    pool: ChunkPool,
    decor: DecorManager,
    reach: i32,
    apply_cap: usize,
    neighbor_depth: i32,
    /// Present in threaded mode; dropping it closes the worker's queue
    recompute_tx: Option<mpsc::UnboundedSender<Job>>,
    apply_tx: mpsc::UnboundedSender<Job>,
    apply_rx: mpsc::UnboundedReceiver<Job>,
    worker: Option<MeshWorker>,
    viewer_cell: Option<GridCoord>,
}

impl TerrainEngine {
    /// Validate the configuration, eagerly build all mesh templates (the
    /// one fatal startup failure class), pre-allocate the pool and store,
    /// and spawn the worker when threaded.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let templates = TemplateCache::build_all(&config.lod_presets, config.far_lod)?;
        let capacity = config.effective_pool_capacity();

        let shared = Arc::new(Shared {
            store: ChunkStore::new(capacity, config.decor_layers.len()),
            height: HeightField::new(
                config.seed,
                config.octaves.clone(),
                config.block_snap,
                config.chunk_size / MESH_SPAN,
            ),
            templates,
            palette: HeightPalette::new(config.palette.clone()),
            stitcher: SeamStitcher::new(config.fix_seams, config.far_lod),
            chunk_size: config.chunk_size,
            far_lod: config.far_lod,
        });

        let (apply_tx, apply_rx) = mpsc::unbounded_channel();
        let (recompute_tx, worker) = if config.threaded {
            let (tx, rx) = mpsc::unbounded_channel();
            let worker = MeshWorker::spawn(shared.clone(), rx, apply_tx.clone());
            (Some(tx), Some(worker))
        } else {
            (None, None)
        };

        log::info!(
            "terrain engine ready: {} pooled chunks, reach {}, {} mode",
            capacity,
            config.reach,
            if config.threaded { "threaded" } else { "inline" }
        );

        Ok(Self {
            shared,
            resolver: LodResolver::new(config.lod_presets, config.far_lod),
            pool: ChunkPool::new(capacity),
            decor: DecorManager::new(config.decor_layers, config.seed, config.chunk_size),
            reach: config.reach,
            apply_cap: config.apply_cap,
            neighbor_depth: config.neighbor_depth,
            recompute_tx,
            apply_tx,
            apply_rx,
            worker,
            viewer_cell: None,
        })
    }

    /// Per-tick viewer position update.
    ///
    /// Snaps the position to its grid cell and returns immediately when the
    /// cell has not changed - sub-cell jitter must not trigger the window
    /// scan. Otherwise releases out-of-reach chunks first (so the freed
    /// capacity is available in the same pass) and walks the streaming
    /// window, queueing regeneration or seam refreshes as needed.
    pub fn update(&mut self, viewer_pos: Vec3) {
        let cell = GridCoord::from_world(viewer_pos, self.shared.chunk_size);
        if self.viewer_cell == Some(cell) {
            return;
        }
        self.viewer_cell = Some(cell);
        log::debug!("viewer entered cell ({}, {})", cell.x, cell.z);

        self.reconcile(cell);

        for dx in -self.reach..=self.reach {
            for dz in -self.reach..=self.reach {
                let coord = cell.offset((dx, dz));
                let lod = self.resolver.resolve(dx, dz);
                match self.shared.store.lookup(coord) {
                    Some(slot) => self.refresh_active(slot, lod),
                    None => self.fill_cell(coord, lod),
                }
            }
        }
    }

    /// Release every active chunk farther than `reach` cells (Chebyshev)
    /// from the viewer cell back to the pool.
    fn reconcile(&mut self, cell: GridCoord) {
        let mut released = 0;
        for (coord, slot) in self.shared.store.active_entries() {
            if coord.grid_distance(cell) <= self.reach {
                continue;
            }
            self.release(coord, slot);
            released += 1;
        }
        if released > 0 {
            log::debug!("released {} out-of-reach chunks", released);
        }
    }

    fn release(&mut self, coord: GridCoord, slot: SlotId) {
        {
            let mut meta = self.shared.store.slot(slot).meta.lock().unwrap();
            self.decor.remove(&mut meta);
            meta.parked = true;
            meta.generation += 1;
            meta.in_flight = false;
            meta.force = false;
            meta.wants_decor = false;
        }
        self.shared.store.slot(slot).geometry.lock().unwrap().clear();
        self.shared.store.remove(coord);
        self.pool.release(slot);
    }

    /// Handle a window cell already occupied by an active chunk.
    fn refresh_active(&mut self, slot: SlotId, lod: f32) {
        enum Route {
            Apply(Job),
            Recompute(Job),
        }
        let route = {
            let mut meta = self.shared.store.slot(slot).meta.lock().unwrap();
            if lod_eq(meta.lod, lod) {
                // LOD unchanged. Near-band chunks still get a pass-through
                // refresh: a neighbor's LOD may have changed and the seams
                // must be looked at again.
                if self.shared.far_lod - lod > LOD_EPSILON && !meta.in_flight {
                    meta.in_flight = true;
                    Some(Route::Apply(Job {
                        slot,
                        generation: meta.generation,
                        kind: JobKind::Refresh,
                    }))
                } else {
                    None
                }
            } else {
                meta.lod = lod;
                meta.force = true;
                meta.wants_decor = true;
                if meta.in_flight {
                    // Already queued; the queued job re-reads the state at
                    // compute time and picks this change up
                    None
                } else {
                    meta.in_flight = true;
                    Some(Route::Recompute(Job {
                        slot,
                        generation: meta.generation,
                        kind: JobKind::Regenerate,
                    }))
                }
            }
        };
        match route {
            Some(Route::Apply(job)) => {
                let _ = self.apply_tx.send(job);
            }
            Some(Route::Recompute(job)) => self.enqueue(job),
            None => {}
        }
    }

    /// Handle an empty window cell: check a chunk out of the pool, position
    /// it, and queue it for full regeneration. Pool exhaustion leaves the
    /// cell unfilled without complaint.
    fn fill_cell(&mut self, coord: GridCoord, lod: f32) {
        let Some(slot) = self.pool.acquire() else {
            log::trace!("chunk pool exhausted, cell ({}, {}) left unfilled", coord.x, coord.z);
            return;
        };
        let job = {
            let mut meta = self.shared.store.slot(slot).meta.lock().unwrap();
            meta.coord = coord;
            meta.parked = false;
            meta.lod = lod;
            meta.force = true;
            meta.wants_decor = !lod_eq(lod, self.shared.far_lod);
            meta.in_flight = true;
            Job { slot, generation: meta.generation, kind: JobKind::Regenerate }
        };
        self.shared.store.insert(coord, slot);
        self.enqueue(job);
    }

    /// Route a full-regeneration job to the worker, or straight to the
    /// apply queue in inline mode.
    fn enqueue(&self, job: Job) {
        match &self.recompute_tx {
            Some(tx) => {
                if tx.send(job).is_err() {
                    log::error!("mesh worker queue closed; dropping job for slot {}", job.slot);
                }
            }
            None => {
                let _ = self.apply_tx.send(job);
            }
        }
    }

    /// Drain the apply queue, committing at most `apply_cap` chunks.
    ///
    /// Overflow stays queued for the next tick in FIFO order; nothing is
    /// lost, only deferred. All decorative placement/removal and every
    /// `sink.commit` happens here, on the caller's context. Returns the
    /// number of chunks committed.
    pub fn apply(&mut self, sink: &mut dyn SurfaceSink) -> usize {
        let shared = self.shared.clone();
        let inline = self.recompute_tx.is_none();
        let mut processed = 0;
        let mut committed = 0;

        while processed < self.apply_cap {
            let Ok(job) = self.apply_rx.try_recv() else {
                break;
            };
            processed += 1;
            let slot = shared.store.slot(job.slot);

            {
                let meta = slot.meta.lock().unwrap();
                if meta.parked || meta.generation != job.generation {
                    continue; // recycled while queued
                }
                if meta.force {
                    // The LOD changed while this entry waited or while the
                    // worker was computing it; its buffers no longer match
                    // the chunk's state. Send it back through the worker
                    // instead of committing stale geometry.
                    if let Some(tx) = &self.recompute_tx {
                        drop(meta);
                        let _ = tx.send(Job { kind: JobKind::Regenerate, ..job });
                        continue;
                    }
                    // Inline mode regenerates below either way
                }
            }

            if inline {
                generate_chunk_geometry(&shared, job.slot);
            }

            let coord = {
                let mut meta = slot.meta.lock().unwrap();
                if meta.parked || meta.generation != job.generation {
                    continue;
                }
                meta.in_flight = false;
                if lod_eq(meta.lod, shared.far_lod) {
                    self.decor.remove(&mut meta);
                } else if meta.wants_decor {
                    meta.wants_decor = false;
                    self.decor.place(&mut meta, &shared.height);
                }
                meta.coord
            };

            let geometry = slot.geometry.lock().unwrap();
            if !geometry.is_empty() {
                sink.commit(coord, &geometry);
                committed += 1;
            }
        }
        committed
    }

    /// Force one chunk's mesh to be recomputed, and queue seam refreshes
    /// for its active near-band neighbors within `neighbor_depth` rings.
    /// Returns false when no active chunk occupies the cell.
    pub fn regenerate_mesh(&mut self, coord: GridCoord) -> bool {
        let Some(slot) = self.shared.store.lookup(coord) else {
            return false;
        };
        let job = {
            let mut meta = self.shared.store.slot(slot).meta.lock().unwrap();
            meta.force = true;
            if meta.in_flight {
                None
            } else {
                meta.in_flight = true;
                Some(Job { slot, generation: meta.generation, kind: JobKind::Regenerate })
            }
        };
        if let Some(job) = job {
            self.enqueue(job);
        }

        for dx in -self.neighbor_depth..=self.neighbor_depth {
            for dz in -self.neighbor_depth..=self.neighbor_depth {
                if dx == 0 && dz == 0 {
                    continue;
                }
                let Some(nslot) = self.shared.store.lookup(coord.offset((dx, dz))) else {
                    continue;
                };
                let refresh = {
                    let mut meta = self.shared.store.slot(nslot).meta.lock().unwrap();
                    if self.shared.far_lod - meta.lod > LOD_EPSILON && !meta.in_flight {
                        meta.in_flight = true;
                        Some(Job {
                            slot: nslot,
                            generation: meta.generation,
                            kind: JobKind::Refresh,
                        })
                    } else {
                        None
                    }
                };
                if let Some(job) = refresh {
                    let _ = self.apply_tx.send(job);
                }
            }
        }
        true
    }

    /// Surface height at a world position (spawn placement helper).
    pub fn surface_height(&self, x: f32, z: f32) -> f32 {
        self.shared.height.sample_world(x, z)
    }

    pub fn active_chunks(&self) -> usize {
        self.shared.store.active_count()
    }

    pub fn pool_free(&self) -> usize {
        self.pool.free_count()
    }

    pub fn pool_capacity(&self) -> usize {
        self.pool.capacity()
    }

    pub fn viewer_cell(&self) -> Option<GridCoord> {
        self.viewer_cell
    }

    /// Entries waiting in the apply queue.
    pub fn pending_apply(&self) -> usize {
        self.apply_rx.len()
    }

    /// Current LOD of the active chunk at a cell.
    pub fn chunk_lod(&self, coord: GridCoord) -> Option<f32> {
        let slot = self.shared.store.lookup(coord)?;
        Some(self.shared.store.slot(slot).meta.lock().unwrap().lod)
    }

    /// Decorative instances currently placed on the active chunk at a cell.
    pub fn chunk_decor_count(&self, coord: GridCoord) -> Option<usize> {
        let slot = self.shared.store.lookup(coord)?;
        Some(self.shared.store.slot(slot).meta.lock().unwrap().decor_count())
    }

    /// Free instances remaining in a decor layer's pool.
    pub fn decor_free_count(&self, layer: usize) -> usize {
        self.decor.free_count(layer)
    }

    /// Stop and join the worker, then leave the queues to drop with the
    /// engine. Closing the recompute channel before joining guarantees the
    /// worker's receive loop terminates.
    pub fn shutdown(&mut self) {
        self.recompute_tx = None;
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
    }
}

impl Drop for TerrainEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
