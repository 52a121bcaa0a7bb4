//! Background mesh worker
//!
//! One long-lived thread pulls chunks off the recompute queue, runs the
//! expensive heightfield sampling and seam stitching, and hands the finished
//! chunk to the apply queue. The receive blocks while the queue is empty
//! rather than spinning, so an idle worker costs nothing.
//!
//! Jobs move recompute -> worker -> apply by value; whichever side holds the
//! job is the only side allowed to mutate the chunk it references, and a
//! chunk is never referenced by both queues at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;

use crate::mesh::template::MESH_SPAN;
use crate::streaming::chunk::SlotId;
use crate::streaming::engine::Shared;

/// What a queued chunk needs done.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JobKind {
    /// Full heightfield sampling + stitching (LOD changed or fresh checkout)
    Regenerate,
    /// Pass-through neighbor/seam refresh; geometry is recommitted as-is
    /// (recomputed inline when no worker is configured)
    Refresh,
}

/// One work queue entry. Carries the generation the chunk had when the job
/// was created; consumers skip the job once the chunk has been recycled.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Job {
    pub slot: SlotId,
    pub generation: u64,
    pub kind: JobKind,
}

/// Handle to the background mesh worker thread.
pub struct MeshWorker {
    handle: thread::JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl MeshWorker {
    /// Spawn the worker. It owns the recompute receiver and exits when the
    /// sending side closes, after draining whatever is queued.
    pub(crate) fn spawn(
        shared: Arc<Shared>,
        recompute_rx: mpsc::UnboundedReceiver<Job>,
        apply_tx: mpsc::UnboundedSender<Job>,
    ) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let handle = thread::Builder::new()
            .name("mesh-worker".to_string())
            .spawn(move || worker_loop(shared, recompute_rx, apply_tx, stop_flag))
            .expect("failed to spawn mesh worker thread");
        Self { handle, stop }
    }

    /// Stop the worker and wait for it. The stop flag makes any still-queued
    /// jobs drain cheaply, so shutdown latency is bounded by at most one
    /// in-flight computation.
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        if self.handle.join().is_err() {
            log::error!("mesh worker thread panicked");
        }
    }
}

fn worker_loop(
    shared: Arc<Shared>,
    mut recompute_rx: mpsc::UnboundedReceiver<Job>,
    apply_tx: mpsc::UnboundedSender<Job>,
    stop: Arc<AtomicBool>,
) {
    log::debug!("mesh worker started");
    // blocking_recv returns None once the channel is closed and drained
    while let Some(job) = recompute_rx.blocking_recv() {
        if stop.load(Ordering::Relaxed) {
            continue;
        }
        if !shared.store.job_valid(job.slot, job.generation) {
            log::trace!("skipping job for recycled slot {}", job.slot);
            continue;
        }
        generate_chunk_geometry(&shared, job.slot);
        if apply_tx.send(job).is_err() {
            // Apply side torn down; nothing left to do
            break;
        }
    }
    log::debug!("mesh worker stopped");
}

/// Sample the heightfield over the chunk's template vertices, color them,
/// stitch seams against the current neighbor LODs, and store the finished
/// buffers in the chunk's geometry slot.
///
/// Runs on the worker thread, or inline on the scheduler context when no
/// worker is configured. The metadata lock is held only briefly; the
/// geometry lock is taken last and never together with a neighbor's.
pub(crate) fn generate_chunk_geometry(shared: &Shared, slot: SlotId) {
    let (coord, lod) = {
        let mut meta = shared.store.slot(slot).meta.lock().unwrap();
        if meta.parked {
            return;
        }
        // Latest state wins: the LOD is re-read here, so a job queued before
        // a later LOD change computes the newer level
        meta.force = false;
        (meta.coord, meta.lod)
    };

    let Some(template) = shared.templates.get(lod) else {
        log::warn!("no mesh template for LOD {}, chunk ({}, {})", lod, coord.x, coord.z);
        return;
    };

    let scale = shared.chunk_size / MESH_SPAN;
    let anchor = coord.anchor(shared.chunk_size);
    let neighbors = shared.store.neighbor_lods(coord);

    let mut positions = template.positions.clone();
    for v in &mut positions {
        let x = v.x + anchor.x / scale;
        let z = v.z + anchor.z / scale;
        v.y = shared.height.sample_local(x, z);
    }

    shared.stitcher.stitch(&mut positions, template.side, lod, &neighbors);

    let colors: Vec<[f32; 3]> = positions.iter().map(|v| shared.palette.color_at(v.y)).collect();

    let mut geometry = shared.store.slot(slot).geometry.lock().unwrap();
    geometry.positions = positions;
    geometry.uvs = template.uvs.clone();
    geometry.indices = template.indices.clone();
    geometry.colors = colors;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::template::TemplateCache;
    use crate::mesh::SeamStitcher;
    use crate::streaming::chunk::{ChunkStore, GridCoord};
    use crate::streaming::lod::LodPreset;
    use crate::terrain::heightfield::{HeightField, OctaveParams};
    use crate::terrain::palette::{HeightPalette, PaletteConfig};
    use std::time::Duration;

    fn shared(chunk_size: f32, capacity: usize) -> Arc<Shared> {
        let presets = vec![LodPreset { lod: 2.0, range: 1, enabled: true }];
        Arc::new(Shared {
            store: ChunkStore::new(capacity, 0),
            height: HeightField::new(
                42,
                vec![OctaveParams { distance: 50.0, height: 10.0, enabled: true }],
                None,
                chunk_size / MESH_SPAN,
            ),
            templates: TemplateCache::build_all(&presets, 10.0).unwrap(),
            palette: HeightPalette::new(PaletteConfig::default()),
            stitcher: SeamStitcher::new(true, 10.0),
            chunk_size,
            far_lod: 10.0,
        })
    }

    fn activate(shared: &Shared, slot: SlotId, coord: GridCoord, lod: f32) {
        let mut meta = shared.store.slot(slot).meta.lock().unwrap();
        meta.parked = false;
        meta.coord = coord;
        meta.lod = lod;
        drop(meta);
        shared.store.insert(coord, slot);
    }

    #[test]
    fn test_generate_fills_buffers_from_template() {
        let shared = shared(16.0, 2);
        activate(&shared, 0, GridCoord::new(0, 0), 2.0);

        generate_chunk_geometry(&shared, 0);

        let geometry = shared.store.slot(0).geometry.lock().unwrap();
        assert_eq!(geometry.positions.len(), 36); // side 6 at lod 2
        assert_eq!(geometry.colors.len(), 36);
        assert_eq!(geometry.indices.len(), 5 * 5 * 6);
        // Heights came from the sampler, not the flat template
        assert!(geometry.positions.iter().any(|v| v.y != 0.0));
    }

    #[test]
    fn test_generate_clears_force_flag() {
        let shared = shared(16.0, 2);
        activate(&shared, 0, GridCoord::new(1, 1), 10.0);
        shared.store.slot(0).meta.lock().unwrap().force = true;

        generate_chunk_geometry(&shared, 0);
        assert!(!shared.store.slot(0).meta.lock().unwrap().force);
    }

    #[test]
    fn test_generate_skips_parked_chunk() {
        let shared = shared(16.0, 2);
        generate_chunk_geometry(&shared, 0); // slot 0 is parked
        assert!(shared.store.slot(0).geometry.lock().unwrap().is_empty());
    }

    #[test]
    fn test_worker_processes_valid_and_skips_recycled_jobs() {
        let shared = shared(16.0, 2);
        activate(&shared, 0, GridCoord::new(0, 0), 2.0);
        activate(&shared, 1, GridCoord::new(1, 0), 2.0);
        shared.store.slot(1).meta.lock().unwrap().generation = 5;

        let (recompute_tx, recompute_rx) = mpsc::unbounded_channel();
        let (apply_tx, mut apply_rx) = mpsc::unbounded_channel();
        let worker = MeshWorker::spawn(shared.clone(), recompute_rx, apply_tx);

        recompute_tx
            .send(Job { slot: 0, generation: 0, kind: JobKind::Regenerate })
            .unwrap();
        // Stale generation: must be skipped, never forwarded
        recompute_tx
            .send(Job { slot: 1, generation: 3, kind: JobKind::Regenerate })
            .unwrap();
        drop(recompute_tx);

        // Wait for the forwarded job before shutting down; setting the stop
        // flag first would let the worker skip the backlog entirely
        let forwarded = apply_rx.blocking_recv().expect("valid job should reach the apply queue");
        assert_eq!(forwarded.slot, 0);
        worker.shutdown();
        assert!(apply_rx.try_recv().is_err(), "stale job must not be forwarded");
        assert!(!shared.store.slot(0).geometry.lock().unwrap().is_empty());
        assert!(shared.store.slot(1).geometry.lock().unwrap().is_empty());
    }

    #[test]
    fn test_worker_shutdown_is_prompt_with_backlog() {
        let shared = shared(16.0, 2);
        activate(&shared, 0, GridCoord::new(0, 0), 2.0);

        let (recompute_tx, recompute_rx) = mpsc::unbounded_channel();
        let (apply_tx, _apply_rx) = mpsc::unbounded_channel();
        let worker = MeshWorker::spawn(shared, recompute_rx, apply_tx);

        for _ in 0..10_000 {
            recompute_tx
                .send(Job { slot: 0, generation: 0, kind: JobKind::Regenerate })
                .unwrap();
        }
        drop(recompute_tx);

        let start = std::time::Instant::now();
        worker.shutdown();
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
