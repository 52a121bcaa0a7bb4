//! Precomputed mesh topology per LOD value
//!
//! A chunk mesh's topology (vertex grid, UVs, triangle indices) depends only
//! on its LOD value, never on its position, so one flat template per distinct
//! LOD is built eagerly at startup and shared read-only with the worker.

use glam::{Vec2, Vec3};

use crate::core::error::{Error, Result};
use crate::streaming::lod::{lod_eq, LodPreset};

/// Local-space footprint of every chunk mesh before world scaling.
/// The world scale factor for a chunk is `chunk_size / MESH_SPAN`.
pub const MESH_SPAN: f32 = 10.0;

/// Flat, height-less vertex/UV/triangle topology for one LOD value.
///
/// Vertices form a `side x side` grid at spacing `lod`, laid out x-major
/// (flat index = `x * side + z`). Triangles wind clockwise seen from +y.
#[derive(Clone, Debug)]
pub struct MeshTemplate {
    pub lod: f32,
    /// Vertices per axis
    pub side: usize,
    pub positions: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl MeshTemplate {
    /// Build the template for one LOD value (the spacing between sampled
    /// vertices within the fixed [`MESH_SPAN`] footprint).
    ///
    /// Degenerate LOD values are the one fatal startup-time failure class:
    /// anything non-finite, non-positive, or too coarse to produce at least
    /// a 2x2 vertex grid is rejected with [`Error::Config`].
    pub fn build(lod: f32) -> Result<Self> {
        if !lod.is_finite() || lod <= 0.0 {
            return Err(Error::Config(format!(
                "LOD value {} is not a positive finite number",
                lod
            )));
        }

        let span = MESH_SPAN + lod;
        let side = (span / lod) as usize;
        if side < 2 {
            return Err(Error::Config(format!(
                "LOD value {} produces a degenerate {}x{} vertex grid (need at least 2x2)",
                lod, side, side
            )));
        }

        let mut positions = Vec::with_capacity(side * side);
        let mut uvs = Vec::with_capacity(side * side);
        for xi in 0..side {
            for zi in 0..side {
                let x = xi as f32 * lod;
                let z = zi as f32 * lod;
                positions.push(Vec3::new(x, 0.0, z));
                uvs.push(Vec2::new(x / span, z / span));
            }
        }

        // Two clockwise triangles per quad
        let w = side as u32;
        let mut indices = Vec::with_capacity((side - 1) * (side - 1) * 6);
        for x in 1..w {
            for z in 1..w {
                indices.push(w * x + z); // top right
                indices.push(w * x + (z - 1)); // bottom right
                indices.push(w * (x - 1) + (z - 1)); // bottom left

                indices.push(w * (x - 1) + (z - 1)); // bottom left
                indices.push(w * (x - 1) + z); // top left
                indices.push(w * x + z); // top right
            }
        }

        Ok(Self { lod, side, positions, uvs, indices })
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Startup-built store of one template per distinct LOD value.
///
/// LOD identity is tolerance-based (values arrive as floating-point
/// configuration), so lookup scans a small list instead of hashing.
/// Immutable once built; shared read-only with the worker thread.
#[derive(Debug, Default)]
pub struct TemplateCache {
    templates: Vec<MeshTemplate>,
}

impl TemplateCache {
    /// Eagerly build templates for every enabled preset plus the far LOD.
    /// Must run before any streaming begins.
    pub fn build_all(presets: &[LodPreset], far_lod: f32) -> Result<Self> {
        let mut cache = Self::default();
        for preset in presets {
            if !preset.enabled {
                continue;
            }
            cache.insert(preset.lod)?;
        }
        cache.insert(far_lod)?;
        log::debug!(
            "built {} mesh templates ({} vertices total)",
            cache.templates.len(),
            cache.templates.iter().map(|t| t.vertex_count()).sum::<usize>()
        );
        Ok(cache)
    }

    /// Build and store the template for `lod` unless one already exists.
    /// Idempotent: an existing entry is never rebuilt.
    pub fn insert(&mut self, lod: f32) -> Result<()> {
        if self.get(lod).is_some() {
            return Ok(());
        }
        self.templates.push(MeshTemplate::build(lod)?);
        Ok(())
    }

    /// Look up the template for a LOD value (tolerance comparison).
    pub fn get(&self, lod: f32) -> Option<&MeshTemplate> {
        self.templates.iter().find(|t| lod_eq(t.lod, lod))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
