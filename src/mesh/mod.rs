//! Chunk geometry buffers and mesh helpers

pub mod template;
pub use template::{MeshTemplate, TemplateCache, MESH_SPAN};

pub mod stitch;
pub use stitch::{SeamStitcher, EDGE_EPSILON};

use glam::{Vec2, Vec3};

use crate::streaming::chunk::GridCoord;

/// Owned geometry of one chunk.
#[derive(Clone, Debug, Default)]
pub struct MeshBuffers {
    /// Local-space vertex positions (y carries the sampled height)
    pub positions: Vec<Vec3>,
    /// Per-vertex UVs in 0..1
    pub uvs: Vec<Vec2>,
    /// Triangle indices, every 3 entries one triangle
    pub indices: Vec<u32>,
    /// Per-vertex linear RGB colors
    pub colors: Vec<[f32; 3]>,
}

impl MeshBuffers {
    pub fn clear(&mut self) {
        self.positions.clear();
        self.uvs.clear();
        self.indices.clear();
        self.colors.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Drawable-commit boundary.
///
/// The renderer binding implements this to replace a chunk's live geometry
/// and recompute derived collision/normal data. The engine only ever invokes
/// it from the scheduler context during [`apply`](crate::streaming::engine::TerrainEngine::apply).
pub trait SurfaceSink {
    fn commit(&mut self, coord: GridCoord, buffers: &MeshBuffers);
}

/// Area-weighted vertex normals for a triangle mesh.
///
/// Degenerate vertices (no incident triangles) get an up-facing normal.
pub fn compute_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        // Cross product magnitude is proportional to triangle area, so
        // summing unnormalized face normals area-weights the result.
        let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
        normals[a] += face;
        normals[b] += face;
        normals[c] += face;
    }

    for n in &mut normals {
        *n = n.normalize_or(Vec3::Y);
    }
    normals
}
