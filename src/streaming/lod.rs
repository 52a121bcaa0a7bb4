//! LOD preset resolution by grid offset from the viewer
//!
//! LOD values arrive as floating-point configuration, so all LOD identity
//! checks in the engine go through [`lod_eq`] (tolerance comparison) rather
//! than exact equality.

use serde::{Deserialize, Serialize};

/// Tolerance for treating two LOD values as the same level. Governs the
/// regeneration-skip check, far-LOD checks, and template cache identity.
pub const LOD_EPSILON: f32 = 1e-4;

/// Compare two LOD values for equality within [`LOD_EPSILON`].
#[inline]
pub fn lod_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < LOD_EPSILON
}

/// One entry in the ordered LOD preset list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LodPreset {
    /// Vertex spacing for chunks inside this range (larger = coarser)
    pub lod: f32,
    /// Square radius in grid cells; matches offsets with `|offset| < range`
    pub range: i32,
    /// Disabled presets are skipped during resolution
    pub enabled: bool,
}

/// Resolves a chunk's LOD from its grid offset to the viewer.
///
/// Resolution order is list order: the first enabled preset whose square
/// range strictly contains both offsets wins. Offsets outside every preset
/// resolve to the far LOD. The result depends only on the offsets and the
/// static configuration.
#[derive(Clone, Debug)]
pub struct LodResolver {
    presets: Vec<LodPreset>,
    far_lod: f32,
}

impl LodResolver {
    pub fn new(presets: Vec<LodPreset>, far_lod: f32) -> Self {
        Self { presets, far_lod }
    }

    /// LOD for a chunk `(dx, dz)` whole grid cells from the viewer's chunk.
    pub fn resolve(&self, dx: i32, dz: i32) -> f32 {
        for preset in &self.presets {
            if !preset.enabled {
                continue;
            }
            if dx < preset.range
                && dz < preset.range
                && dx > -preset.range
                && dz > -preset.range
            {
                return preset.lod;
            }
        }
        self.far_lod
    }

    pub fn far_lod(&self) -> f32 {
        self.far_lod
    }

    pub fn presets(&self) -> &[LodPreset] {
        &self.presets
    }
}
