//! Seam stitching between chunks of different LOD
//!
//! Where a fine chunk borders a coarser neighbor, the fine mesh has border
//! vertices the coarse mesh does not sample. Left alone those vertices crack
//! the surface open; the fix replaces each one with the average of the two
//! coarse-aligned samples bounding it, so the fine edge matches the coarse
//! edge exactly at shared sample points and interpolates linearly between.
//!
//! Corrections write only midpoint (odd-aligned) border vertices and read
//! only coarse-aligned (even) ones, so the pass is idempotent: re-running
//! with the same neighbor state reproduces the same heights.

use glam::Vec3;

use crate::streaming::lod::LOD_EPSILON;

/// Tolerance for the float-modulo edge membership test. Vertex-index-derived
/// fractional positions are compared against a row-width threshold rather
/// than for exact equality.
pub const EDGE_EPSILON: f32 = 1e-3;

/// Flat position sits at the start of an even row (z == 0, even x).
fn at_row_start(fi: f32, width: f32) -> bool {
    fi % (width * 2.0) < EDGE_EPSILON
}

/// Flat position sits at the end of an odd row (z == side-1, odd x).
fn at_row_end(fi: f32, width: f32) -> bool {
    (fi % (width * 2.0) - (width * 2.0 - 1.0)).abs() < EDGE_EPSILON
}

/// Post-processes freshly sampled chunk heights against the four grid
/// neighbors' LOD levels. Neighbor order is +x, -x, +z, -z.
#[derive(Clone, Copy, Debug)]
pub struct SeamStitcher {
    pub enabled: bool,
    pub far_lod: f32,
}

impl SeamStitcher {
    pub fn new(enabled: bool, far_lod: f32) -> Self {
        Self { enabled, far_lod }
    }

    /// Apply seam corrections in place.
    ///
    /// `verts` is the chunk's x-major `side x side` vertex grid with sampled
    /// heights in `y`. `neighbors` holds the LOD of each adjacent active
    /// chunk (+x, -x, +z, -z), or None where no neighbor exists - a missing
    /// neighbor simply skips that edge. Only strictly coarser neighbors
    /// (larger LOD beyond tolerance) trigger a correction.
    pub fn stitch(&self, verts: &mut [Vec3], side: usize, lod: f32, neighbors: &[Option<f32>; 4]) {
        if !self.enabled {
            return;
        }
        // Runs only for LODs strictly finer than the far LOD
        if self.far_lod - lod <= LOD_EPSILON {
            return;
        }
        let len = verts.len();
        if side < 2 || len != side * side {
            log::warn!(
                "stitch skipped: vertex count {} does not match side {}",
                len,
                side
            );
            return;
        }

        let coarser = |n: &Option<f32>| n.map_or(false, |nl| nl - lod > LOD_EPSILON);
        let width = side as f32;

        for i in 1..len {
            let fi = i as f32;

            // -z edge: flat index a multiple of two rows puts the vertex at
            // z == 0 on an even x row; the odd row between it and the
            // previous even row gets the midpoint height.
            if coarser(&neighbors[3]) && at_row_start(fi, width) {
                let two_rows = side * 2;
                if i >= two_rows {
                    let mid = i - side;
                    verts[mid].y = (verts[i - two_rows].y + verts[i].y) / 2.0;
                }
            }

            // -x edge: first row, even z
            if coarser(&neighbors[1]) && i < side && i % 2 == 0 {
                verts[i - 1].y = (verts[i - 2].y + verts[i].y) / 2.0;
            }

            // +x edge: last row, even z; the explicit z >= 2 check keeps the
            // read window inside the row
            if coarser(&neighbors[0]) && i + side > len && i % 2 == 0 && i % side >= 2 {
                verts[i - 1].y = (verts[i - 2].y + verts[i].y) / 2.0;
            }

            // +z edge: z == side-1 on an odd x row; this vertex is itself the
            // midpoint between the even rows either side of it. The bounds
            // check skips the correction when the next row does not exist
            // instead of reading past the buffer.
            if coarser(&neighbors[2]) && at_row_end(fi, width) {
                if i + side < len {
                    verts[i].y = (verts[i - side].y + verts[i + side].y) / 2.0;
                }
            }
        }
    }

    /// Whether a chunk at `lod` would receive any stitching at all.
    pub fn applies_to(&self, lod: f32) -> bool {
        self.enabled && self.far_lod - lod > LOD_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PX: usize = 0;
    const NX: usize = 1;
    const PZ: usize = 2;
    const NZ: usize = 3;

    /// x-major grid with heights nonlinear along both axes, so a midpoint
    /// never happens to equal the average of its bounding samples
    fn grid(side: usize) -> Vec<Vec3> {
        let mut verts = Vec::with_capacity(side * side);
        for x in 0..side {
            for z in 0..side {
                let h = (x * side + z) as f32 * 0.37 + (x as f32).sin() + (z as f32 * 1.3).sin();
                verts.push(Vec3::new(x as f32, h, z as f32));
            }
        }
        verts
    }

    fn none() -> [Option<f32>; 4] {
        [None, None, None, None]
    }

    #[test]
    fn test_missing_neighbors_change_nothing() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let mut verts = grid(6);
        let before = verts.clone();
        stitcher.stitch(&mut verts, 6, 2.0, &none());
        assert_eq!(verts, before);
    }

    #[test]
    fn test_px_edge_midpoints_averaged() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let side = 6;
        let mut verts = grid(side);
        let before = verts.clone();

        let mut neighbors = none();
        neighbors[PX] = Some(5.0); // coarser than lod 2
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);
        assert_ne!(verts, before, "edge correction must move at least one vertex");

        // Last row: odd-z vertices between even-z samples become averages
        let row = (side - 1) * side;
        for z in (2..side).step_by(2) {
            let expected = (before[row + z - 2].y + before[row + z].y) / 2.0;
            assert!((verts[row + z - 1].y - expected).abs() < 1e-6);
        }
        // Even-z samples on the edge are untouched
        for z in (0..side).step_by(2) {
            assert_eq!(verts[row + z].y, before[row + z].y);
        }
        // Interior rows untouched
        for i in 0..row {
            assert_eq!(verts[i], before[i]);
        }
    }

    #[test]
    fn test_nx_edge_midpoints_averaged() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let side = 6;
        let mut verts = grid(side);
        let before = verts.clone();

        let mut neighbors = none();
        neighbors[NX] = Some(5.0);
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);
        assert_ne!(verts, before, "edge correction must move at least one vertex");

        for z in (2..side).step_by(2) {
            let expected = (before[z - 2].y + before[z].y) / 2.0;
            assert!((verts[z - 1].y - expected).abs() < 1e-6);
        }
        // Everything past the first row untouched
        for i in side..side * side {
            assert_eq!(verts[i], before[i]);
        }
    }

    #[test]
    fn test_nz_edge_midpoints_averaged() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let side = 6;
        let mut verts = grid(side);
        let before = verts.clone();

        let mut neighbors = none();
        neighbors[NZ] = Some(5.0);
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);

        // Odd x rows at z == 0 between even x rows become averages
        for x in (2..side).step_by(2) {
            let expected = (before[(x - 2) * side].y + before[x * side].y) / 2.0;
            assert!((verts[(x - 1) * side].y - expected).abs() < 1e-6);
        }
        // z > 0 columns untouched
        for x in 0..side {
            for z in 1..side {
                assert_eq!(verts[x * side + z], before[x * side + z]);
            }
        }
    }

    #[test]
    fn test_pz_edge_midpoints_averaged() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let side = 6;
        let mut verts = grid(side);
        let before = verts.clone();

        let mut neighbors = none();
        neighbors[PZ] = Some(5.0);
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);

        // Odd x vertices at z == side-1 (except the last row, which has no
        // row beyond it) become averages of their even-x neighbors
        let z = side - 1;
        for x in (1..side - 1).step_by(2) {
            let expected = (before[(x - 1) * side + z].y + before[(x + 1) * side + z].y) / 2.0;
            assert!((verts[x * side + z].y - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_idempotent_with_same_neighbor_state() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let side = 6;
        let mut verts = grid(side);
        let neighbors = [Some(10.0), Some(5.0), Some(10.0), Some(5.0)];

        stitcher.stitch(&mut verts, side, 2.0, &neighbors);
        let once = verts.clone();
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);
        assert_eq!(verts, once);
    }

    #[test]
    fn test_only_strictly_coarser_neighbors_trigger() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let side = 6;

        // Equal LOD within tolerance: suppressed
        let mut verts = grid(side);
        let before = verts.clone();
        let mut neighbors = none();
        neighbors[PX] = Some(2.0 + LOD_EPSILON / 2.0);
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);
        assert_eq!(verts, before);

        // Finer neighbor: suppressed
        let mut verts = grid(side);
        neighbors[PX] = Some(1.25);
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);
        assert_eq!(verts, before);

        // Coarser beyond tolerance: applied
        let mut verts = grid(side);
        neighbors[PX] = Some(2.001);
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);
        assert_ne!(verts, before);
    }

    #[test]
    fn test_far_lod_chunk_is_never_stitched() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let mut verts = grid(2);
        let before = verts.clone();
        let neighbors = [Some(20.0), Some(20.0), Some(20.0), Some(20.0)];
        stitcher.stitch(&mut verts, 2, 10.0, &neighbors);
        assert_eq!(verts, before);
        assert!(!stitcher.applies_to(10.0));
        assert!(stitcher.applies_to(2.0));
    }

    #[test]
    fn test_disabled_stitcher_is_a_noop() {
        let stitcher = SeamStitcher::new(false, 10.0);
        let mut verts = grid(6);
        let before = verts.clone();
        let neighbors = [Some(10.0), Some(10.0), Some(10.0), Some(10.0)];
        stitcher.stitch(&mut verts, 6, 2.0, &neighbors);
        assert_eq!(verts, before);
    }

    #[test]
    fn test_in_bounds_for_all_template_sides() {
        // All four neighbors coarse on every realistic grid size; the pass
        // must never index outside the vertex buffer.
        let stitcher = SeamStitcher::new(true, 10.0);
        let neighbors = [Some(10.0), Some(10.0), Some(10.0), Some(10.0)];
        for side in 2..=17 {
            let mut verts = grid(side);
            stitcher.stitch(&mut verts, side, 1.0, &neighbors);
            assert_eq!(verts.len(), side * side);
        }
    }

    #[test]
    fn test_corners_never_written() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let side = 6;
        let mut verts = grid(side);
        let before = verts.clone();
        let neighbors = [Some(10.0), Some(10.0), Some(10.0), Some(10.0)];
        stitcher.stitch(&mut verts, side, 2.0, &neighbors);

        for corner in [0, side - 1, (side - 1) * side, side * side - 1] {
            assert_eq!(verts[corner], before[corner], "corner {} modified", corner);
        }
    }

    #[test]
    fn test_edge_membership_is_tolerant_not_exact() {
        let width = 6.0;

        // Exact integer positions
        assert!(at_row_start(0.0, width));
        assert!(at_row_start(12.0, width));
        assert!(!at_row_start(13.0, width));
        assert!(at_row_end(11.0, width));
        assert!(at_row_end(23.0, width));
        assert!(!at_row_end(22.0, width));

        // Positions within the tolerance of a row boundary still qualify
        assert!(at_row_start(12.0004, width));
        assert!(at_row_end(10.9996, width));
        assert!(at_row_end(11.0004, width));

        // Beyond the tolerance they do not
        assert!(!at_row_start(12.002, width));
        assert!(!at_row_end(11.002, width));
    }

    #[test]
    fn test_mismatched_buffer_is_skipped() {
        let stitcher = SeamStitcher::new(true, 10.0);
        let mut verts = grid(6);
        verts.truncate(30); // wrong length for side 6
        let before = verts.clone();
        let neighbors = [Some(10.0), None, None, None];
        stitcher.stitch(&mut verts, 6, 2.0, &neighbors);
        assert_eq!(verts, before);
    }
}
