//! Surface voxelization
//!
//! Converts a closed (or near-closed) triangulated surface into a boolean
//! occupancy volume on a voxel grid. Input points are continuous coordinates
//! in voxel-index space with voxel centers at integer coordinates.
//!
//! Coverage rule: voxel (i, j, k) is marked occupied iff its center lies
//! inside the surface, determined by even-odd (parity) counting. The mesh is
//! cut by the plane z = k into 2D segments, each integer row y = j collects
//! the x-crossings of those segments, and voxel centers between successive
//! crossing pairs are filled. A lone open triangle bounds no volume and
//! therefore covers nothing.
//!
//! Each slice is a pure function of the (shared, immutable) points and
//! polygons, so the multi-threaded mode produces bit-identical results to
//! the single-threaded one.

mod fill;
mod slice;

use log::debug;
use rayon::prelude::*;

use crate::volume::OccupancyVolume;
use crate::AnatError;

use fill::fill_slice;
use slice::slice_segments;

/// Rasterize a triangulated surface into a boolean volume of `shape`.
///
/// `points` are continuous voxel-space coordinates; `center` is an
/// additional translation applied to every point before rasterization
/// (pass `(0.0, 0.0, 0.0)` when the points are already aligned to the
/// grid). When `parallel` is set, slices are distributed across a rayon
/// thread pool.
///
/// Fails with `DimensionMismatch` if a polygon references a missing point.
pub fn voxelize(
    points: &[[f64; 3]],
    polys: &[[usize; 3]],
    shape: (usize, usize, usize),
    center: [f64; 3],
    parallel: bool,
) -> Result<OccupancyVolume, AnatError> {
    let n = points.len();
    for (t, poly) in polys.iter().enumerate() {
        for &idx in poly {
            if idx >= n {
                return Err(AnatError::DimensionMismatch(format!(
                    "polygon {} references point {} but only {} points were given",
                    t, idx, n
                )));
            }
        }
    }

    let (nx, ny, nz) = shape;
    let mut vox = OccupancyVolume::zeros(shape);
    if nx == 0 || ny == 0 || nz == 0 || polys.is_empty() {
        return Ok(vox);
    }

    let shifted: Vec<[f64; 3]> = points
        .iter()
        .map(|p| [p[0] + center[0], p[1] + center[1], p[2] + center[2]])
        .collect();

    let rasterize_slice = |k: usize| -> (Vec<bool>, usize) {
        let segments = slice_segments(&shifted, polys, k as f64);
        let mut slice = vec![false; nx * ny];
        let dropped = fill_slice(&segments, nx, ny, &mut slice);
        (slice, dropped)
    };

    let slices: Vec<(Vec<bool>, usize)> = if parallel {
        (0..nz).into_par_iter().map(rasterize_slice).collect()
    } else {
        (0..nz).map(rasterize_slice).collect()
    };

    let mut dropped_total = 0;
    for (k, (slice, dropped)) in slices.iter().enumerate() {
        vox.set_slice(k, slice);
        dropped_total += dropped;
    }
    if dropped_total > 0 {
        debug!(
            "voxelize: dropped {} unpaired scanline crossings (surface not watertight)",
            dropped_total
        );
    }

    Ok(vox)
}
