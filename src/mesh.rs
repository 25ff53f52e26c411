//! Triangulated surface pieces
//!
//! A mesh is one anatomical surface piece (typically one hemisphere):
//! an ordered point set plus triangle indices into it. Meshes are immutable
//! once constructed; all geometry processing works on borrowed slices.

use crate::AnatError;

/// A triangulated surface piece.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    points: Vec<[f64; 3]>,
    polys: Vec<[usize; 3]>,
}

impl Mesh {
    /// Build a mesh, validating that every polygon index references an
    /// existing point.
    pub fn new(points: Vec<[f64; 3]>, polys: Vec<[usize; 3]>) -> Result<Self, AnatError> {
        let n = points.len();
        for (t, poly) in polys.iter().enumerate() {
            for &idx in poly {
                if idx >= n {
                    return Err(AnatError::DimensionMismatch(format!(
                        "polygon {} references point {} but the mesh has {} points",
                        t, idx, n
                    )));
                }
            }
        }
        Ok(Mesh { points, polys })
    }

    /// Build a mesh from flat vertex and face arrays as produced by
    /// FreeSurfer surface readers (x0, y0, z0, x1, ... / i0, j0, k0, i1, ...).
    pub fn from_flat(vertices: &[f32], faces: &[i32]) -> Result<Self, AnatError> {
        if vertices.len() % 3 != 0 {
            return Err(AnatError::DimensionMismatch(format!(
                "flat vertex array length {} is not divisible by 3",
                vertices.len()
            )));
        }
        if faces.len() % 3 != 0 {
            return Err(AnatError::DimensionMismatch(format!(
                "flat face array length {} is not divisible by 3",
                faces.len()
            )));
        }

        let points: Vec<[f64; 3]> = vertices
            .chunks_exact(3)
            .map(|v| [v[0] as f64, v[1] as f64, v[2] as f64])
            .collect();

        let mut polys = Vec::with_capacity(faces.len() / 3);
        for f in faces.chunks_exact(3) {
            for &idx in f {
                if idx < 0 {
                    return Err(AnatError::DimensionMismatch(format!(
                        "negative face index {}",
                        idx
                    )));
                }
            }
            polys.push([f[0] as usize, f[1] as usize, f[2] as usize]);
        }

        Mesh::new(points, polys)
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn polys(&self) -> &[[usize; 3]] {
        &self.polys
    }

    /// Number of triangles.
    pub fn num_polys(&self) -> usize {
        self.polys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polys.is_empty()
    }

    /// Axis-aligned bounding box of the point set, or `None` if there are
    /// no points.
    pub fn bounds(&self) -> Option<([f64; 3], [f64; 3])> {
        let first = self.points.first()?;
        let mut lo = *first;
        let mut hi = *first;
        for p in &self.points {
            for d in 0..3 {
                if p[d] < lo[d] {
                    lo[d] = p[d];
                }
                if p[d] > hi[d] {
                    hi[d] = p[d];
                }
            }
        }
        Some((lo, hi))
    }
}
