//! Affine transforms between world and voxel-index space
//!
//! A NIfTI volume's affine maps voxel indices to world (scanner) millimetre
//! coordinates; surface meshes live in world space. Rasterization needs the
//! inverse map, so transforms here support construction from a row-major
//! 4x4 affine, inversion, and application to point sets.

use nalgebra::{Matrix4, Vector4};

use crate::AnatError;

/// A 4x4 homogeneous affine transform over 3D point sets.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    matrix: Matrix4<f64>,
}

impl Transform {
    /// Build a transform from a row-major 4x4 affine.
    ///
    /// Fails with `DimensionMismatch` unless exactly 16 elements are given.
    pub fn from_affine(affine: &[f64]) -> Result<Self, AnatError> {
        if affine.len() != 16 {
            return Err(AnatError::DimensionMismatch(format!(
                "affine must have 16 elements (4x4), got {}",
                affine.len()
            )));
        }
        Ok(Transform {
            matrix: Matrix4::from_row_slice(affine),
        })
    }

    /// Build a transform directly from a matrix.
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Transform { matrix }
    }

    /// Build the inverse of a given row-major 4x4 affine.
    ///
    /// This is the usual entry point for the world-to-voxel map: the
    /// reference volume stores voxel-to-world, and rasterization needs the
    /// other direction.
    pub fn inverse_of(affine: &[f64]) -> Result<Self, AnatError> {
        Transform::from_affine(affine)?.inverse()
    }

    /// Invert this transform. Fails with `SingularTransform` if the matrix
    /// has no inverse.
    pub fn inverse(&self) -> Result<Self, AnatError> {
        self.matrix
            .try_inverse()
            .map(Transform::from_matrix)
            .ok_or(AnatError::SingularTransform)
    }

    /// Apply the transform to an ordered point set.
    ///
    /// Each point is lifted to homogeneous coordinates (append 1),
    /// multiplied, and the homogeneous term dropped. The input is not
    /// mutated and the output has the same length and order.
    pub fn apply(&self, points: &[[f64; 3]]) -> Vec<[f64; 3]> {
        points
            .iter()
            .map(|p| {
                let v = self.matrix * Vector4::new(p[0], p[1], p[2], 1.0);
                [v[0], v[1], v[2]]
            })
            .collect()
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.matrix
    }
}
