//! Error taxonomy for the mask-generation pipeline

use std::path::PathBuf;

/// Errors surfaced by mask generation.
///
/// No variant is retried internally except the single documented
/// segmentation fallback (see [`crate::anat::TissueSegmentation`]); every
/// other failure propagates to the caller with enough context to diagnose
/// which validation or external command failed.
#[derive(Debug, thiserror::Error)]
pub enum AnatError {
    /// Malformed transform or point-set input (wrong element count,
    /// polygon index out of range). Local precondition violation.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The voxel-to-world affine cannot be inverted.
    #[error("affine transform is singular and cannot be inverted")]
    SingularTransform,

    /// A volume's shape disagrees with the reference shape.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    /// An external segmentation command failed to launch, exited non-zero,
    /// or produced an unusable result. The invoked command is recorded.
    #[error("external tool failure: `{command}`: {reason}")]
    ExternalTool { command: String, reason: String },

    /// Undecodable NIfTI input.
    #[error("failed to read NIfTI data: {0}")]
    Nifti(String),

    /// Undecodable surface file.
    #[error("failed to read surface '{path}': {reason}")]
    Surface { path: PathBuf, reason: String },

    /// A subject resource the data store cannot resolve.
    #[error("no such resource for subject '{subject}': {path}")]
    Missing { subject: String, path: PathBuf },

    /// Output serialization failed. Filesystem state is undefined; no
    /// partial-write recovery is attempted.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scratch-directory or other filesystem failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
