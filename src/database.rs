//! Subject data lookup
//!
//! A filestore-backed data access layer: resolves a subject identifier and
//! resource kind to a loadable file. Pure path lookup, no side effects.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<subject>/anatomicals/raw.nii.gz
//! <root>/<subject>/anatomicals/brainmask.nii.gz
//! <root>/<subject>/surfaces/lh.<surf>
//! <root>/<subject>/surfaces/rh.<surf>
//! ```
//!
//! Surfaces are FreeSurfer binary triangle files, one per hemisphere.

use std::path::{Path, PathBuf};

use crate::mesh::Mesh;
use crate::nifti_io::{read_nifti_file, NiftiVolume};
use crate::AnatError;

/// Anatomical volume kinds the store can resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeKind {
    /// Raw anatomical scan
    Raw,
    /// Skull-stripped brain
    BrainMask,
}

impl VolumeKind {
    fn filename(self) -> &'static str {
        match self {
            VolumeKind::Raw => "raw.nii.gz",
            VolumeKind::BrainMask => "brainmask.nii.gz",
        }
    }
}

/// A directory-backed subject store.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path an anatomical volume would live at (whether or not it
    /// exists yet).
    pub fn volume_path(&self, subject: &str, kind: VolumeKind) -> PathBuf {
        self.root
            .join(subject)
            .join("anatomicals")
            .join(kind.filename())
    }

    /// The path of an existing anatomical volume; `Missing` if absent.
    pub fn existing_volume(&self, subject: &str, kind: VolumeKind) -> Result<PathBuf, AnatError> {
        let path = self.volume_path(subject, kind);
        if path.is_file() {
            Ok(path)
        } else {
            Err(AnatError::Missing {
                subject: subject.to_string(),
                path,
            })
        }
    }

    /// Load the subject's raw anatomical as the reference volume.
    pub fn reference(&self, subject: &str) -> Result<NiftiVolume, AnatError> {
        let path = self.existing_volume(subject, VolumeKind::Raw)?;
        read_nifti_file(&path)
    }

    fn surface_path(&self, subject: &str, hemi: &str, surf: &str) -> PathBuf {
        self.root
            .join(subject)
            .join("surfaces")
            .join(format!("{}.{}", hemi, surf))
    }

    /// Load the subject's surface pieces for a surface name (e.g.
    /// `"white"`), one mesh per hemisphere in `lh`, `rh` order.
    ///
    /// Both hemisphere files are required; a missing or undecodable file is
    /// an error rather than a silent half-brain surface.
    pub fn surfaces(&self, subject: &str, surf: &str) -> Result<Vec<Mesh>, AnatError> {
        let mut meshes = Vec::with_capacity(2);
        for hemi in ["lh", "rh"] {
            let path = self.surface_path(subject, hemi, surf);
            let surface = neuroformats::read_surf(&path).map_err(|e| AnatError::Surface {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            meshes.push(Mesh::from_flat(
                &surface.mesh.vertices,
                &surface.mesh.faces,
            )?);
        }
        Ok(meshes)
    }
}
