//! Mask-generation pipeline
//!
//! Produces anatomical masks for a subject: a skull-stripped brain mask via
//! the external segmentation service, and a white-matter mask via one of
//! two explicit strategies: voxelizing the cortical surface, or
//! thresholding the service's tissue segmentation. The choice between the
//! two is a caller decision, not an exception-driven fallback.

use std::path::Path;

use log::{info, warn};
use tempfile::TempDir;

use crate::database::{FileStore, VolumeKind};
use crate::mesh::Mesh;
use crate::nifti_io::{read_nifti_file, write_mask, NiftiVolume};
use crate::segmentation::{FastOptions, SegmentationService};
use crate::transform::Transform;
use crate::volume::OccupancyVolume;
use crate::voxelize::voxelize;
use crate::AnatError;

/// Combine a subject's surface pieces into one occupancy volume on the
/// reference grid.
///
/// The world-to-voxel transform is the inverse of the reference
/// voxel-to-world affine. Each piece is transformed, rasterized at the
/// reference shape with no extra centering, and OR-accumulated; since OR
/// is commutative the piece order never affects the result, and the
/// `parallel` flag only changes how rasterization is scheduled, not what
/// it produces.
///
/// Rasterizer failures propagate unchanged; nothing at this layer retries.
pub fn voxelize_surfaces<I>(
    reference: &NiftiVolume,
    meshes: I,
    parallel: bool,
) -> Result<OccupancyVolume, AnatError>
where
    I: IntoIterator<Item = Mesh>,
{
    let world_to_voxel = Transform::inverse_of(&reference.affine)?;
    let mut vox = OccupancyVolume::zeros(reference.dims);

    for mesh in meshes {
        let pts = world_to_voxel.apply(mesh.points());
        let piece = voxelize(&pts, mesh.polys(), reference.dims, [0.0; 3], parallel)?;
        vox.or_assign(&piece)?;
    }

    Ok(vox)
}

/// Voxelize a subject's surface into a mask file on the reference grid.
///
/// Loads the raw anatomical as the reference, aggregates the hemisphere
/// meshes, and writes the mask with the reference affine and header.
/// Returns the in-memory occupancy volume, which uses the same Fortran
/// axis convention as the persisted array.
pub fn write_surface_mask(
    store: &FileStore,
    subject: &str,
    surf: &str,
    outfile: &Path,
    parallel: bool,
) -> Result<OccupancyVolume, AnatError> {
    info!("voxelizing '{}' surface for subject '{}'", surf, subject);
    let reference = store.reference(subject)?;
    let meshes = store.surfaces(subject, surf)?;

    let vox = voxelize_surfaces(&reference, meshes, parallel)?;
    write_mask(outfile, &vox, &reference.affine, &reference.header)?;
    info!("surface mask: {} voxels", vox.voxel_count());
    Ok(vox)
}

/// Skull-strip a subject's raw anatomical into `outfile` via the
/// segmentation service.
pub fn brainmask<S: SegmentationService>(
    store: &FileStore,
    service: &S,
    subject: &str,
    outfile: &Path,
) -> Result<(), AnatError> {
    let raw = store.existing_volume(subject, VolumeKind::Raw)?;
    info!("brain masking anatomical for subject '{}'", subject);
    service.extract_brain(&raw, outfile)
}

/// A way of producing a subject's mask file.
pub trait MaskStrategy {
    /// Generate the mask, write it to `outfile`, and return the in-memory
    /// occupancy volume.
    fn generate(
        &self,
        store: &FileStore,
        subject: &str,
        outfile: &Path,
    ) -> Result<OccupancyVolume, AnatError>;
}

/// Mask from the cortical surface reconstruction.
#[derive(Debug, Clone)]
pub struct SurfaceVoxelization {
    /// Surface name, e.g. `"white"`
    pub surf: String,
    /// Multi-threaded rasterization
    pub parallel: bool,
}

impl MaskStrategy for SurfaceVoxelization {
    fn generate(
        &self,
        store: &FileStore,
        subject: &str,
        outfile: &Path,
    ) -> Result<OccupancyVolume, AnatError> {
        write_surface_mask(store, subject, &self.surf, outfile, self.parallel)
    }
}

/// Mask from the external tissue segmentation of the skull-stripped brain.
///
/// Runs the service with default options first. If the white-matter map
/// sums to zero, the service is re-invoked exactly once with the reduced
/// parameter set (no partial-volume estimation, no bias-field correction)
/// before giving up. The map is binarized at 0.5 and the final mask must
/// contain at least one voxel.
pub struct TissueSegmentation<'a, S: SegmentationService> {
    pub service: &'a S,
}

impl<S: SegmentationService> MaskStrategy for TissueSegmentation<'_, S> {
    fn generate(
        &self,
        store: &FileStore,
        subject: &str,
        outfile: &Path,
    ) -> Result<OccupancyVolume, AnatError> {
        let brain = store.existing_volume(subject, VolumeKind::BrainMask)?;

        // Scratch directory for the segmentation outputs; removed on every
        // exit path, including errors.
        let scratch = TempDir::new()?;

        info!("segmenting the brain for subject '{}'", subject);
        let mut wm_path =
            self.service
                .segment_tissues(&brain, scratch.path(), &FastOptions::default())?;
        let mut wm = read_nifti_file(&wm_path)?;

        if wm.data.iter().sum::<f64>() == 0.0 {
            warn!(
                "tissue segmentation with default settings produced an empty \
                 white-matter map; retrying without partial-volume estimation \
                 or bias correction"
            );
            wm_path =
                self.service
                    .segment_tissues(&brain, scratch.path(), &FastOptions::reduced())?;
            wm = read_nifti_file(&wm_path)?;
        }

        let mask = OccupancyVolume::threshold(&wm.data, wm.dims, 0.5)?;
        if mask.voxel_count() == 0 {
            return Err(AnatError::ExternalTool {
                command: format!("fast ({})", wm_path.display()),
                reason: "generated white-matter mask is empty".into(),
            });
        }

        write_mask(outfile, &mask, &wm.affine, &wm.header)?;
        info!("white-matter mask: {} voxels", mask.voxel_count());
        Ok(mask)
    }
}

/// Generate a subject's white-matter mask.
///
/// `use_voxelization` selects between the two strategies explicitly:
/// voxelize the white surface, or threshold the external tissue
/// segmentation.
pub fn whitematter<S: SegmentationService>(
    store: &FileStore,
    service: &S,
    subject: &str,
    outfile: &Path,
    use_voxelization: bool,
    parallel: bool,
) -> Result<OccupancyVolume, AnatError> {
    if use_voxelization {
        SurfaceVoxelization {
            surf: "white".to_string(),
            parallel,
        }
        .generate(store, subject, outfile)
    } else {
        TissueSegmentation { service }.generate(store, subject, outfile)
    }
}
