//! Common test fixtures for anat-core integration tests

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};

use anat_core::mesh::Mesh;
use anat_core::nifti_io::save_nifti_to_file;
use anat_core::segmentation::{FastOptions, SegmentationService};
use anat_core::AnatError;

pub const IDENTITY: [f64; 16] = [
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0,
];

/// Axis-aligned cuboid surface (12 triangles) spanning `lo..hi`.
pub fn cube_mesh(lo: [f64; 3], hi: [f64; 3]) -> Mesh {
    let points = vec![
        [lo[0], lo[1], lo[2]],
        [hi[0], lo[1], lo[2]],
        [hi[0], hi[1], lo[2]],
        [lo[0], hi[1], lo[2]],
        [lo[0], lo[1], hi[2]],
        [hi[0], lo[1], hi[2]],
        [hi[0], hi[1], hi[2]],
        [lo[0], hi[1], hi[2]],
    ];
    let polys = vec![
        [0, 1, 2], [0, 2, 3],
        [4, 6, 5], [4, 7, 6],
        [0, 5, 1], [0, 4, 5],
        [3, 2, 6], [3, 6, 7],
        [0, 3, 7], [0, 7, 4],
        [1, 5, 6], [1, 6, 2],
    ];
    Mesh::new(points, polys).unwrap()
}

/// Write a subject's raw anatomical (all zeros, identity affine) into a
/// store rooted at `root`.
pub fn write_raw_anatomical(root: &Path, subject: &str, dims: (usize, usize, usize)) -> PathBuf {
    let dir = root.join(subject).join("anatomicals");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("raw.nii.gz");
    let data = vec![0.0; dims.0 * dims.1 * dims.2];
    save_nifti_to_file(&path, &data, dims, (1.0, 1.0, 1.0), &IDENTITY).unwrap();
    path
}

/// Write a subject's brainmask volume into a store rooted at `root`.
pub fn write_brainmask_volume(root: &Path, subject: &str, dims: (usize, usize, usize)) -> PathBuf {
    let dir = root.join(subject).join("anatomicals");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("brainmask.nii.gz");
    let data = vec![1.0; dims.0 * dims.1 * dims.2];
    save_nifti_to_file(&path, &data, dims, (1.0, 1.0, 1.0), &IDENTITY).unwrap();
    path
}

/// Write a FreeSurfer binary triangle surface file.
///
/// Format: 3-byte magic 0xFF FF FE, a creation comment terminated by two
/// newlines, then big-endian vertex/face counts followed by the flat f32
/// vertex and i32 face arrays.
pub fn write_fs_surface(path: &Path, mesh: &Mesh) {
    let mut bytes: Vec<u8> = vec![0xff, 0xff, 0xfe];
    bytes.extend_from_slice(b"created by anat-core tests\n\n");

    bytes.extend_from_slice(&(mesh.points().len() as i32).to_be_bytes());
    bytes.extend_from_slice(&(mesh.polys().len() as i32).to_be_bytes());

    for p in mesh.points() {
        for d in 0..3 {
            bytes.extend_from_slice(&(p[d] as f32).to_be_bytes());
        }
    }
    for poly in mesh.polys() {
        for &idx in poly {
            bytes.extend_from_slice(&(idx as i32).to_be_bytes());
        }
    }

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(&bytes).unwrap();
}

/// Write both hemisphere surface files for a subject.
pub fn write_subject_surfaces(root: &Path, subject: &str, surf: &str, lh: &Mesh, rh: &Mesh) {
    let dir = root.join(subject).join("surfaces");
    write_fs_surface(&dir.join(format!("lh.{}", surf)), lh);
    write_fs_surface(&dir.join(format!("rh.{}", surf)), rh);
}

/// A scripted segmentation service: the first `segment_tissues` call writes
/// `primary`, any further call writes `fallback`. Every call's options are
/// recorded.
pub struct MockSegmentation {
    pub dims: (usize, usize, usize),
    pub primary: Vec<f64>,
    pub fallback: Vec<f64>,
    pub calls: RefCell<Vec<FastOptions>>,
    pub extractions: RefCell<Vec<PathBuf>>,
}

impl MockSegmentation {
    pub fn new(dims: (usize, usize, usize), primary: Vec<f64>, fallback: Vec<f64>) -> Self {
        MockSegmentation {
            dims,
            primary,
            fallback,
            calls: RefCell::new(Vec::new()),
            extractions: RefCell::new(Vec::new()),
        }
    }
}

impl SegmentationService for MockSegmentation {
    fn extract_brain(&self, raw: &Path, out: &Path) -> Result<(), AnatError> {
        self.extractions.borrow_mut().push(raw.to_path_buf());
        let data = vec![1.0; self.dims.0 * self.dims.1 * self.dims.2];
        save_nifti_to_file(out, &data, self.dims, (1.0, 1.0, 1.0), &IDENTITY)
    }

    fn segment_tissues(
        &self,
        _brain: &Path,
        workdir: &Path,
        opts: &FastOptions,
    ) -> Result<PathBuf, AnatError> {
        let first = self.calls.borrow().is_empty();
        self.calls.borrow_mut().push(*opts);

        let data = if first { &self.primary } else { &self.fallback };
        let name = if opts.partial_volume {
            "fast_pve_2.nii.gz"
        } else {
            "fast_seg_2.nii.gz"
        };
        let path = workdir.join(name);
        save_nifti_to_file(&path, data, self.dims, (1.0, 1.0, 1.0), &IDENTITY)?;
        Ok(path)
    }
}
