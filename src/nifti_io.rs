//! NIfTI-1 file I/O
//!
//! Reads reference anatomical volumes (gzip auto-detected) and writes
//! binary mask volumes that carry the reference affine and header metadata.
//!
//! Axis convention: volume data is held in Fortran order (x varies fastest,
//! `index = x + y*nx + z*nx*ny`), which is also the NIfTI on-disk layout.
//! Masks are therefore serialized verbatim; no transpose happens between
//! the in-memory value handed to callers and the persisted array.

use std::io::Cursor;
use std::path::Path;

use flate2::read::GzDecoder;
use ndarray::Array;
use nifti::volume::ndarray::IntoNdArray;
use nifti::{InMemNiftiObject, NiftiHeader, NiftiObject};

use crate::volume::OccupancyVolume;
use crate::AnatError;

/// A loaded NIfTI volume: scalar data plus the spatial metadata needed to
/// write masks aligned to the same grid.
///
/// Serves as the reference volume for one mask-generation call; read-only
/// once loaded and never cached across calls.
#[derive(Debug, Clone)]
pub struct NiftiVolume {
    /// Volume data as f64, Fortran order
    pub data: Vec<f64>,
    /// Dimensions (nx, ny, nz)
    pub dims: (usize, usize, usize),
    /// Voxel sizes in mm
    pub voxel_size: (f64, f64, f64),
    /// Voxel-to-world affine (4x4, row-major)
    pub affine: [f64; 16],
    /// The full NIfTI-1 header, carried for metadata propagation
    pub header: NiftiHeader,
}

/// Check if bytes are gzip compressed
fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Header summary attached to decode errors for diagnostics
fn header_info(bytes: &[u8]) -> String {
    if bytes.len() < 348 {
        return format!("file too small ({} bytes, need at least 348)", bytes.len());
    }
    let sizeof_hdr = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let magic = String::from_utf8_lossy(&bytes[344..348]).to_string();
    let datatype = i16::from_le_bytes([bytes[70], bytes[71]]);
    format!("sizeof_hdr={}, magic='{}', datatype={}", sizeof_hdr, magic, datatype)
}

/// Voxel-to-world affine from a header: sform if set, otherwise an identity
/// scaled by the voxel sizes.
fn affine_from_header(header: &NiftiHeader) -> [f64; 16] {
    if header.sform_code > 0 {
        let s = &header.srow_x;
        let t = &header.srow_y;
        let u = &header.srow_z;
        [
            s[0] as f64, s[1] as f64, s[2] as f64, s[3] as f64,
            t[0] as f64, t[1] as f64, t[2] as f64, t[3] as f64,
            u[0] as f64, u[1] as f64, u[2] as f64, u[3] as f64,
            0.0, 0.0, 0.0, 1.0,
        ]
    } else {
        let vsx = header.pixdim[1] as f64;
        let vsy = header.pixdim[2] as f64;
        let vsz = header.pixdim[3] as f64;
        [
            vsx, 0.0, 0.0, 0.0,
            0.0, vsy, 0.0, 0.0,
            0.0, 0.0, vsz, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }
}

/// Load a NIfTI volume from bytes.
///
/// Supports both .nii and .nii.gz (gzip is auto-detected). 4D inputs are
/// reduced to their first timepoint.
pub fn load_nifti(bytes: &[u8]) -> Result<NiftiVolume, AnatError> {
    let obj: InMemNiftiObject = if is_gzip(bytes) {
        let decoder = GzDecoder::new(Cursor::new(bytes));
        InMemNiftiObject::from_reader(decoder).map_err(|e| {
            let mut decoder = GzDecoder::new(Cursor::new(bytes));
            let mut decompressed = Vec::new();
            let info = if std::io::Read::read_to_end(&mut decoder, &mut decompressed).is_ok() {
                header_info(&decompressed)
            } else {
                "could not decompress".to_string()
            };
            AnatError::Nifti(format!("failed to read gzipped NIfTI: {} ({})", e, info))
        })?
    } else {
        let info = header_info(bytes);
        InMemNiftiObject::from_reader(Cursor::new(bytes))
            .map_err(|e| AnatError::Nifti(format!("failed to read NIfTI: {} ({})", e, info)))?
    };

    let header = obj.header().clone();

    let ndim = header.dim[0] as usize;
    if ndim < 3 {
        return Err(AnatError::Nifti(format!(
            "expected at least a 3D volume, got {}D",
            ndim
        )));
    }

    let voxel_size = (
        header.pixdim[1] as f64,
        header.pixdim[2] as f64,
        header.pixdim[3] as f64,
    );
    let affine = affine_from_header(&header);

    let volume = obj.into_volume();
    let array: Array<f64, _> = volume
        .into_ndarray()
        .map_err(|e| AnatError::Nifti(format!("failed to convert to ndarray: {}", e)))?;

    let shape = array.shape().to_vec();
    if shape.len() < 3 {
        return Err(AnatError::Nifti(format!(
            "expected at least a 3D array, got {}D",
            shape.len()
        )));
    }
    let dims = (shape[0], shape[1], shape[2]);

    // Flatten in Fortran order (x varies fastest) to match the NIfTI
    // convention; 4D arrays keep only the first timepoint.
    let mut data = Vec::with_capacity(dims.0 * dims.1 * dims.2);
    for k in 0..dims.2 {
        for j in 0..dims.1 {
            for i in 0..dims.0 {
                data.push(if shape.len() == 3 {
                    array[[i, j, k]]
                } else {
                    array[[i, j, k, 0]]
                });
            }
        }
    }

    Ok(NiftiVolume {
        data,
        dims,
        voxel_size,
        affine,
        header,
    })
}

/// Read a NIfTI volume from a filesystem path (.nii or .nii.gz).
pub fn read_nifti_file(path: &Path) -> Result<NiftiVolume, AnatError> {
    let bytes = std::fs::read(path)
        .map_err(|e| AnatError::Nifti(format!("failed to read file '{}': {}", path.display(), e)))?;
    load_nifti(&bytes)
}

/// Serialize a float32 volume as uncompressed NIfTI-1 bytes.
pub fn save_nifti(
    data: &[f64],
    dims: (usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
) -> Vec<u8> {
    let mut header = base_header(dims, 16, 32); // DT_FLOAT32

    let pixdim: [f32; 8] = [
        1.0,
        voxel_size.0 as f32,
        voxel_size.1 as f32,
        voxel_size.2 as f32,
        1.0, 1.0, 1.0, 1.0,
    ];
    write_pixdim(&mut header, &pixdim);
    write_sform(&mut header, affine);

    let mut buffer = Vec::with_capacity(352 + data.len() * 4);
    buffer.extend_from_slice(&header);
    buffer.extend_from_slice(&[0u8; 4]); // no extensions
    for &val in data {
        buffer.extend_from_slice(&(val as f32).to_le_bytes());
    }
    buffer
}

/// Save a float volume to a file, gzip compressed when the path ends with
/// `.nii.gz`.
pub fn save_nifti_to_file(
    path: &Path,
    data: &[f64],
    dims: (usize, usize, usize),
    voxel_size: (f64, f64, f64),
    affine: &[f64; 16],
) -> Result<(), AnatError> {
    let bytes = save_nifti(data, dims, voxel_size, affine);
    write_bytes(path, bytes)
}

/// Write a binary mask as a `DT_UINT8` NIfTI-1 image carrying the reference
/// affine and header metadata.
///
/// Writes exactly one file at `path`, overwriting if it exists; a failed
/// write surfaces as `Write` with no partial-write recovery. The mask's
/// Fortran-ordered buffer is written verbatim (see module docs).
pub fn write_mask(
    path: &Path,
    mask: &OccupancyVolume,
    affine: &[f64; 16],
    reference: &NiftiHeader,
) -> Result<(), AnatError> {
    let mut header = base_header(mask.shape(), 2, 8); // DT_UINT8

    write_pixdim(&mut header, &reference.pixdim);
    header[123] = reference.xyzt_units as u8;

    // Propagate the qform so downstream tools agree on orientation
    header[252..254].copy_from_slice(&(reference.qform_code as i16).to_le_bytes());
    for (offset, value) in [
        (256usize, reference.quatern_b),
        (260, reference.quatern_c),
        (264, reference.quatern_d),
        (268, reference.quatern_x),
        (272, reference.quatern_y),
        (276, reference.quatern_z),
    ] {
        header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    write_sform(&mut header, affine);

    let data = mask.to_bytes();
    let mut buffer = Vec::with_capacity(352 + data.len());
    buffer.extend_from_slice(&header);
    buffer.extend_from_slice(&[0u8; 4]);
    buffer.extend_from_slice(&data);

    write_bytes(path, buffer)
}

/// A NIfTI-1 header with size, dims, datatype, bitpix, vox_offset, scaling
/// and magic filled in.
fn base_header(dims: (usize, usize, usize), datatype: i16, bitpix: i16) -> [u8; 348] {
    let mut header = [0u8; 348];

    header[0..4].copy_from_slice(&348i32.to_le_bytes());

    let dim: [i16; 8] = [3, dims.0 as i16, dims.1 as i16, dims.2 as i16, 1, 1, 1, 1];
    for (i, &d) in dim.iter().enumerate() {
        let offset = 40 + i * 2;
        header[offset..offset + 2].copy_from_slice(&d.to_le_bytes());
    }

    header[70..72].copy_from_slice(&datatype.to_le_bytes());
    header[72..74].copy_from_slice(&bitpix.to_le_bytes());

    // vox_offset = 352 (header + 4-byte extension flag)
    header[108..112].copy_from_slice(&352.0f32.to_le_bytes());
    header[112..116].copy_from_slice(&1.0f32.to_le_bytes()); // scl_slope
    header[116..120].copy_from_slice(&0.0f32.to_le_bytes()); // scl_inter

    header[344..348].copy_from_slice(b"n+1\0");
    header
}

fn write_pixdim(header: &mut [u8; 348], pixdim: &[f32; 8]) {
    for (i, &p) in pixdim.iter().enumerate() {
        let offset = 76 + i * 4;
        header[offset..offset + 4].copy_from_slice(&p.to_le_bytes());
    }
}

/// sform_code = 1 (scanner anat) plus the three srow vectors.
fn write_sform(header: &mut [u8; 348], affine: &[f64; 16]) {
    header[254..256].copy_from_slice(&1i16.to_le_bytes());
    for row in 0..3 {
        for col in 0..4 {
            let offset = 280 + row * 16 + col * 4;
            let value = affine[row * 4 + col] as f32;
            header[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
        }
    }
}

fn write_bytes(path: &Path, bytes: Vec<u8>) -> Result<(), AnatError> {
    let bytes = if path.to_string_lossy().ends_with(".nii.gz") {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes).map_err(|e| AnatError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        encoder.finish().map_err(|e| AnatError::Write {
            path: path.to_path_buf(),
            source: e,
        })?
    } else {
        bytes
    };

    std::fs::write(path, &bytes).map_err(|e| AnatError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}
