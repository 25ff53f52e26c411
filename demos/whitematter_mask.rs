//! Generate a white-matter mask by voxelizing a subject's cortical surface
//!
//! Usage: cargo run --release --example whitematter_mask -- <store-root> <subject> <outfile>

use std::path::PathBuf;
use std::time::Instant;

use anat_core::anat::write_surface_mask;
use anat_core::database::FileStore;

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 4 {
        return Err(format!(
            "usage: {} <store-root> <subject> <outfile>",
            args[0]
        ));
    }
    let store = FileStore::new(&args[1]);
    let subject = &args[2];
    let outfile = PathBuf::from(&args[3]);

    println!("[INFO] Voxelizing white surface for subject '{}'", subject);
    let start = Instant::now();
    let mask =
        write_surface_mask(&store, subject, "white", &outfile, true).map_err(|e| e.to_string())?;
    println!("[INFO] Completed in {:.2?}", start.elapsed());

    let (nx, ny, nz) = mask.shape();
    println!(
        "[INFO] Volume: {}x{}x{}, mask voxels: {}",
        nx,
        ny,
        nz,
        mask.voxel_count()
    );
    println!("[INFO] Wrote {}", outfile.display());
    Ok(())
}
