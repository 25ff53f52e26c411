//! External segmentation service
//!
//! Brain extraction and tissue segmentation are delegated to external
//! binaries (FSL's `bet` and `fast`) behind a small command/result
//! contract: success is exit code 0, anything else is fatal for that
//! attempt and the invoked command line is recorded in the error.
//!
//! The trait seam exists so the pipeline can be exercised in tests without
//! FSL installed.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::info;

use crate::AnatError;

/// Tissue-segmentation parameter set.
///
/// The default enables partial-volume estimation and bias-field correction;
/// [`FastOptions::reduced`] disables both, which is the documented fallback
/// when the default run produces an empty white-matter map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FastOptions {
    pub partial_volume: bool,
    pub bias_correction: bool,
}

impl Default for FastOptions {
    fn default() -> Self {
        FastOptions {
            partial_volume: true,
            bias_correction: true,
        }
    }
}

impl FastOptions {
    /// The reduced-feature fallback: no partial-volume estimation, no
    /// bias-field correction.
    pub fn reduced() -> Self {
        FastOptions {
            partial_volume: false,
            bias_correction: false,
        }
    }
}

/// Command contract for the external segmentation tools.
pub trait SegmentationService {
    /// Skull-strip `raw` into `out`.
    fn extract_brain(&self, raw: &Path, out: &Path) -> Result<(), AnatError>;

    /// Segment `brain` into tissue classes under `workdir`, returning the
    /// path of the white-matter map the run produced.
    fn segment_tissues(
        &self,
        brain: &Path,
        workdir: &Path,
        opts: &FastOptions,
    ) -> Result<PathBuf, AnatError>;
}

/// FSL-backed segmentation.
///
/// `prefix` is prepended to every tool name (e.g. `"fsl5.0-"`), matching
/// site installs that namespace the FSL binaries. It is an explicit
/// configuration value; there is no process-wide default.
#[derive(Debug, Clone)]
pub struct FslTools {
    prefix: String,
}

impl FslTools {
    pub fn new(prefix: impl Into<String>) -> Self {
        FslTools {
            prefix: prefix.into(),
        }
    }

    fn run(&self, tool: &str, args: &[String]) -> Result<(), AnatError> {
        let program = format!("{}{}", self.prefix, tool);
        let command = format!("{} {}", program, args.join(" "));
        info!("running: {}", command);

        let status = Command::new(&program)
            .args(args)
            .status()
            .map_err(|e| AnatError::ExternalTool {
                command: command.clone(),
                reason: format!("failed to launch: {}", e),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(AnatError::ExternalTool {
                command,
                reason: format!("exited with {}", status),
            })
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Label 2 is white matter; the partial-volume run emits a pve map, the
/// reduced run only a hard segmentation.
fn wm_map_name(opts: &FastOptions) -> &'static str {
    if opts.partial_volume {
        "fast_pve_2.nii.gz"
    } else {
        "fast_seg_2.nii.gz"
    }
}

impl SegmentationService for FslTools {
    fn extract_brain(&self, raw: &Path, out: &Path) -> Result<(), AnatError> {
        // bet with bias-field/neck cleanup, as used for anatomicals
        self.run(
            "bet",
            &[path_arg(raw), path_arg(out), "-B".into(), "-v".into()],
        )
    }

    fn segment_tissues(
        &self,
        brain: &Path,
        workdir: &Path,
        opts: &FastOptions,
    ) -> Result<PathBuf, AnatError> {
        let basename = workdir.join("fast");
        let mut args: Vec<String> = Vec::new();
        if !opts.partial_volume {
            args.push("-g".into());
            args.push("--nopve".into());
        }
        if !opts.bias_correction {
            args.push("--nobias".into());
        }
        args.push("-o".into());
        args.push(path_arg(&basename));
        args.push(path_arg(brain));

        self.run("fast", &args)?;
        Ok(workdir.join(wm_map_name(opts)))
    }
}
