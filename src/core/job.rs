//! Job definition and output-path planning.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::utils::{PipelineError, PipelineResult, format_from_path, ImageFormat};

/// One file's end-to-end optimization task.
///
/// Immutable once created; consumed by exactly one worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Path to the source image file
    pub input_path: PathBuf,
    /// Path where the optimized image will be written
    pub output_path: PathBuf,
    /// Format resolved from the input extension
    pub format: ImageFormat,
}

impl Job {
    /// Creates a job for an explicit input/output pair.
    pub fn new(input_path: PathBuf, output_path: PathBuf) -> PipelineResult<Self> {
        let format = format_from_path(&input_path)?;
        Ok(Self { input_path, output_path, format })
    }
}

/// Builds the job list for a batch, mirroring each input's relative subpath
/// under `output_root`.
///
/// The caller is responsible for enumeration and extension filtering; every
/// path handed in must live under `input_root` and carry a supported
/// extension, otherwise job planning fails before the batch starts.
pub fn plan_jobs(
    files: &[PathBuf],
    input_root: &Path,
    output_root: &Path,
) -> PipelineResult<Vec<Job>> {
    let mut jobs = Vec::with_capacity(files.len());

    for file in files {
        let relative = file.strip_prefix(input_root).map_err(|_| {
            PipelineError::invalid_config(format!(
                "input file {} is not under the input root {}",
                file.display(),
                input_root.display()
            ))
        })?;

        jobs.push(Job::new(file.clone(), output_root.join(relative))?);
    }

    Ok(jobs)
}
