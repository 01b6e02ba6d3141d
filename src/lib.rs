//! batchpress: a parallel batch image-optimization engine.
//!
//! Turns a list of input files plus a configuration into optimized output
//! files and a per-file result report. One file's failure never aborts the
//! batch; progress and ETA are reported after every job; cancellation is
//! cooperative.
//!
//! The caller enumerates and filters input files (see the bundled CLI for
//! one such collaborator), plans jobs with [`plan_jobs`], and runs them
//! through a [`BatchScheduler`].

// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod processing;

// Public exports for external consumers
pub use crate::core::{
    BatchConfig, BatchState, Job, JobOutcome, JobRecord, PngBackend,
    ProgressSnapshot, ResultReport, SkipReason, plan_jobs,
};
pub use crate::processing::{BatchScheduler, Codec, CodecParams, CodecSet};
pub use crate::utils::{ImageFormat, JobError, PipelineError, PipelineResult};

// Re-exported so callers don't need a direct tokio-util dependency
pub use tokio_util::sync::CancellationToken;
