//! Error types for the batch optimization engine.
//!
//! Two layers using `thiserror`: `PipelineError` for fatal conditions that
//! prevent a batch from starting, and `JobError` for per-job failures that
//! are recorded in the result report without ever aborting the batch.

use std::io;
use thiserror::Error;
use serde::Serialize;

/// Fatal errors surfaced to the caller before any job runs.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Configuration rejected by up-front validation
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// IO error during batch setup (e.g. output directory creation)
    #[error("IO error: {0}")]
    Io(String),

    /// Unsupported or unrecognized image format
    #[error("Format error: {0}")]
    Format(String),
}

/// Per-job errors.
///
/// Caught at the job boundary and aggregated into the report; a `JobError`
/// never terminates a worker or the batch.
#[derive(Error, Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "message")]
pub enum JobError {
    /// Alpha channel requested but the selected codec cannot carry it
    #[error("Alpha channel not supported by the selected output codec")]
    UnsupportedAlphaFormat,

    /// Decode or encode failure, with the backend's diagnostic text
    #[error("Codec failure: {0}")]
    Codec(String),

    /// Unreadable input or unwritable output
    #[error("IO failure: {0}")]
    Io(String),
}

/// Convenience result type for batch operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    pub fn invalid_config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn format<T: Into<String>>(msg: T) -> Self {
        Self::Format(msg.into())
    }
}

impl JobError {
    pub fn codec<T: Into<String>>(msg: T) -> Self {
        Self::Codec(msg.into())
    }

    pub fn io<T: Into<String>>(msg: T) -> Self {
        Self::Io(msg.into())
    }
}

// Convert std::io::Error to PipelineError for batch setup paths
impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// Convert std::io::Error to JobError inside job execution
impl From<io::Error> for JobError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
