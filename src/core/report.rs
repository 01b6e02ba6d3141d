//! Per-job outcomes and the aggregated batch report.

use serde::Serialize;
use std::time::Duration;
use crate::core::Job;
use crate::utils::JobError;

/// Why a job was skipped rather than processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Output already exists and overwrite is disabled
    AlreadyExists,
    /// Batch was cancelled before the job started
    Cancelled,
}

/// Terminal state of a single job. Written exactly once.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum JobOutcome {
    Succeeded {
        /// Input file size in bytes
        original_bytes: u64,
        /// Output file size in bytes
        final_bytes: u64,
        /// Wall-clock processing time in milliseconds
        elapsed_ms: u64,
    },
    Failed {
        reason: JobError,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl JobOutcome {
    /// Bytes saved by this job; zero for failures and skips.
    pub fn bytes_saved(&self) -> i64 {
        match self {
            Self::Succeeded { original_bytes, final_bytes, .. } => {
                *original_bytes as i64 - *final_bytes as i64
            }
            _ => 0,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// One job's identity plus its terminal outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job: Job,
    pub outcome: JobOutcome,
}

/// Terminal state of the whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BatchState {
    Completed,
    Cancelled,
}

/// Aggregated results for one batch run.
///
/// Records are ordered by completion, not by input order; each carries its
/// job identity so callers must not index positionally. Immutable once the
/// batch reaches a terminal state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultReport {
    pub state: BatchState,
    pub records: Vec<JobRecord>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Cumulative bytes saved across successful jobs
    pub bytes_saved: i64,
    /// Total wall-clock time for the batch in milliseconds
    pub elapsed_ms: u64,
}

impl ResultReport {
    /// The failed records, in completion order, for display.
    pub fn failures(&self) -> impl Iterator<Item = &JobRecord> {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, JobOutcome::Failed { .. }))
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }
}

/// Accumulates records while the batch runs and freezes them into a
/// [`ResultReport`] at the terminal state.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    records: Vec<JobRecord>,
}

impl ReportBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { records: Vec::with_capacity(capacity) }
    }

    pub fn push(&mut self, job: Job, outcome: JobOutcome) {
        self.records.push(JobRecord { job, outcome });
    }

    pub fn finish(self, state: BatchState, elapsed: Duration) -> ResultReport {
        let mut succeeded = 0;
        let mut failed = 0;
        let mut skipped = 0;
        let mut bytes_saved = 0;

        for record in &self.records {
            match &record.outcome {
                JobOutcome::Succeeded { .. } => succeeded += 1,
                JobOutcome::Failed { .. } => failed += 1,
                JobOutcome::Skipped { .. } => skipped += 1,
            }
            bytes_saved += record.outcome.bytes_saved();
        }

        ResultReport {
            state,
            records: self.records,
            succeeded,
            failed,
            skipped,
            bytes_saved,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job(name: &str) -> Job {
        Job::new(PathBuf::from(format!("/in/{name}.png")), PathBuf::from(format!("/out/{name}.png")))
            .unwrap()
    }

    #[test]
    fn counts_and_savings() {
        let mut builder = ReportBuilder::with_capacity(3);
        builder.push(job("a"), JobOutcome::Succeeded {
            original_bytes: 1000,
            final_bytes: 400,
            elapsed_ms: 12,
        });
        builder.push(job("b"), JobOutcome::Failed {
            reason: JobError::codec("bad stream"),
        });
        builder.push(job("c"), JobOutcome::Skipped { reason: SkipReason::AlreadyExists });

        let report = builder.finish(BatchState::Completed, Duration::from_millis(50));

        assert_eq!(report.total(), 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.bytes_saved, 600);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn negative_savings_when_output_grew() {
        let outcome = JobOutcome::Succeeded {
            original_bytes: 100,
            final_bytes: 150,
            elapsed_ms: 1,
        };
        assert_eq!(outcome.bytes_saved(), -50);
    }

    #[test]
    fn report_serializes_outcome_tags() {
        let mut builder = ReportBuilder::default();
        builder.push(job("a"), JobOutcome::Skipped { reason: SkipReason::Cancelled });
        let report = builder.finish(BatchState::Cancelled, Duration::ZERO);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["state"], "cancelled");
        assert_eq!(json["records"][0]["outcome"]["status"], "skipped");
    }
}
