//! Progress accounting for a running batch.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Instant;

/// Inter-completion intervals kept for the moving-average ETA.
const ETA_WINDOW: usize = 8;

/// Snapshot emitted through the progress callback after every job
/// completion (success, failure, or skip).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    /// Number of jobs that reached a terminal state
    pub completed: usize,
    /// Total number of jobs in the batch
    pub total: usize,
    /// Cumulative bytes saved (negative when outputs grew)
    pub bytes_saved: i64,
    /// Estimated seconds until the batch finishes
    pub eta_secs: f64,
    /// Seconds since the batch started
    pub elapsed_secs: f64,
    /// Input file that produced this update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,
}

/// Smooths the ETA over the most recent completions.
///
/// A plain elapsed/completed average reacts badly to bursts (several fast
/// skips followed by one slow encode); averaging the last few
/// inter-completion intervals tracks the current pace instead.
#[derive(Debug)]
pub struct EtaEstimator {
    started: Instant,
    last_completion: Instant,
    intervals: VecDeque<f64>,
}

impl EtaEstimator {
    pub fn new(started: Instant) -> Self {
        Self {
            started,
            last_completion: started,
            intervals: VecDeque::with_capacity(ETA_WINDOW),
        }
    }

    /// Records one completion.
    pub fn record_completion(&mut self) {
        let now = Instant::now();
        let interval = now.duration_since(self.last_completion).as_secs_f64();
        self.last_completion = now;

        if self.intervals.len() == ETA_WINDOW {
            self.intervals.pop_front();
        }
        self.intervals.push_back(interval);
    }

    /// Estimated seconds remaining for `remaining` jobs.
    pub fn eta_secs(&self, completed: usize, remaining: usize) -> f64 {
        if remaining == 0 || completed == 0 {
            return 0.0;
        }

        let per_job = if self.intervals.is_empty() {
            self.started.elapsed().as_secs_f64() / completed as f64
        } else {
            self.intervals.iter().sum::<f64>() / self.intervals.len() as f64
        };

        per_job * remaining as f64
    }
}

/// Mutable batch-level aggregate, owned exclusively by the scheduler's
/// result loop; every update is serialized through that single consumer.
#[derive(Debug)]
pub struct BatchProgress {
    completed: usize,
    total: usize,
    bytes_saved: i64,
    started: Instant,
    eta: EtaEstimator,
}

impl BatchProgress {
    pub fn new(total: usize) -> Self {
        let started = Instant::now();
        Self {
            completed: 0,
            total,
            bytes_saved: 0,
            started,
            eta: EtaEstimator::new(started),
        }
    }

    /// Records one terminal job outcome and returns the snapshot to emit.
    pub fn record(&mut self, bytes_saved: i64, current_file: Option<String>) -> ProgressSnapshot {
        self.completed += 1;
        self.bytes_saved += bytes_saved;
        self.eta.record_completion();

        ProgressSnapshot {
            completed: self.completed,
            total: self.total,
            bytes_saved: self.bytes_saved,
            eta_secs: self.eta.eta_secs(self.completed, self.total - self.completed),
            elapsed_secs: self.started.elapsed().as_secs_f64(),
            current_file,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn bytes_saved(&self) -> i64 {
        self.bytes_saved
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}
