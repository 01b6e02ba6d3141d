//! The batch scheduler: a bounded worker pool over one shared FIFO queue.
//!
//! Workers pull jobs in discovery order, run the decode → transform →
//! encode → write pipeline inside `spawn_blocking` so the async runtime is
//! never starved, and report outcomes over a single channel. The result
//! loop is the only writer to the batch progress aggregate, which keeps
//! every progress update serialized without a lock on the hot path.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::{
    BatchConfig, BatchProgress, BatchState, Job, JobOutcome, ProgressSnapshot,
    ReportBuilder, ResultReport, SkipReason,
};
use crate::processing::codec::{CodecParams, CodecSet};
use crate::processing::transform;
use crate::utils::{self, JobError, PipelineError, PipelineResult};

/// Shared read-only context for all workers.
struct WorkerContext {
    config: BatchConfig,
    codecs: CodecSet,
    params: CodecParams,
}

/// Distributes jobs across a fixed pool of workers and aggregates their
/// outcomes into a [`ResultReport`].
pub struct BatchScheduler {
    context: Arc<WorkerContext>,
    worker_count: usize,
}

impl BatchScheduler {
    /// Creates a scheduler with the default codec set.
    ///
    /// Configuration problems are fatal here, before any job runs. The
    /// worker count defaults to the available hardware concurrency.
    pub fn new(config: BatchConfig, worker_count: Option<usize>) -> PipelineResult<Self> {
        Self::with_codecs(config, worker_count, CodecSet::default())
    }

    /// Creates a scheduler with an injected codec set.
    pub fn with_codecs(
        config: BatchConfig,
        worker_count: Option<usize>,
        codecs: CodecSet,
    ) -> PipelineResult<Self> {
        config.validate()?;
        let params = CodecParams::from_level(config.compression_level)?;
        let worker_count = worker_count.unwrap_or_else(num_cpus::get).max(1);

        Ok(Self {
            context: Arc::new(WorkerContext { config, codecs, params }),
            worker_count,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Runs the batch to a terminal state.
    ///
    /// Every job ends up in the report exactly once: processed jobs as
    /// Succeeded/Failed/Skipped(AlreadyExists), jobs left in the queue at
    /// cancellation as Skipped(Cancelled). `on_progress` fires after each
    /// terminal outcome with a snapshot of the batch aggregate.
    pub async fn run(
        &self,
        jobs: Vec<Job>,
        mut on_progress: impl FnMut(ProgressSnapshot) + Send,
        cancel: CancellationToken,
    ) -> PipelineResult<ResultReport> {
        let total = jobs.len();
        let started = Instant::now();
        info!("Starting batch of {} jobs on {} workers", total, self.worker_count);

        create_output_dirs(&jobs)?;

        // Preload the whole queue; the channel gives FIFO order and
        // mutual exclusion on the pop side.
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        for job in jobs {
            job_tx.send(job).expect("job queue cannot disconnect while sender is held");
        }
        drop(job_tx);

        let (result_tx, mut result_rx) = mpsc::unbounded_channel::<(Job, JobOutcome)>();

        let mut workers = Vec::with_capacity(self.worker_count);
        for worker_id in 0..self.worker_count {
            let queue = job_rx.clone();
            let results = result_tx.clone();
            let context = Arc::clone(&self.context);
            let cancel = cancel.clone();

            workers.push(tokio::spawn(async move {
                loop {
                    // Cooperative cancellation: checked before each pull,
                    // never mid-job.
                    if cancel.is_cancelled() {
                        debug!("Worker {} observed cancellation", worker_id);
                        break;
                    }

                    // The queue is fully loaded up front, so an empty
                    // channel means the batch is drained.
                    let job = match queue.try_recv() {
                        Ok(job) => job,
                        Err(_) => break,
                    };

                    let blocking_context = Arc::clone(&context);
                    let blocking_job = job.clone();
                    let outcome =
                        tokio::task::spawn_blocking(move || process_job(&blocking_context, &blocking_job))
                            .await
                            .unwrap_or_else(|e| JobOutcome::Failed {
                                reason: JobError::codec(format!("worker panicked: {e}")),
                            });

                    if results.send((job, outcome)).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(result_tx);

        // Single consumer: the only writer to BatchProgress and the report.
        let mut progress = BatchProgress::new(total);
        let mut report = ReportBuilder::with_capacity(total);

        while let Some((job, outcome)) = result_rx.recv().await {
            let file = job.input_path.display().to_string();
            let snapshot = progress.record(outcome.bytes_saved(), Some(file));
            report.push(job, outcome);
            on_progress(snapshot);
        }

        for worker in workers {
            let _ = worker.await;
        }

        // Whatever is still queued after the workers stopped was never
        // started; report it so no job's status is lost.
        let mut cancelled = false;
        while let Ok(job) = job_rx.try_recv() {
            cancelled = true;
            let file = job.input_path.display().to_string();
            let snapshot = progress.record(0, Some(file));
            report.push(job, JobOutcome::Skipped { reason: SkipReason::Cancelled });
            on_progress(snapshot);
        }

        let state = if cancelled || cancel.is_cancelled() {
            BatchState::Cancelled
        } else {
            BatchState::Completed
        };

        let report = report.finish(state, started.elapsed());
        info!(
            "Batch {:?}: {} succeeded, {} failed, {} skipped, {} bytes saved in {}ms",
            state, report.succeeded, report.failed, report.skipped,
            report.bytes_saved, report.elapsed_ms
        );

        Ok(report)
    }
}

/// Creates every distinct output parent directory once, idempotently,
/// before any worker writes.
fn create_output_dirs(jobs: &[Job]) -> PipelineResult<()> {
    let parents: HashSet<&Path> = jobs
        .iter()
        .filter_map(|job| job.output_path.parent())
        .filter(|dir| !dir.as_os_str().is_empty())
        .collect();

    for dir in parents {
        std::fs::create_dir_all(dir).map_err(|e| {
            PipelineError::Io(format!("cannot create output directory {}: {e}", dir.display()))
        })?;
    }

    Ok(())
}

/// Runs one job to a terminal outcome. Never panics the batch: every
/// failure inside the pipeline is caught here and recorded.
fn process_job(context: &WorkerContext, job: &Job) -> JobOutcome {
    if !context.config.overwrite && job.output_path.exists() {
        debug!("Skipping {} (output exists)", job.input_path.display());
        return JobOutcome::Skipped { reason: SkipReason::AlreadyExists };
    }

    let started = Instant::now();
    match run_pipeline(context, job) {
        Ok((original_bytes, final_bytes)) => JobOutcome::Succeeded {
            original_bytes,
            final_bytes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        },
        Err(reason) => {
            warn!("Job failed for {}: {}", job.input_path.display(), reason);
            JobOutcome::Failed { reason }
        }
    }
}

/// decode → transform → encode → atomic write
fn run_pipeline(context: &WorkerContext, job: &Job) -> Result<(u64, u64), JobError> {
    let codec = context
        .codecs
        .select(job.format, context.config.png_backend)
        .ok_or_else(|| {
            JobError::codec(format!("no codec registered for {:?}", job.format))
        })?;

    let input = std::fs::read(&job.input_path)
        .map_err(|e| JobError::io(format!("cannot read {}: {e}", job.input_path.display())))?;
    let original_bytes = input.len() as u64;

    let decoded = image::load_from_memory(&input)
        .map_err(|e| JobError::codec(format!("decode failed: {e}")))?;

    let transformed = transform::apply(
        decoded,
        context.config.target_dimension,
        context.config.preserve_alpha,
        codec.supports_alpha(),
    )?;

    let encoded = codec.encode(&transformed.image, &context.params)?;
    let final_bytes = encoded.len() as u64;

    utils::write_atomic(&job.output_path, &encoded)
        .map_err(|e| JobError::io(format!("cannot write {}: {e}", job.output_path.display())))?;

    debug!(
        "{} -> {} ({} -> {} bytes, {})",
        job.input_path.display(),
        job.output_path.display(),
        original_bytes,
        final_bytes,
        codec.name()
    );

    Ok((original_bytes, final_bytes))
}
