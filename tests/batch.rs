//! End-to-end batch tests against the public engine API.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use batchpress::{
    BatchConfig, BatchScheduler, BatchState, CancellationToken, Codec, CodecParams, CodecSet,
    ImageFormat, JobError, JobOutcome, PngBackend, SkipReason, plan_jobs,
};
use image::{DynamicImage, Rgba, RgbaImage};

mod helpers {
    use super::*;

    /// Write a small block-pattern PNG. A handful of distinct colors keeps
    /// the palette quantizer well inside its quality window.
    pub fn write_png(path: &Path, width: u32, height: u32) {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 4 * 60) as u8, (y % 4 * 50) as u8, 90, 255])
        });
        DynamicImage::ImageRgba8(image).save(path).unwrap();
    }

    pub fn write_jpeg(path: &Path, width: u32, height: u32) {
        let image = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 3 % 256) as u8, 128, (y * 5 % 256) as u8, 255])
        });
        DynamicImage::ImageRgba8(image).to_rgb8().save(path).unwrap();
    }

    /// A PNG header followed by garbage: readable, not decodable.
    pub fn write_corrupt_png(path: &Path) {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
        data.extend(vec![0x42u8; 64]);
        fs::write(path, data).unwrap();
    }

    /// Kind of outcome, for order-insensitive comparisons.
    pub fn outcome_kind(outcome: &JobOutcome) -> &'static str {
        match outcome {
            JobOutcome::Succeeded { .. } => "succeeded",
            JobOutcome::Failed { .. } => "failed",
            JobOutcome::Skipped { reason: SkipReason::AlreadyExists } => "skipped-exists",
            JobOutcome::Skipped { reason: SkipReason::Cancelled } => "skipped-cancelled",
        }
    }

    /// Codec that sleeps per encode, for deterministic cancellation tests.
    pub struct SlowCodec {
        pub delay: Duration,
        pub encodes: AtomicUsize,
    }

    impl Codec for SlowCodec {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn supports_alpha(&self) -> bool {
            true
        }

        fn encode(&self, _image: &DynamicImage, _params: &CodecParams) -> Result<Vec<u8>, JobError> {
            std::thread::sleep(self.delay);
            self.encodes.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3, 4])
        }
    }

    pub fn slow_codec_set(delay: Duration) -> (CodecSet, Arc<SlowCodec>) {
        let codec = Arc::new(SlowCodec { delay, encodes: AtomicUsize::new(0) });
        let mut set = CodecSet::empty();
        let dynamic: Arc<dyn Codec> = codec.clone();
        for backend in [PngBackend::Lossless, PngBackend::Lossy] {
            set.insert(ImageFormat::Png, backend, dynamic.clone());
            set.insert(ImageFormat::Jpeg, backend, dynamic.clone());
        }
        (set, codec)
    }
}

use helpers::*;

fn setup_inputs(dir: &Path, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("photo-{i:02}.png"));
            write_png(&path, 16, 16);
            path
        })
        .collect()
}

fn run_batch(
    config: BatchConfig,
    workers: usize,
    files: &[PathBuf],
    input_root: &Path,
    output_root: &Path,
) -> batchpress::ResultReport {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let jobs = plan_jobs(files, input_root, output_root).unwrap();
    let scheduler = BatchScheduler::new(config, Some(workers)).unwrap();
    runtime
        .block_on(scheduler.run(jobs, |_| {}, CancellationToken::new()))
        .unwrap()
}

#[test]
fn full_pipeline_writes_decodable_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();

    write_png(&input.join("a.png"), 64, 32);
    write_jpeg(&input.join("b.jpg"), 48, 48);
    let files = vec![input.join("a.png"), input.join("b.jpg")];

    let config = BatchConfig {
        target_dimension: None,
        png_backend: PngBackend::Lossy,
        ..Default::default()
    };
    let report = run_batch(config, 2, &files, &input, &output);

    assert_eq!(report.state, BatchState::Completed);
    assert_eq!(report.succeeded, 2);

    let a = image::open(output.join("a.png")).unwrap();
    assert_eq!((a.width(), a.height()), (64, 32));
    let b = image::open(output.join("b.jpg")).unwrap();
    assert_eq!((b.width(), b.height()), (48, 48));
}

#[test]
fn resize_applies_to_longest_edge_and_never_upscales() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();

    write_png(&input.join("wide.png"), 512, 256);
    write_png(&input.join("small.png"), 40, 20);
    let files = vec![input.join("wide.png"), input.join("small.png")];

    let config = BatchConfig {
        target_dimension: Some(128),
        png_backend: PngBackend::Lossless,
        ..Default::default()
    };
    let report = run_batch(config, 2, &files, &input, &output);
    assert_eq!(report.succeeded, 2);

    let wide = image::open(output.join("wide.png")).unwrap();
    assert_eq!((wide.width(), wide.height()), (128, 64));

    // smaller than the target: passes through at native resolution
    let small = image::open(output.join("small.png")).unwrap();
    assert_eq!((small.width(), small.height()), (40, 20));
}

#[test]
fn single_corrupt_input_never_aborts_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();

    let mut files = setup_inputs(&input, 6);
    let corrupt = input.join("broken.png");
    write_corrupt_png(&corrupt);
    files.push(corrupt);

    let report = run_batch(BatchConfig::default(), 4, &files, &input, &output);

    assert_eq!(report.state, BatchState::Completed);
    assert_eq!(report.total(), 7);
    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded, 6);

    let failure = report.failures().next().unwrap();
    assert!(failure.job.input_path.ends_with("broken.png"));
    assert!(matches!(failure.outcome, JobOutcome::Failed { reason: JobError::Codec(_) }));
}

#[test]
fn second_run_skips_unless_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();
    let files = setup_inputs(&input, 4);

    let first = run_batch(BatchConfig::default(), 2, &files, &input, &output);
    assert_eq!(first.succeeded, 4);

    let second = run_batch(BatchConfig::default(), 2, &files, &input, &output);
    assert_eq!(second.succeeded, 0);
    assert_eq!(second.skipped, 4);
    assert!(second.records.iter().all(|r| matches!(
        r.outcome,
        JobOutcome::Skipped { reason: SkipReason::AlreadyExists }
    )));

    let config = BatchConfig { overwrite: true, ..Default::default() };
    let third = run_batch(config, 2, &files, &input, &output);
    assert_eq!(third.succeeded, 4);
    assert_eq!(third.skipped, 0);
}

#[test]
fn worker_count_does_not_change_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    fs::create_dir_all(&input).unwrap();

    let mut files = setup_inputs(&input, 8);
    let corrupt = input.join("zz-broken.png");
    write_corrupt_png(&corrupt);
    files.push(corrupt);

    let outcomes = |report: &batchpress::ResultReport| -> BTreeMap<String, &'static str> {
        report
            .records
            .iter()
            .map(|r| {
                let name = r.job.input_path.file_name().unwrap().to_string_lossy().into_owned();
                (name, outcome_kind(&r.outcome))
            })
            .collect()
    };

    let serial = run_batch(
        BatchConfig::default(), 1, &files, &input, &dir.path().join("out-serial"),
    );
    let parallel = run_batch(
        BatchConfig::default(), 8, &files, &input, &dir.path().join("out-parallel"),
    );

    assert_eq!(outcomes(&serial), outcomes(&parallel));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_mid_batch_accounts_for_every_job() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();

    let total = 16;
    let files = setup_inputs(&input, total);
    let jobs = plan_jobs(&files, &input, &output).unwrap();

    let (codecs, _slow) = slow_codec_set(Duration::from_millis(25));
    let scheduler =
        BatchScheduler::with_codecs(BatchConfig::default(), Some(2), codecs).unwrap();

    // Cancel as soon as the first job completes; the two in-flight jobs
    // still finish, the rest never start.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let report = scheduler
        .run(
            jobs,
            move |snapshot| {
                if snapshot.completed == 1 {
                    trigger.cancel();
                }
            },
            cancel,
        )
        .await
        .unwrap();

    assert_eq!(report.state, BatchState::Cancelled);
    assert_eq!(report.total(), total);

    let cancelled = report
        .records
        .iter()
        .filter(|r| matches!(r.outcome, JobOutcome::Skipped { reason: SkipReason::Cancelled }))
        .count();
    assert!(report.succeeded >= 1);
    assert!(cancelled >= 1);
    assert_eq!(report.succeeded + report.failed + cancelled, total);

    // Started jobs reached terminal states and wrote their outputs
    for record in &report.records {
        if record.outcome.is_success() {
            assert!(record.job.output_path.exists());
        }
    }
}

#[test]
fn recursive_structure_is_mirrored() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(input.join("deep/deeper")).unwrap();

    write_png(&input.join("top.png"), 8, 8);
    write_png(&input.join("deep/mid.png"), 8, 8);
    write_png(&input.join("deep/deeper/leaf.png"), 8, 8);
    let files = vec![
        input.join("top.png"),
        input.join("deep/mid.png"),
        input.join("deep/deeper/leaf.png"),
    ];

    let report = run_batch(BatchConfig::default(), 2, &files, &input, &output);
    assert_eq!(report.succeeded, 3);

    assert!(output.join("top.png").exists());
    assert!(output.join("deep/mid.png").exists());
    assert!(output.join("deep/deeper/leaf.png").exists());
}

#[test]
fn flatten_alpha_produces_opaque_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();

    // half-transparent red square
    let image = RgbaImage::from_pixel(16, 16, Rgba([200, 0, 0, 128]));
    DynamicImage::ImageRgba8(image).save(input.join("ghost.png")).unwrap();
    let files = vec![input.join("ghost.png")];

    let config = BatchConfig {
        preserve_alpha: false,
        png_backend: PngBackend::Lossless,
        ..Default::default()
    };
    let report = run_batch(config, 1, &files, &input, &output);
    assert_eq!(report.succeeded, 1);

    let decoded = image::open(output.join("ghost.png")).unwrap();
    assert!(!decoded.color().has_alpha());
}

#[test]
fn progress_reports_byte_savings() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    let output = dir.path().join("out");
    fs::create_dir_all(&input).unwrap();
    let files = setup_inputs(&input, 3);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let jobs = plan_jobs(&files, &input, &output).unwrap();
    let scheduler = BatchScheduler::new(BatchConfig::default(), Some(1)).unwrap();

    let mut completed_seen = Vec::new();
    let report = runtime
        .block_on(scheduler.run(
            jobs,
            |snapshot| completed_seen.push((snapshot.completed, snapshot.total)),
            CancellationToken::new(),
        ))
        .unwrap();

    assert_eq!(completed_seen, vec![(1, 3), (2, 3), (3, 3)]);
    assert_eq!(
        report.bytes_saved,
        report
            .records
            .iter()
            .map(|r| r.outcome.bytes_saved())
            .sum::<i64>()
    );
}
