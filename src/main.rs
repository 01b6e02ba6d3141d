// This is the command-line front end for the batchpress engine.
// The lib.rs file serves as the public API for external consumers.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use tracing::{debug, info};
use walkdir::WalkDir;

use batchpress::{
    BatchConfig, BatchScheduler, BatchState, CancellationToken, PngBackend, plan_jobs,
};

/// Batch image optimizer: resizes and compresses a folder of PNG/JPEG
/// images into an output directory, reporting per-file results.
#[derive(Parser, Debug)]
#[command(name = "batchpress", version, about)]
struct Args {
    /// Input directory to optimize
    input: PathBuf,

    /// Output directory (created if missing)
    #[arg(short, long, default_value = "optimized")]
    output: PathBuf,

    /// Recurse into subdirectories, mirroring their structure
    #[arg(short, long)]
    recursive: bool,

    /// Compression level (1-100); higher keeps more quality
    #[arg(short = 'l', long, default_value_t = 80)]
    level: u32,

    /// Power-of-two longest-edge target (e.g. 512, 1024); omit to keep size
    #[arg(long)]
    resize: Option<u32>,

    /// Flatten transparency onto a white background
    #[arg(long)]
    flatten_alpha: bool,

    /// PNG backend
    #[arg(long, value_enum, default_value = "lossy")]
    png_backend: PngBackendArg,

    /// Reprocess outputs that already exist
    #[arg(long)]
    overwrite: bool,

    /// Number of concurrent workers (defaults to CPU count)
    #[arg(short, long)]
    jobs: Option<usize>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PngBackendArg {
    /// Structural optimization only, pixels untouched
    Lossless,
    /// Palette quantization, significantly smaller files
    Lossy,
}

impl From<PngBackendArg> for PngBackend {
    fn from(arg: PngBackendArg) -> Self {
        match arg {
            PngBackendArg::Lossless => PngBackend::Lossless,
            PngBackendArg::Lossy => PngBackend::Lossy,
        }
    }
}

const INPUT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Enumerates candidate files under `input`, excluding anything beneath the
/// output root so reruns never re-optimize their own results.
fn collect_files(input: &PathBuf, output: &PathBuf, recursive: bool) -> Vec<PathBuf> {
    let max_depth = if recursive { usize::MAX } else { 1 };

    WalkDir::new(input)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| !path.starts_with(output))
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .map(|e| INPUT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect()
}

fn format_eta(secs: f64) -> String {
    let secs = secs.round() as u64;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

fn format_bytes(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;

    let value = bytes as f64;
    if value.abs() >= MB {
        format!("{:.2} MB", value / MB)
    } else if value.abs() >= KB {
        format!("{:.2} KB", value / KB)
    } else {
        format!("{bytes} B")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "batchpress=info".into()),
        )
        .with_file(false)         // Remove file path
        .with_line_number(false)  // Remove line numbers
        .with_target(false)       // Remove module path
        .with_writer(std::io::stderr)
        .compact();               // Use compact formatter instead of pretty

    subscriber.init();

    let args = Args::parse();

    if !args.input.is_dir() {
        bail!("input directory not found: {}", args.input.display());
    }

    // Output defaulting to a name resolves under the input directory
    let output = if args.output.is_absolute() {
        args.output.clone()
    } else {
        args.input.join(&args.output)
    };

    let config = BatchConfig {
        compression_level: args.level,
        target_dimension: args.resize,
        preserve_alpha: !args.flatten_alpha,
        png_backend: args.png_backend.into(),
        overwrite: args.overwrite,
    };

    let files = collect_files(&args.input, &output, args.recursive);
    if files.is_empty() {
        bail!("no PNG/JPEG files found in {}", args.input.display());
    }
    debug!("Collected {} input files", files.len());

    let jobs = plan_jobs(&files, &args.input, &output).context("job planning failed")?;
    let scheduler = BatchScheduler::new(config, args.jobs).context("configuration rejected")?;
    info!("Optimizing {} files with {} workers", jobs.len(), scheduler.worker_count());

    // First Ctrl-C cancels cooperatively; in-flight jobs still finish.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling after in-flight jobs finish...");
            signal_cancel.cancel();
        }
    });

    let total = jobs.len();
    let report = scheduler
        .run(
            jobs,
            move |snapshot| {
                eprint!(
                    "\r{}/{} optimized, {} saved, ETA {}   ",
                    snapshot.completed,
                    total,
                    format_bytes(snapshot.bytes_saved),
                    format_eta(snapshot.eta_secs),
                );
                let _ = std::io::stderr().flush();
            },
            cancel,
        )
        .await?;
    eprintln!();

    println!(
        "{}: {} succeeded, {} failed, {} skipped ({} saved in {:.1}s)",
        match report.state {
            BatchState::Completed => "Completed",
            BatchState::Cancelled => "Cancelled",
        },
        report.succeeded,
        report.failed,
        report.skipped,
        format_bytes(report.bytes_saved),
        report.elapsed_ms as f64 / 1000.0,
    );

    for failure in report.failures() {
        if let batchpress::JobOutcome::Failed { reason } = &failure.outcome {
            eprintln!("  failed: {} ({})", failure.job.input_path.display(), reason);
        }
    }

    if report.failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
