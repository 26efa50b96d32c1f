//! Batch processing command for multiple report files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use arqueo_core::{ReportParser, ReportRecord};

use super::config::load_config;
use super::output::{OutputFormat, format_record};
use super::process::{InputKind, extract_file};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching the input files
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file records
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file (default: from configuration)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,

    /// Use only the PDF text layer; never read word geometry
    #[arg(long)]
    text_only: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    outcome: Result<ReportRecord, String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| InputKind::of(p).is_some())
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let format = args
        .format
        .or_else(|| OutputFormat::from_name(&config.output.default_format))
        .unwrap_or(OutputFormat::Json);
    let include_trace = config.output.include_trace;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = Arc::new(ReportParser::with_config(config));
    let results = process_all(files, parser, &args, &pb).await?;
    pb.finish_and_clear();

    if !args.continue_on_error {
        let failure = results
            .iter()
            .find_map(|r| r.outcome.as_ref().err().map(|message| (&r.path, message)));
        if let Some((path, message)) = failure {
            anyhow::bail!("Processing failed for {}: {}", path.display(), message);
        }
    }

    let (successful, failed): (Vec<&ProcessResult>, Vec<&ProcessResult>) =
        results.iter().partition(|r| r.outcome.is_ok());

    if let Some(output_dir) = &args.output_dir {
        for result in &successful {
            if let Ok(record) = &result.outcome {
                let stem = result
                    .path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("report");
                let output_path = output_dir.join(format!("{}.{}", stem, format.extension()));

                fs::write(&output_path, format_record(record, format, include_trace)?)?;
                debug!("Wrote output to {}", output_path.display());
            }
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let incomplete = successful
        .iter()
        .filter(|r| matches!(&r.outcome, Ok(record) if !record.is_complete()))
        .count();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful ({} need review), {} failed",
        style(successful.len()).green(),
        style(incomplete).yellow(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            if let Err(message) = &result.outcome {
                println!("  - {}: {}", result.path.display(), message);
            }
        }
    }

    Ok(())
}

/// Run extraction on the blocking pool, at most `jobs` files at a time.
///
/// Results come back in input order. Without `--continue-on-error` no new
/// file is started once one has failed; files already running are awaited
/// and reported.
async fn process_all(
    files: Vec<PathBuf>,
    parser: Arc<ReportParser>,
    args: &BatchArgs,
    pb: &ProgressBar,
) -> anyhow::Result<Vec<ProcessResult>> {
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));
    let failed = Arc::new(AtomicBool::new(false));
    let fail_fast = !args.continue_on_error;
    let mut handles = Vec::with_capacity(files.len());

    for path in files {
        let permit = Arc::clone(&semaphore).acquire_owned().await?;
        if fail_fast && failed.load(Ordering::Acquire) {
            debug!("Not starting {} after an earlier failure", path.display());
            break;
        }

        let parser = Arc::clone(&parser);
        let failed = Arc::clone(&failed);
        let text_only = args.text_only;

        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let file_start = Instant::now();
            let outcome = extract_file(&path, &parser, text_only).map_err(|e| e.to_string());
            if outcome.is_err() {
                failed.store(true, Ordering::Release);
            }
            ProcessResult {
                path,
                outcome,
                processing_time_ms: file_start.elapsed().as_millis() as u64,
            }
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let result = handle.await?;
        pb.inc(1);

        if let Err(message) = &result.outcome {
            if fail_fast {
                error!("Failed to process {}: {}", result.path.display(), message);
            } else {
                warn!("Failed to process {}: {}", result.path.display(), message);
            }
        }
        results.push(result);
    }

    Ok(results)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "batch_id",
        "date",
        "user",
        "cash",
        "credit_card",
        "debit_card",
        "deferred_check",
        "total_a",
        "total_b",
        "grand_total",
        "reconciliation",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let elapsed = result.processing_time_ms.to_string();

        match &result.outcome {
            Ok(record) => {
                let status = if record.is_complete() { "success" } else { "review" };
                wtr.write_record([
                    filename,
                    status,
                    &record.batch_id,
                    &record.date_string(),
                    &record.user,
                    &record.cash.to_string(),
                    &record.credit_card.to_string(),
                    &record.debit_card.to_string(),
                    &record.deferred_check.to_string(),
                    &record.total_a.to_string(),
                    &record.total_b.to_string(),
                    &record.grand_total.to_string(),
                    &record.outcome.to_string(),
                    &elapsed,
                    "",
                ])?;
            }
            Err(message) => {
                wtr.write_record([
                    filename, "error", "", "", "", "", "", "", "", "", "", "", "", &elapsed,
                    message,
                ])?;
            }
        }
    }

    wtr.flush()?;
    Ok(())
}
