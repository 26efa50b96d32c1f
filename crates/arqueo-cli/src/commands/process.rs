//! Process command - extract a record from a single report file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use arqueo_core::pdf::{PdfExtractor, PdfProcessor};
use arqueo_core::{ReportExtractor, ReportParser, ReportRecord};

use super::config::load_config;
use super::output::{OutputFormat, format_record};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF, or already-rendered report text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (default: from configuration)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Leave the diagnostic trace out of the output
    #[arg(long)]
    no_trace: bool,

    /// Print review warnings for the extracted record
    #[arg(long)]
    validate: bool,

    /// Use only the PDF text layer; never read word geometry
    #[arg(long)]
    text_only: bool,
}

/// Kind of input file, by extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    Text,
}

impl InputKind {
    pub fn of(path: &Path) -> Option<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let format = args
        .format
        .or_else(|| OutputFormat::from_name(&config.output.default_format))
        .unwrap_or(OutputFormat::Json);
    let include_trace = config.output.include_trace && !args.no_trace;

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Extracting {}...", args.input.display()));

    let parser = ReportParser::with_config(config);
    let record = extract_file(&args.input, &parser, args.text_only);
    pb.finish_and_clear();
    let record = record?;

    if args.validate {
        let issues = record.validate();
        if !issues.is_empty() {
            eprintln!("{}", style("Validation issues:").yellow());
            for issue in &issues {
                eprintln!("  - {}", issue);
            }
        }
    }

    let output = format_record(&record, format, include_trace)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

/// Extract a record from one file.
///
/// PDFs are rendered to text first; unless `text_only` is set, their bytes
/// also feed the spatial fallback.
pub fn extract_file(
    path: &Path,
    parser: &ReportParser,
    text_only: bool,
) -> anyhow::Result<ReportRecord> {
    match InputKind::of(path) {
        Some(InputKind::Pdf) => {
            let data = fs::read(path)?;
            if !text_only {
                return Ok(parser.extract_from_pdf(&data)?);
            }

            let mut extractor = PdfExtractor::with_config(parser.config().pdf.clone());
            extractor.load(&data)?;
            debug!("PDF has {} pages", extractor.page_count());

            let text = extractor.extract_text()?;
            Ok(parser.parse(&text)?)
        }
        Some(InputKind::Text) => {
            let text = fs::read_to_string(path)?;
            Ok(parser.parse(&text)?)
        }
        None => anyhow::bail!("Unsupported file format: {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_kind() {
        assert_eq!(InputKind::of(Path::new("lote.PDF")), Some(InputKind::Pdf));
        assert_eq!(InputKind::of(Path::new("lote.txt")), Some(InputKind::Text));
        assert_eq!(InputKind::of(Path::new("lote.png")), None);
        assert_eq!(InputKind::of(Path::new("lote")), None);
    }

    #[test]
    fn test_extract_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lote.txt");
        fs::write(&path, "Lote C 9\nImporte Lote 5000.00\nTotal Importe: 3000.00").unwrap();

        let parser = ReportParser::new().without_geometry();
        let record = extract_file(&path, &parser, false).unwrap();

        assert_eq!(record.batch_id, "9");
        assert_eq!(record.total_a.to_string(), "3000.00");
        assert_eq!(record.total_b.to_string(), "2000.00");
    }

    #[test]
    fn test_extract_empty_text_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "   \n").unwrap();

        let parser = ReportParser::new();
        assert!(extract_file(&path, &parser, false).is_err());
    }
}
