//! Extract command - OCR a single local PDF.

use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use brdoc_core::document::{filter, BlockType, DocumentProcessor};
use brdoc_core::models::document::{DocumentResult, FilteredResult};
use brdoc_core::ocr::create_backend;
use brdoc_core::patterns::{PatternCategory, PatternMap};

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Keep only one block of patterns (general, finance, all)
    #[arg(short, long)]
    block: Option<String>,

    /// Skip pattern detection
    #[arg(long)]
    no_patterns: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON, as returned by the HTTP API
    Json,
    /// Plain text report
    Text,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = load_config(config_path)?;
    if args.no_patterns {
        config.extraction.extract_patterns = false;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();
    if extension != "pdf" {
        anyhow::bail!("Unsupported file format: {}", args.input.display());
    }

    let backend = create_backend(&config.ocr)
        .map_err(|e| anyhow::anyhow!("OCR engine '{}' unavailable: {}", config.ocr.engine, e))?;
    let processor = DocumentProcessor::from_config(&config, backend);

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Running OCR on {}", args.input.display()));

    let input = args.input.clone();
    let result = tokio::task::spawn_blocking(move || processor.process_file(&input)).await??;

    pb.finish_and_clear();

    if !result.success {
        anyhow::bail!(
            "Extraction failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    let output = match &args.block {
        Some(block) => {
            let filtered = filter(&result, BlockType::parse_lenient(block))?;
            match args.format {
                OutputFormat::Json => serde_json::to_string_pretty(&filtered)?,
                OutputFormat::Text => format_filtered(&filtered),
            }
        }
        None => match args.format {
            OutputFormat::Json => serde_json::to_string_pretty(&result)?,
            OutputFormat::Text => format_document(&result),
        },
    };

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

fn format_document(result: &DocumentResult) -> String {
    let mut out = String::new();

    if let Some(summary) = &result.summary {
        let _ = writeln!(out, "Pages:      {}", result.total_pages.unwrap_or(0));
        let _ = writeln!(out, "Characters: {}", summary.total_characters);
        let _ = writeln!(out, "Lines:      {}", summary.total_lines);
        let _ = writeln!(out, "Patterns:   {}", summary.unique_patterns);
    }

    if let Some(pages) = &result.pages {
        let failed: Vec<String> = pages
            .iter()
            .filter(|p| p.is_failed())
            .map(|p| p.page().to_string())
            .collect();
        if !failed.is_empty() {
            let _ = writeln!(out, "Unreadable pages: {}", failed.join(", "));
        }
    }

    if let Some(patterns) = &result.patterns {
        out.push_str(&format_patterns(patterns));
    }

    if let Some(text) = &result.full_text {
        out.push_str(text);
    }

    out
}

fn format_filtered(result: &FilteredResult) -> String {
    let mut out = format_patterns(&result.patterns);
    out.push_str(&result.full_text);
    out
}

fn format_patterns(patterns: &PatternMap) -> String {
    let mut out = String::new();

    for category in PatternCategory::ALL {
        if let Some(matches) = patterns.get(&category).filter(|m| !m.is_empty()) {
            let _ = writeln!(out, "\n{} ({}):", category.label(), matches.len());
            for value in matches {
                let _ = writeln!(out, "  - {}", value);
            }
        }
    }

    out
}
