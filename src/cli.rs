use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;
use crate::constants;
use crate::models::ExamDraft;
use crate::services::export::{export_draft, ExportFormat};
use crate::services::validation::validate_draft;
use crate::services::{extractor_for, parse_exam};

#[derive(Parser)]
#[command(name = "exam-importer")]
#[command(author, version, about = "Turns exam documents into multiple-choice exam drafts", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve,

    /// Recognize one document and print or save the draft
    Parse {
        /// .docx file, or a .json array of pre-extracted blocks
        file: PathBuf,
        /// Output format: json or markdown
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Recognize every supported document under a directory and summarize
    Scan {
        /// Directory to walk
        dir: PathBuf,
    },
}

pub fn handle_parse(file: &Path, format: ExportFormat, output: Option<&Path>) -> Result<()> {
    let config = Config::new();
    let draft = parse_file(file, &config)?;

    let validation = validate_draft(&draft, &config.recognizer);
    for message in validation.messages() {
        warn!("{}: {}", file.display(), message);
    }

    let bytes = export_draft(&draft, format)?;
    match output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote {} ({})", path.display(), format.mime_type());
        }
        None => println!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}

pub fn handle_scan(dir: &Path) -> Result<()> {
    let config = Config::new();
    let sources = collect_sources(dir);
    if sources.is_empty() {
        warn!("No .docx or .json documents under {}", dir.display());
        return Ok(());
    }

    println!("{:50} {:>9} {:>8} {:>8}", "File", "Questions", "Minutes", "Warnings");
    for path in sources {
        match parse_file(&path, &config) {
            Ok(draft) => {
                let validation = validate_draft(&draft, &config.recognizer);
                println!(
                    "{:50} {:>9} {:>8} {:>8}",
                    path.display(),
                    draft.questions.len(),
                    draft.duration_minutes,
                    validation.warnings.len()
                );
            }
            Err(e) => error!("{}: {:#}", path.display(), e),
        }
    }
    Ok(())
}

fn parse_file(path: &Path, config: &Config) -> Result<ExamDraft> {
    let data = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path.to_string_lossy();
    let extractor = extractor_for(&filename);

    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let blocks = rt
        .block_on(extractor.extract(&data))
        .with_context(|| format!("Failed to extract blocks from {}", path.display()))?;

    Ok(parse_exam(&blocks, &filename, &config.recognizer))
}

/// Supported documents under `dir`, sorted by path.
fn collect_sources(dir: &Path) -> Vec<PathBuf> {
    let mut sources: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    constants::SUPPORTED_EXTENSIONS
                        .iter()
                        .any(|s| ext.eq_ignore_ascii_case(s))
                })
        })
        .collect();
    sources.sort();
    sources
}
