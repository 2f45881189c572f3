// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Definition & Validation
//!
//! The thin command-line surface over the pipeline. Parsing is clap's
//! job; validation (config file exists, date formats, export options are
//! coherent) happens here so the application layer only ever sees
//! well-formed input.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;

/// Errors produced while validating parsed arguments.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("--output requires --export")]
    OutputWithoutExport,

    #[error("Invalid argument: {0}")]
    Invalid(String),
}

/// Evidence ingestion and enrichment pipeline.
#[derive(Parser, Debug)]
#[command(name = "evidence-pipeline", version, about)]
pub struct Cli {
    /// Log level filter (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the ingestion pipeline once over all enabled connectors
    RunIngest {
        /// Path to the JSON configuration file
        #[arg(long)]
        config: PathBuf,
    },

    /// Classify documents with the external LLM and write enrichment back
    Enrich(EnrichArgs),

    /// Long-running enrichment worker draining the pending queue
    EnrichWorker(EnrichWorkerArgs),

    /// Search the metadata index
    Search(SearchArgs),
}

#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "configs/pipeline.json")]
    pub config: PathBuf,

    /// Enrich at most N pending documents
    #[arg(long, conflicts_with_all = ["all", "document", "report"])]
    pub batch: Option<u32>,

    /// Enrich every pending document
    #[arg(long, conflicts_with_all = ["document", "report"])]
    pub all: bool,

    /// Enrich a single document by id
    #[arg(long, conflicts_with = "report")]
    pub document: Option<String>,

    /// Print the enrichment report instead of analyzing
    #[arg(long)]
    pub report: bool,

    /// Analysis prompt; a built-in e-discovery prompt is used when omitted
    #[arg(long)]
    pub prompt: Option<String>,

    /// Skip creating classification/priority/topic tags
    #[arg(long)]
    pub no_tags: bool,

    /// Worker pool size
    #[arg(long, default_value_t = 5)]
    pub workers: usize,

    /// Write the enrichment CSV side-channel export to this path
    #[arg(long)]
    pub export: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EnrichWorkerArgs {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "configs/pipeline.json")]
    pub config: PathBuf,

    /// Drain one batch and exit instead of looping
    #[arg(long)]
    pub once: bool,

    /// Documents pulled per batch
    #[arg(long, default_value_t = 20)]
    pub batch_size: u32,

    /// Seconds to sleep when the pending queue is empty
    #[arg(long, default_value_t = 30)]
    pub sleep: u64,

    /// Print queue status and exit
    #[arg(long)]
    pub status: bool,

    /// Worker pool size
    #[arg(long, default_value_t = 5)]
    pub workers: usize,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "configs/pipeline.json")]
    pub config: PathBuf,

    /// Free-text query; omit to browse by filters alone
    pub query: Option<String>,

    /// Filter by custodian email
    #[arg(long, short = 'c')]
    pub custodian: Option<String>,

    /// Filter from date (YYYY-MM-DD)
    #[arg(long = "from")]
    pub date_from: Option<String>,

    /// Filter to date (YYYY-MM-DD)
    #[arg(long = "to")]
    pub date_to: Option<String>,

    /// Maximum results
    #[arg(long, short = 'l', default_value_t = 100)]
    pub limit: u32,

    /// Export format
    #[arg(long, value_enum)]
    pub export: Option<ExportFormat>,

    /// Export output file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Show store statistics instead of searching
    #[arg(long)]
    pub stats: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

/// Parses process arguments and applies validation beyond clap's typing.
pub fn parse_and_validate() -> Result<Cli, ParseError> {
    validate(Cli::parse())
}

fn validate(cli: Cli) -> Result<Cli, ParseError> {
    match &cli.command {
        Command::RunIngest { config } => {
            require_config(config)?;
        }
        Command::Enrich(args) => {
            require_config(&args.config)?;
            if args.workers == 0 || args.workers > 10 {
                return Err(ParseError::Invalid(
                    "--workers must be between 1 and 10".to_string(),
                ));
            }
        }
        Command::EnrichWorker(args) => {
            require_config(&args.config)?;
            if args.batch_size == 0 {
                return Err(ParseError::Invalid("--batch-size must be positive".to_string()));
            }
        }
        Command::Search(args) => {
            require_config(&args.config)?;
            for date in [&args.date_from, &args.date_to].into_iter().flatten() {
                validate_date(date)?;
            }
            if args.output.is_some() && args.export.is_none() {
                return Err(ParseError::OutputWithoutExport);
            }
        }
    }
    Ok(cli)
}

fn require_config(path: &PathBuf) -> Result<(), ParseError> {
    if !path.is_file() {
        return Err(ParseError::ConfigNotFound(path.clone()));
    }
    Ok(())
}

fn validate_date(value: &str) -> Result<(), ParseError> {
    let mut parts = value.split('-');
    let ok = matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(y), Some(m), Some(d), None)
            if y.len() == 4
                && m.len() == 2
                && d.len() == 2
                && y.chars().all(|c| c.is_ascii_digit())
                && m.chars().all(|c| c.is_ascii_digit())
                && d.chars().all(|c| c.is_ascii_digit())
    );
    if ok {
        Ok(())
    } else {
        Err(ParseError::InvalidDate(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_config() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{}").unwrap();
        file
    }

    #[test]
    fn test_run_ingest_requires_existing_config() {
        let cli = Cli::parse_from(["evidence-pipeline", "run-ingest", "--config", "/no/such/file"]);
        assert!(matches!(validate(cli), Err(ParseError::ConfigNotFound(_))));
    }

    #[test]
    fn test_search_parses_filters() {
        let config = temp_config();
        let cli = Cli::parse_from([
            "evidence-pipeline",
            "search",
            "quarterly earnings",
            "--config",
            config.path().to_str().unwrap(),
            "--custodian",
            "kate@example.com",
            "--from",
            "2025-01-01",
            "--to",
            "2025-12-31",
            "--limit",
            "25",
        ]);
        let cli = validate(cli).unwrap();
        match cli.command {
            Command::Search(args) => {
                assert_eq!(args.query.as_deref(), Some("quarterly earnings"));
                assert_eq!(args.limit, 25);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_search_rejects_bad_date() {
        let config = temp_config();
        let cli = Cli::parse_from([
            "evidence-pipeline",
            "search",
            "q",
            "--config",
            config.path().to_str().unwrap(),
            "--from",
            "01/02/2025",
        ]);
        assert!(matches!(validate(cli), Err(ParseError::InvalidDate(_))));
    }

    #[test]
    fn test_output_requires_export() {
        let config = temp_config();
        let cli = Cli::parse_from([
            "evidence-pipeline",
            "search",
            "q",
            "--config",
            config.path().to_str().unwrap(),
            "--output",
            "results.csv",
        ]);
        assert!(matches!(validate(cli), Err(ParseError::OutputWithoutExport)));
    }

    #[test]
    fn test_enrich_worker_defaults() {
        let config = temp_config();
        let cli = Cli::parse_from([
            "evidence-pipeline",
            "enrich-worker",
            "--config",
            config.path().to_str().unwrap(),
        ]);
        let cli = validate(cli).unwrap();
        match cli.command {
            Command::EnrichWorker(args) => {
                assert!(!args.once);
                assert_eq!(args.batch_size, 20);
                assert_eq!(args.sleep, 30);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_enrich_rejects_oversized_pool() {
        let config = temp_config();
        let cli = Cli::parse_from([
            "evidence-pipeline",
            "enrich",
            "--config",
            config.path().to_str().unwrap(),
            "--batch",
            "10",
            "--workers",
            "32",
        ]);
        assert!(matches!(validate(cli), Err(ParseError::Invalid(_))));
    }
}
