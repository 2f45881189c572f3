// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Binary entry point: bootstrap parses and validates the CLI, this file
//! composes the layers and maps results onto exit codes (0 success, 1
//! configuration or fatal runtime error).

use evidence_bootstrap::{parse_and_validate, result_to_exit_code, signals, Command};
use evidence_pipeline::application::use_cases::{enrich, enrich_worker, run_ingest, search};
use evidence_pipeline::infrastructure::{config::AppConfig, logging};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = match parse_and_validate() {
        Ok(cli) => cli,
        Err(err) => {
            eprintln!("Error: {err}");
            return evidence_bootstrap::ExitCode::Failure.into();
        }
    };

    logging::init(&cli.log_level);
    let shutdown = signals::install_shutdown_handler();

    let result = run(cli, shutdown).await;
    result_to_exit_code(result)
}

async fn run(
    cli: evidence_bootstrap::Cli,
    shutdown: evidence_bootstrap::ShutdownToken,
) -> anyhow::Result<()> {
    match cli.command {
        Command::RunIngest { config } => {
            let config = AppConfig::from_json_file(&config)?;
            run_ingest::execute(&config).await?;
        }
        Command::Enrich(args) => {
            let config = AppConfig::from_json_file(&args.config)?;
            let action = if args.report {
                enrich::EnrichAction::Report
            } else if let Some(path) = args.export {
                enrich::EnrichAction::Export(path)
            } else if let Some(document_id) = args.document {
                enrich::EnrichAction::Document(document_id)
            } else if args.all {
                enrich::EnrichAction::All
            } else {
                enrich::EnrichAction::Batch(args.batch.unwrap_or(10))
            };
            let params = enrich::EnrichParams {
                action,
                prompt: args.prompt,
                create_tags: !args.no_tags,
                workers: args.workers,
            };
            enrich::execute(&config, params, &shutdown).await?;
        }
        Command::EnrichWorker(args) => {
            let config = AppConfig::from_json_file(&args.config)?;
            let params = enrich_worker::WorkerParams {
                once: args.once,
                batch_size: args.batch_size,
                sleep_secs: args.sleep,
                status_only: args.status,
                workers: args.workers,
            };
            enrich_worker::execute(&config, params, &shutdown).await?;
        }
        Command::Search(args) => {
            let config = AppConfig::from_json_file(&args.config)?;
            let export = match (args.export, args.output) {
                (Some(format), Some(output)) => {
                    let format = match format {
                        evidence_bootstrap::cli::ExportFormat::Csv => search::ExportFormat::Csv,
                        evidence_bootstrap::cli::ExportFormat::Json => search::ExportFormat::Json,
                    };
                    Some((format, output))
                }
                _ => None,
            };
            let params = search::SearchParams {
                query: args.query,
                custodian: args.custodian,
                date_from: args.date_from,
                date_to: args.date_to,
                limit: args.limit,
                export,
                stats: args.stats,
            };
            search::execute(&config, params).await?;
        }
    }
    Ok(())
}
