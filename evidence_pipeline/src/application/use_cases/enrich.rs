// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `enrich`: classify pending documents, print the report, or write the
//! CSV side-channel export.

use std::path::Path;
use std::sync::Arc;

use evidence_bootstrap::ShutdownToken;
use evidence_domain::repositories::EnrichmentStore;
use evidence_domain::EvidenceError;

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::repositories::build_metadata_store;
use crate::infrastructure::runtime::enrichment_worker::{
    EnrichmentJob, EnrichmentOptions, EnrichmentWorkerPool,
};
use crate::infrastructure::runtime::progress::ProgressRegistry;
use crate::infrastructure::services::llm_client::OpenAiCompatibleClient;
use crate::infrastructure::services::loadfile::EnrichmentExporter;

/// Relevance bar for a hot document.
pub const HOT_DOCUMENT_THRESHOLD: u8 = 70;

/// The built-in analysis prompt used when the operator does not supply
/// one.
pub const DEFAULT_ANALYSIS_PROMPT: &str = "Analyze this email for e-discovery purposes. \
    Assess how relevant it is to potential litigation, the likelihood it is \
    attorney-client privileged, and summarize the key findings an attorney \
    should focus on.";

/// What the enrich verb should do.
#[derive(Debug, Clone)]
pub enum EnrichAction {
    Batch(u32),
    All,
    Document(String),
    Report,
    Export(std::path::PathBuf),
}

#[derive(Debug, Clone)]
pub struct EnrichParams {
    pub action: EnrichAction,
    pub prompt: Option<String>,
    pub create_tags: bool,
    pub workers: usize,
}

pub async fn execute(
    config: &AppConfig,
    params: EnrichParams,
    shutdown: &ShutdownToken,
) -> Result<(), EvidenceError> {
    let store = build_metadata_store(&config.metadata_store).await?;

    match &params.action {
        EnrichAction::Report => {
            let report = store.enrichment_report(HOT_DOCUMENT_THRESHOLD).await?;
            print_report(&report);
            Ok(())
        }
        EnrichAction::Export(path) => export(store.as_ref(), path).await,
        action => {
            let document_ids = match action {
                EnrichAction::Batch(limit) => ids_of(store.pending_documents(*limit).await?),
                EnrichAction::All => ids_of(store.pending_documents(u32::MAX).await?),
                EnrichAction::Document(id) => vec![id.clone()],
                _ => unreachable!("handled above"),
            };

            if document_ids.is_empty() {
                println!("No pending documents to enrich.");
                return Ok(());
            }

            let llm = Arc::new(OpenAiCompatibleClient::from_env()?);
            let pool = EnrichmentWorkerPool::new(
                store,
                llm,
                Arc::new(ProgressRegistry::new()),
                params.workers,
            );

            let prompt = params
                .prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_ANALYSIS_PROMPT.to_string());
            let job = EnrichmentJob::new(document_ids, prompt).with_options(EnrichmentOptions {
                create_tags: params.create_tags,
                ..EnrichmentOptions::default()
            });

            let progress = pool.run_job(job, shutdown).await?;

            let succeeded = progress.results.iter().filter(|r| !r.failed).count();
            let failed = progress.results.len() - succeeded;
            println!(
                "Enriched {succeeded}/{} documents ({failed} failed)",
                progress.total
            );
            for result in progress.results.iter().filter(|r| !r.failed) {
                println!(
                    "  {:<40} {:>3}/100  {}",
                    result.document_id, result.relevance, result.classification
                );
            }
            Ok(())
        }
    }
}

async fn export(store: &dyn EnrichmentStore, path: &Path) -> Result<(), EvidenceError> {
    let rows = store.export_rows().await?;
    if rows.is_empty() {
        println!("No enriched documents to export.");
        return Ok(());
    }
    EnrichmentExporter::new()
        .with_hot_threshold(HOT_DOCUMENT_THRESHOLD)
        .export_to_file(path, &rows)?;
    println!("Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

fn ids_of(contents: Vec<evidence_domain::repositories::DocumentContent>) -> Vec<String> {
    contents.into_iter().map(|c| c.document_id).collect()
}

fn print_report(report: &evidence_domain::repositories::EnrichmentReport) {
    println!("Enrichment report");
    println!("  total documents:     {}", report.total_documents);
    println!("  analyzed:            {}", report.analyzed);
    println!("  pending:             {}", report.pending);
    println!("  hot documents:       {}", report.hot_documents);
    println!("  high privilege risk: {}", report.high_privilege_risk);
    if !report.by_classification.is_empty() {
        println!("  by classification:");
        for (classification, count) in &report.by_classification {
            println!("    {classification:<20} {count}");
        }
    }
}
