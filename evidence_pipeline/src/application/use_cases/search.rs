// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `search`: hybrid query over the metadata index with optional CSV/JSON
//! export and a statistics view. The vector leg is attached only when
//! LLM credentials are present in the environment; otherwise the planner
//! runs text-rank only.

use chrono::{DateTime, NaiveDate, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use evidence_domain::repositories::{SearchHit, SearchQuery};
use evidence_domain::{EvidenceError, MetadataStore};

use crate::infrastructure::config::AppConfig;
use crate::infrastructure::repositories::build_metadata_store;
use crate::infrastructure::services::llm_client::{LanguageModelClient, OpenAiCompatibleClient};
use crate::infrastructure::services::search_planner::SearchPlanner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Option<String>,
    pub custodian: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub limit: u32,
    pub export: Option<(ExportFormat, PathBuf)>,
    pub stats: bool,
}

pub async fn execute(config: &AppConfig, params: SearchParams) -> Result<(), EvidenceError> {
    let store = build_metadata_store(&config.metadata_store).await?;

    if params.stats {
        let stats = store.statistics().await?;
        print_statistics(&stats);
        return Ok(());
    }

    // Vector similarity needs an embedder; fall back to text rank when no
    // credentials are configured.
    let embedder: Option<Arc<dyn LanguageModelClient>> = match OpenAiCompatibleClient::from_env() {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            debug!("no LLM credentials, text-rank search only: {err}");
            None
        }
    };
    let planner = SearchPlanner::new(store.pool().clone(), embedder);

    let query = SearchQuery {
        query_text: params.query.clone(),
        custodian: params.custodian.clone(),
        date_from: params.date_from.as_deref().map(day_start).transpose()?,
        date_to: params.date_to.as_deref().map(day_end).transpose()?,
        limit: params.limit,
        ..SearchQuery::default()
    };

    let hits = planner.search(&query).await?;

    match &params.export {
        Some((ExportFormat::Csv, path)) => export_csv(&hits, path)?,
        Some((ExportFormat::Json, path)) => export_json(&hits, path)?,
        None => print_hits(&hits),
    }
    Ok(())
}

fn day_start(date: &str) -> Result<DateTime<Utc>, EvidenceError> {
    parse_day(date)?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| EvidenceError::internal("day start out of range"))
}

fn day_end(date: &str) -> Result<DateTime<Utc>, EvidenceError> {
    parse_day(date)?
        .and_hms_opt(23, 59, 59)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| EvidenceError::internal("day end out of range"))
}

fn parse_day(date: &str) -> Result<NaiveDate, EvidenceError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| EvidenceError::config(format!("invalid date '{date}': {e}")))
}

fn print_hits(hits: &[SearchHit]) {
    if hits.is_empty() {
        println!("No results found.");
        return;
    }
    println!("Found {} document(s)\n", hits.len());
    for (index, hit) in hits.iter().enumerate() {
        println!("#{} | {}", index + 1, hit.document_id);
        println!("Subject:    {}", hit.subject.as_deref().unwrap_or("(none)"));
        println!(
            "From:       {}",
            hit.custodian_email.as_deref().unwrap_or("(unknown)")
        );
        println!("Date:       {}", hit.collected_at.to_rfc3339());
        println!("Source:     {}", hit.source);
        if let Some(relevance) = hit.relevance {
            println!("Relevance:  {relevance:.4}");
        }
        if let Some(classification) = &hit.ai_classification {
            println!("AI class:   {classification}");
        }
        if !hit.tags.is_empty() {
            println!("Tags:       {}", hit.tags.join(", "));
        }
        println!("{}", "-".repeat(80));
    }
}

fn export_csv(hits: &[SearchHit], path: &Path) -> Result<(), EvidenceError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| EvidenceError::storage(format!("{}: {e}", path.display())))?;
    writer
        .write_record([
            "document_id",
            "source",
            "subject",
            "collected_at",
            "custodian_email",
            "relevance",
            "ai_classification",
            "tags",
        ])
        .map_err(|e| EvidenceError::storage(e.to_string()))?;
    for hit in hits {
        writer
            .write_record([
                hit.document_id.as_str(),
                hit.source.as_str(),
                hit.subject.as_deref().unwrap_or(""),
                &hit.collected_at.to_rfc3339(),
                hit.custodian_email.as_deref().unwrap_or(""),
                &hit.relevance.map(|r| format!("{r:.4}")).unwrap_or_default(),
                hit.ai_classification.as_deref().unwrap_or(""),
                &hit.tags.join(";"),
            ])
            .map_err(|e| EvidenceError::storage(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| EvidenceError::storage(e.to_string()))?;
    println!("Exported {} results to {}", hits.len(), path.display());
    Ok(())
}

fn export_json(hits: &[SearchHit], path: &Path) -> Result<(), EvidenceError> {
    let rendered = serde_json::to_string_pretty(hits)?;
    std::fs::write(path, rendered)
        .map_err(|e| EvidenceError::storage(format!("{}: {e}", path.display())))?;
    println!("Exported {} results to {}", hits.len(), path.display());
    Ok(())
}

fn print_statistics(stats: &evidence_domain::repositories::StoreStatistics) {
    println!("Store statistics");
    println!("  total documents:  {}", stats.total_documents);
    println!("  total custodians: {}", stats.total_custodians);
    if let (Some(earliest), Some(latest)) = (stats.earliest, stats.latest) {
        println!("  date range:       {} .. {}", earliest.to_rfc3339(), latest.to_rfc3339());
    }
    if !stats.by_source.is_empty() {
        println!("  by source:");
        for (source, count) in &stats.by_source {
            println!("    {source:<30} {count:>6}");
        }
    }
    if !stats.top_custodians.is_empty() {
        println!("  top custodians:");
        for (email, count) in &stats.top_custodians {
            println!("    {email:<30} {count:>6}");
        }
    }
}
