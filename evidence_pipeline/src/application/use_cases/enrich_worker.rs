// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `enrich-worker`: drains the pending queue batch by batch, optionally
//! looping with a configurable sleep when the queue is empty. The next
//! batch is never fetched before the current batch completes, and the
//! shutdown signal is observed between batches and across the idle
//! sleep. Also generates embeddings for documents that still lack one.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use evidence_bootstrap::ShutdownToken;
use evidence_domain::repositories::EnrichmentStore;
use evidence_domain::EvidenceError;

use crate::application::use_cases::enrich::{DEFAULT_ANALYSIS_PROMPT, HOT_DOCUMENT_THRESHOLD};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::repositories::build_metadata_store;
use crate::infrastructure::runtime::embedding_worker::EmbeddingWorker;
use crate::infrastructure::runtime::enrichment_worker::{EnrichmentJob, EnrichmentWorkerPool};
use crate::infrastructure::runtime::progress::ProgressRegistry;
use crate::infrastructure::services::llm_client::OpenAiCompatibleClient;

#[derive(Debug, Clone)]
pub struct WorkerParams {
    pub once: bool,
    pub batch_size: u32,
    pub sleep_secs: u64,
    pub status_only: bool,
    pub workers: usize,
}

pub async fn execute(
    config: &AppConfig,
    params: WorkerParams,
    shutdown: &ShutdownToken,
) -> Result<(), EvidenceError> {
    let store = build_metadata_store(&config.metadata_store).await?;

    if params.status_only {
        let report = store.enrichment_report(HOT_DOCUMENT_THRESHOLD).await?;
        let embedded = store.embedding_count().await?;
        println!(
            "pending: {}  analyzed: {}  embedded: {embedded}",
            report.pending, report.analyzed
        );
        return Ok(());
    }

    let llm = Arc::new(OpenAiCompatibleClient::from_env()?);
    let registry = Arc::new(ProgressRegistry::new());
    let pool = EnrichmentWorkerPool::new(
        store.clone(),
        llm.clone(),
        registry.clone(),
        params.workers,
    );
    let embedding_worker =
        EmbeddingWorker::new(store.clone(), llm, registry, params.workers);

    let mut total_processed = 0usize;
    loop {
        if shutdown.is_cancelled() {
            info!("worker shutting down");
            break;
        }

        let pending = store.pending_documents(params.batch_size).await?;
        if pending.is_empty() {
            // Keep embeddings current while the analysis queue is idle.
            embedding_worker.run(params.batch_size, shutdown).await?;

            if params.once {
                break;
            }
            info!("queue empty, sleeping {}s", params.sleep_secs);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(params.sleep_secs)) => {}
                _ = shutdown.cancelled() => break,
            }
            continue;
        }

        let batch_len = pending.len();
        let job = EnrichmentJob::new(
            pending.into_iter().map(|c| c.document_id).collect(),
            DEFAULT_ANALYSIS_PROMPT,
        );
        let progress = pool.run_job(job, shutdown).await?;
        total_processed += progress.processed;
        info!(
            "batch complete: {}/{batch_len} documents ({total_processed} total this session)",
            progress.processed
        );

        if params.once {
            embedding_worker.run(params.batch_size, shutdown).await?;
            break;
        }
    }

    println!("Processed {total_processed} documents");
    Ok(())
}
