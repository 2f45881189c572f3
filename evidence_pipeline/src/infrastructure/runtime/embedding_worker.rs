// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Embedding Generator
//!
//! Companion worker to the enrichment pool, using the same job/progress
//! pattern: pulls documents with a NULL embedding in batches, embeds
//! `subject + sender + body` through the external embedding API, and
//! upserts the vector with its model name. The next batch is not fetched
//! until the current batch completes, which bounds the pending-fetch
//! query by the batch size.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use evidence_bootstrap::ShutdownToken;
use evidence_domain::repositories::{DocumentContent, EnrichmentStore};
use evidence_domain::EvidenceError;

use crate::infrastructure::runtime::progress::ProgressRegistry;
use crate::infrastructure::services::llm_client::LanguageModelClient;

/// Outcome of one embedding run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddingRunSummary {
    pub generated: u64,
    pub failed: u64,
}

pub struct EmbeddingWorker {
    store: Arc<dyn EnrichmentStore>,
    llm: Arc<dyn LanguageModelClient>,
    registry: Arc<ProgressRegistry>,
    worker_count: usize,
}

impl EmbeddingWorker {
    pub fn new(
        store: Arc<dyn EnrichmentStore>,
        llm: Arc<dyn LanguageModelClient>,
        registry: Arc<ProgressRegistry>,
        worker_count: usize,
    ) -> Self {
        Self {
            store,
            llm,
            registry,
            worker_count: worker_count.clamp(1, super::enrichment_worker::MAX_WORKERS),
        }
    }

    /// Embeds pending documents batch by batch until none remain or
    /// shutdown is requested.
    pub async fn run(
        &self,
        batch_size: u32,
        shutdown: &ShutdownToken,
    ) -> Result<EmbeddingRunSummary, EvidenceError> {
        let mut summary = EmbeddingRunSummary::default();

        loop {
            if shutdown.is_cancelled() {
                info!("embedding run interrupted by shutdown");
                break;
            }

            let batch = self.store.documents_missing_embeddings(batch_size).await?;
            if batch.is_empty() {
                break;
            }
            info!("embedding batch of {} documents", batch.len());

            let (generated, failed) = self.run_batch(batch, shutdown).await?;
            summary.generated += generated;
            summary.failed += failed;

            // A batch where nothing succeeded would refetch the same
            // documents forever.
            if generated == 0 {
                warn!("embedding batch made no progress, stopping");
                break;
            }
        }

        info!(
            "embedding run finished: {} generated, {} failed",
            summary.generated, summary.failed
        );
        Ok(summary)
    }

    async fn run_batch(
        &self,
        batch: Vec<DocumentContent>,
        shutdown: &ShutdownToken,
    ) -> Result<(u64, u64), EvidenceError> {
        let job_id = Uuid::new_v4();
        self.registry.start_job(job_id, batch.len());

        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut tasks: JoinSet<bool> = JoinSet::new();

        for content in batch {
            if shutdown.is_cancelled() {
                break;
            }
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EvidenceError::internal(format!("worker semaphore: {e}")))?;
            let store = self.store.clone();
            let llm = self.llm.clone();
            let registry = self.registry.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let ok = embed_document(store.as_ref(), llm.as_ref(), &content).await;
                registry.update(job_id, |progress| {
                    progress.processed += 1;
                });
                ok
            });
        }

        let mut generated = 0u64;
        let mut failed = 0u64;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => generated += 1,
                Ok(false) => failed += 1,
                Err(err) => {
                    error!("embedding worker panicked: {err}");
                    failed += 1;
                }
            }
        }

        self.registry.complete(job_id);
        Ok((generated, failed))
    }
}

async fn embed_document(
    store: &dyn EnrichmentStore,
    llm: &dyn LanguageModelClient,
    content: &DocumentContent,
) -> bool {
    let text = format!(
        "Subject: {}\n\nFrom: {}\n\n{}",
        content.subject.as_deref().unwrap_or("No Subject"),
        content.custodian_email.as_deref().unwrap_or(""),
        content.body_text.as_deref().unwrap_or(""),
    );

    let embedding = match llm.embed(&text).await {
        Ok(embedding) => embedding,
        Err(err) => {
            warn!("embedding {}: {err}", content.document_id);
            return false;
        }
    };

    match store
        .store_embedding(&content.document_id, &embedding, llm.embedding_model())
        .await
    {
        Ok(()) => true,
        Err(err) => {
            warn!("storing embedding for {}: {err}", content.document_id);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::{schema, SqliteMetadataRepository};
    use crate::infrastructure::services::llm_client::ScriptedLanguageModelClient;
    use chrono::{TimeZone, Utc};
    use evidence_domain::{Custodian, DocumentId, EvidenceDocument, MetadataStore};

    async fn seeded_repository(count: usize) -> Arc<SqliteMetadataRepository> {
        let pool = schema::initialize_database("sqlite::memory:").await.unwrap();
        let repo = Arc::new(SqliteMetadataRepository::from_pool(pool));
        let docs: Vec<EvidenceDocument> = (0..count)
            .map(|idx| {
                EvidenceDocument::new(
                    DocumentId::new(format!("d{idx}")).unwrap(),
                    "test",
                    Utc.with_ymd_and_hms(2025, 1, 1, 0, idx as u32, 0).unwrap(),
                    Custodian::from_email("kate@example.com"),
                )
                .with_subject(format!("Subject {idx}"))
                .with_body_text("body")
            })
            .collect();
        repo.bulk_index(&docs).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn test_embeds_all_pending_documents() {
        let repo = seeded_repository(5).await;
        let llm = Arc::new(
            ScriptedLanguageModelClient::constant("").with_embedding(vec![1.0, 0.0, 0.5]),
        );
        let worker = EmbeddingWorker::new(
            repo.clone(),
            llm,
            Arc::new(ProgressRegistry::new()),
            3,
        );

        let summary = worker.run(2, &ShutdownToken::inert()).await.unwrap();
        assert_eq!(summary.generated, 5);
        assert_eq!(summary.failed, 0);
        assert_eq!(repo.embedding_count().await.unwrap(), 5);
        assert!(repo.documents_missing_embeddings(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_pending_documents_is_noop() {
        let repo = seeded_repository(0).await;
        let llm = Arc::new(ScriptedLanguageModelClient::constant(""));
        let worker = EmbeddingWorker::new(
            repo.clone(),
            llm,
            Arc::new(ProgressRegistry::new()),
            2,
        );

        let summary = worker.run(10, &ShutdownToken::inert()).await.unwrap();
        assert_eq!(summary, EmbeddingRunSummary::default());
    }
}
