// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Enrichment Worker Pool
//!
//! The throughput-critical path: a fixed-size pool classifying documents
//! through the external LLM and writing enrichment back transactionally.
//!
//! The submitter hands every document id of a job to the pool; a
//! semaphore bounds concurrency to the configured worker count (hard cap
//! 10). The LLM client is shared across workers (documented
//! thread-safe); each store operation draws its own pooled connection, so
//! transactions never span workers. All progress mutations - counters,
//! the `results` sequence, the `redactions` sequence - go through the
//! job's progress lock; `results` is insertion-ordered by completion.
//!
//! Per document: load content, compose the structured prompt, call the
//! model (temperature 0.3, ~700 token cap), parse with defaults on any
//! missing field, upsert the analysis row, append the full response to
//! the review notes, create tags when requested - analysis, note, and
//! tags land in one transaction - and optionally issue the second
//! redaction call whose output stays on the job. A missing document or a
//! failed call skips that unit and still advances progress.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

use evidence_bootstrap::ShutdownToken;
use evidence_domain::repositories::{DocumentContent, EnrichmentStore};
use evidence_domain::{DocumentEnrichment, DocumentId, EvidenceError};

use crate::infrastructure::runtime::progress::{
    DocumentOutcome, JobProgress, ProgressRegistry, RedactionOutcome,
};
use crate::infrastructure::services::llm_client::{ChatRequest, LanguageModelClient};
use crate::infrastructure::services::response_parser::{
    analysis_system_prompt, default_topic_rules, derive_tags, derive_topics, parse_analysis,
    parse_redaction, redaction_system_prompt, TopicRule,
};

/// Hard ceiling on pool size.
pub const MAX_WORKERS: usize = 10;
const ANALYSIS_TEMPERATURE: f32 = 0.3;
const ANALYSIS_MAX_TOKENS: u32 = 700;
const REDACTION_TEMPERATURE: f32 = 0.1;
const REDACTION_MAX_TOKENS: u32 = 1500;

/// Per-job options.
#[derive(Debug, Clone)]
pub struct EnrichmentOptions {
    pub create_tags: bool,
    pub redaction_mode: bool,
    pub redaction_prompt: String,
}

impl Default for EnrichmentOptions {
    fn default() -> Self {
        Self {
            create_tags: true,
            redaction_mode: false,
            redaction_prompt: String::new(),
        }
    }
}

/// One enrichment job: a set of document ids and the analysis prompt.
#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub id: Uuid,
    pub document_ids: Vec<String>,
    pub prompt: String,
    pub options: EnrichmentOptions,
}

impl EnrichmentJob {
    pub fn new(document_ids: Vec<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_ids,
            prompt: prompt.into(),
            options: EnrichmentOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EnrichmentOptions) -> Self {
        self.options = options;
        self
    }
}

struct JobContext {
    job: EnrichmentJob,
    store: Arc<dyn EnrichmentStore>,
    llm: Arc<dyn LanguageModelClient>,
    registry: Arc<ProgressRegistry>,
    topic_rules: Vec<TopicRule>,
}

/// Fixed-size worker pool over a shared store and LLM client.
pub struct EnrichmentWorkerPool {
    store: Arc<dyn EnrichmentStore>,
    llm: Arc<dyn LanguageModelClient>,
    registry: Arc<ProgressRegistry>,
    worker_count: usize,
    topic_rules: Vec<TopicRule>,
}

impl EnrichmentWorkerPool {
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
            worker_count: worker_count.clamp(1, MAX_WORKERS),
            topic_rules: default_topic_rules(),
        }
    }

    pub fn with_topic_rules(mut self, topic_rules: Vec<TopicRule>) -> Self {
        self.topic_rules = topic_rules;
        self
    }

    /// Runs a job to completion, fanning documents out across the pool.
    /// Cancellation is observed before each document is dispatched;
    /// in-flight documents finish and their writes remain durable.
    pub async fn run_job(
        &self,
        job: EnrichmentJob,
        shutdown: &ShutdownToken,
    ) -> Result<JobProgress, EvidenceError> {
        let job_id = job.id;
        let total = job.document_ids.len();
        self.registry.start_job(job_id, total);
        info!(
            "enrichment job {job_id}: {total} documents, {} workers",
            self.worker_count
        );

        let context = Arc::new(JobContext {
            job,
            store: self.store.clone(),
            llm: self.llm.clone(),
            registry: self.registry.clone(),
            topic_rules: self.topic_rules.clone(),
        });

        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut tasks = JoinSet::new();

        for document_id in context.job.document_ids.clone() {
            if shutdown.is_cancelled() {
                warn!("enrichment job {job_id}: shutdown requested, not dispatching further work");
                break;
            }
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| EvidenceError::internal(format!("worker semaphore: {e}")))?;
            let context = context.clone();
            tasks.spawn(async move {
                let _permit = permit;
                process_document(&context, &document_id).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                error!("enrichment worker panicked: {err}");
            }
        }

        self.registry.complete(job_id);
        let progress = self
            .registry
            .snapshot(job_id)
            .ok_or_else(|| EvidenceError::internal("job progress evicted mid-run"))?;
        info!(
            "enrichment job {job_id} complete: {}/{} documents",
            progress.processed, progress.total
        );
        Ok(progress)
    }
}

/// Analyzes a single document; every terminal outcome advances the
/// processed counter.
async fn process_document(context: &JobContext, document_id: &str) {
    let registry = &context.registry;
    let job_id = context.job.id;

    registry.update(job_id, |progress| {
        progress.current_document = Some(document_id.to_string());
    });

    let content = match context.store.document_content(document_id).await {
        Ok(Some(content)) => content,
        Ok(None) => {
            warn!("document {document_id} not found, skipping");
            record_skip(context, document_id, None);
            return;
        }
        Err(err) => {
            error!("loading {document_id}: {err}");
            record_skip(context, document_id, None);
            return;
        }
    };

    registry.update(job_id, |progress| {
        progress.current_subject = content.subject.clone();
    });

    match enrich_one(context, &content).await {
        Ok(outcome) => {
            registry.update(job_id, |progress| {
                progress.results.push(outcome);
                progress.processed += 1;
            });
        }
        Err(err) => {
            error!("enriching {document_id}: {err}");
            record_skip(context, document_id, content.subject.clone());
        }
    }
}

fn record_skip(context: &JobContext, document_id: &str, subject: Option<String>) {
    context.registry.update(context.job.id, |progress| {
        progress.results.push(DocumentOutcome {
            document_id: document_id.to_string(),
            subject,
            relevance: 0,
            privilege_risk: 0,
            classification: String::new(),
            key_findings: String::new(),
            redacted: false,
            failed: true,
        });
        progress.processed += 1;
    });
}

async fn enrich_one(
    context: &JobContext,
    content: &DocumentContent,
) -> Result<DocumentOutcome, EvidenceError> {
    let user_content = format!(
        "Subject: {}\n\nBody:\n{}",
        content.subject.as_deref().unwrap_or("No Subject"),
        content.body_text.as_deref().unwrap_or("No content"),
    );

    let response = context
        .llm
        .complete(&ChatRequest {
            system_prompt: analysis_system_prompt(&context.job.prompt),
            user_content: user_content.clone(),
            temperature: ANALYSIS_TEMPERATURE,
            max_tokens: ANALYSIS_MAX_TOKENS,
        })
        .await?;

    let parsed = parse_analysis(&response);
    let topics = derive_topics(&response, &context.job.prompt, &context.topic_rules);

    let enrichment = DocumentEnrichment {
        document_id: DocumentId::new(content.document_id.clone())?,
        summary: parsed.summary_from(&response),
        entities: Vec::new(),
        relevance_score: parsed.relevance_score,
        classification: parsed.classification,
        privilege_risk: parsed.privilege_risk,
        topics: topics.clone(),
        action_items: Vec::new(),
        review_notes: String::new(),
        analyzed_at: Utc::now(),
    };

    let review_note = format!("Custom Analysis:\n{response}");
    let tags = if context.job.options.create_tags {
        derive_tags(&parsed, &topics)
    } else {
        Vec::new()
    };

    context
        .store
        .save_enrichment(&enrichment, &review_note, &tags)
        .await?;

    let mut redacted = false;
    if context.job.options.redaction_mode && !context.job.options.redaction_prompt.is_empty() {
        match redact_one(context, content, &user_content).await {
            Ok(outcome) => {
                redacted = true;
                context.registry.update(context.job.id, |progress| {
                    progress.redactions.push(outcome);
                });
            }
            Err(err) => warn!("redacting {}: {err}", content.document_id),
        }
    }

    Ok(DocumentOutcome {
        document_id: content.document_id.clone(),
        subject: content.subject.clone(),
        relevance: parsed.relevance_score,
        privilege_risk: parsed.privilege_risk,
        classification: parsed.classification.to_string(),
        key_findings: parsed.key_findings.chars().take(200).collect(),
        redacted,
        failed: false,
    })
}

async fn redact_one(
    context: &JobContext,
    content: &DocumentContent,
    user_content: &str,
) -> Result<RedactionOutcome, EvidenceError> {
    let response = context
        .llm
        .complete(&ChatRequest {
            system_prompt: redaction_system_prompt(&context.job.options.redaction_prompt),
            user_content: user_content.to_string(),
            temperature: REDACTION_TEMPERATURE,
            max_tokens: REDACTION_MAX_TOKENS,
        })
        .await?;

    let parsed = parse_redaction(&response);
    Ok(RedactionOutcome {
        document_id: content.document_id.clone(),
        original_subject: content.subject.clone(),
        original_body: content.body_text.clone(),
        redacted_subject: parsed
            .redacted_subject
            .or_else(|| content.subject.clone())
            .unwrap_or_default(),
        redacted_body: parsed
            .redacted_body
            .or_else(|| content.body_text.clone())
            .unwrap_or_default(),
        redaction_summary: parsed.summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::repositories::{schema, SqliteMetadataRepository};
    use crate::infrastructure::services::llm_client::ScriptedLanguageModelClient;
    use chrono::TimeZone;
    use evidence_domain::{Custodian, EvidenceDocument, MetadataStore};
    use sqlx::Row;

    async fn seeded_repository(ids: &[&str]) -> Arc<SqliteMetadataRepository> {
        let pool = schema::initialize_database("sqlite::memory:").await.unwrap();
        let repo = Arc::new(SqliteMetadataRepository::from_pool(pool));
        let docs: Vec<EvidenceDocument> = ids
            .iter()
            .enumerate()
            .map(|(idx, id)| {
                EvidenceDocument::new(
                    DocumentId::new(*id).unwrap(),
                    "test",
                    Utc.with_ymd_and_hms(2025, 1, 1, 0, idx as u32, 0).unwrap(),
                    Custodian::from_email("kate@example.com"),
                )
                .with_subject(format!("Subject {id}"))
                .with_body_text(format!("Body {id}"))
            })
            .collect();
        repo.bulk_index(&docs).await.unwrap();
        repo
    }

    fn pool_with(
        repo: Arc<SqliteMetadataRepository>,
        llm: Arc<dyn LanguageModelClient>,
        workers: usize,
    ) -> EnrichmentWorkerPool {
        EnrichmentWorkerPool::new(repo, llm, Arc::new(ProgressRegistry::new()), workers)
    }

    const STRUCTURED_RESPONSE: &str = "RELEVANCE: 85\nPRIVILEGE_RISK: 10\n\
        CLASSIFICATION: relevant\nKEY FINDINGS: fraud indicators present\nANALYSIS: detailed.";

    #[tokio::test]
    async fn test_job_enriches_all_documents() {
        let repo = seeded_repository(&["d1", "d2", "d3"]).await;
        let llm = Arc::new(ScriptedLanguageModelClient::constant(STRUCTURED_RESPONSE));
        let pool = pool_with(repo.clone(), llm, 3);

        let job = EnrichmentJob::new(
            vec!["d1".into(), "d2".into(), "d3".into()],
            "Review for responsiveness.",
        );
        let progress = pool.run_job(job, &ShutdownToken::inert()).await.unwrap();

        assert!(progress.completed);
        assert_eq!(progress.total, 3);
        assert_eq!(progress.processed, 3);
        assert_eq!(progress.results.len(), 3);
        assert!(progress.results.iter().all(|r| !r.failed));
        assert!(repo.pending_documents(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_writes_defaults_and_tags() {
        let repo = seeded_repository(&["d1"]).await;
        let llm = Arc::new(ScriptedLanguageModelClient::constant("I cannot answer."));
        let pool = pool_with(repo.clone(), llm, 2);

        let job = EnrichmentJob::new(vec!["d1".into()], "Assess importance.");
        let progress = pool.run_job(job, &ShutdownToken::inert()).await.unwrap();

        assert_eq!(progress.processed, 1);
        let result = &progress.results[0];
        assert_eq!(result.relevance, 50);
        assert_eq!(result.classification, "needs-review");

        let notes: String =
            sqlx::query_scalar("SELECT review_notes FROM user_review WHERE document_id = 'd1'")
                .fetch_one(repo.pool())
                .await
                .unwrap();
        assert!(notes.contains("Custom Analysis:\nI cannot answer."));

        let mut tags: Vec<String> = sqlx::query(
            "SELECT tag_name FROM user_tags WHERE document_id = 'd1' ORDER BY tag_name",
        )
        .fetch_all(repo.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.get("tag_name"))
        .collect();
        tags.sort();
        assert_eq!(tags, vec!["AI: Needs Review", "Medium Priority"]);
    }

    #[tokio::test]
    async fn test_missing_document_is_skipped_and_counted() {
        let repo = seeded_repository(&["d1"]).await;
        let llm = Arc::new(ScriptedLanguageModelClient::constant(STRUCTURED_RESPONSE));
        let pool = pool_with(repo.clone(), llm, 1);

        let job = EnrichmentJob::new(vec!["d1".into(), "ghost".into()], "Review.");
        let progress = pool.run_job(job, &ShutdownToken::inert()).await.unwrap();

        assert_eq!(progress.processed, 2);
        let failed: Vec<_> = progress.results.iter().filter(|r| r.failed).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].document_id, "ghost");
    }

    #[tokio::test]
    async fn test_llm_error_skips_unit_without_write() {
        let repo = seeded_repository(&["d1"]).await;
        let llm = Arc::new(ScriptedLanguageModelClient::with_queue(
            vec![Err(EvidenceError::auth("bad key"))],
            STRUCTURED_RESPONSE,
        ));
        let pool = pool_with(repo.clone(), llm, 1);

        let job = EnrichmentJob::new(vec!["d1".into()], "Review.");
        let progress = pool.run_job(job, &ShutdownToken::inert()).await.unwrap();

        assert_eq!(progress.processed, 1);
        assert!(progress.results[0].failed);
        // Nothing was written for the failed unit.
        assert_eq!(repo.pending_documents(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_redaction_mode_collects_redactions() {
        let repo = seeded_repository(&["d1"]).await;
        let llm = Arc::new(ScriptedLanguageModelClient::with_queue(
            vec![
                Ok(STRUCTURED_RESPONSE.to_string()),
                Ok("REDACTION_SUMMARY: one SSN\nREDACTED_SUBJECT: Subject [REDACTED]\n\
                    REDACTED_BODY: Body [REDACTED - SSN]"
                    .to_string()),
            ],
            STRUCTURED_RESPONSE,
        ));
        let pool = pool_with(repo.clone(), llm, 1);

        let job = EnrichmentJob::new(vec!["d1".into()], "Review.").with_options(EnrichmentOptions {
            create_tags: false,
            redaction_mode: true,
            redaction_prompt: "Redact SSNs".to_string(),
        });
        let progress = pool.run_job(job, &ShutdownToken::inert()).await.unwrap();

        assert_eq!(progress.redactions.len(), 1);
        let redaction = &progress.redactions[0];
        assert_eq!(redaction.document_id, "d1");
        assert_eq!(redaction.redacted_subject, "Subject [REDACTED]");
        assert_eq!(redaction.redaction_summary, "one SSN");
        assert!(progress.results[0].redacted);

        // create_tags=false leaves the tag table empty.
        let tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_tags")
            .fetch_one(repo.pool())
            .await
            .unwrap();
        assert_eq!(tags, 0);
    }

    #[tokio::test]
    async fn test_worker_count_is_clamped() {
        let repo = seeded_repository(&[]).await;
        let llm = Arc::new(ScriptedLanguageModelClient::constant(""));
        let pool = pool_with(repo, llm, 64);
        assert_eq!(pool.worker_count, MAX_WORKERS);
    }
}
