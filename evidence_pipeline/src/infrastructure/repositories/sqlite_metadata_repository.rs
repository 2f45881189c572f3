// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SQLite Metadata Repository
//!
//! Concrete adapter for the `MetadataStore` and `EnrichmentStore` ports
//! over sqlx/SQLite.
//!
//! A bulk index processes its batch in one transaction: upsert each
//! custodian, upsert the document (capturing its surrogate id),
//! delete-then-insert the document's attachments, and insert custody
//! events with `ON CONFLICT DO NOTHING`. Any failure rolls the whole
//! batch back - no partial batch is ever visible, and re-running the same
//! batch only bumps `indexed_at`.
//!
//! Enrichment writes are equally transactional: the analysis upsert, the
//! review-note append, and the tag inserts land together or not at all.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use evidence_domain::repositories::{
    DocumentContent, EnrichmentExportRow, EnrichmentReport, EnrichmentStore, MetadataStore,
    SearchHit, SearchQuery, StoreStatistics,
};
use evidence_domain::{DocumentEnrichment, EvidenceDocument, EvidenceError};

use crate::infrastructure::repositories::embedding_codec::encode_embedding;
use crate::infrastructure::repositories::schema;
use crate::infrastructure::services::search_planner::SearchPlanner;

/// Sentinel separating successive analysis appends in review notes.
pub const REVIEW_NOTE_SEPARATOR: &str = "\n\n--- Custom AI Analysis ---\n";

pub struct SqliteMetadataRepository {
    pool: SqlitePool,
}

impl SqliteMetadataRepository {
    /// Opens (creating and migrating if needed) the metadata database with
    /// default pool bounds.
    ///
    /// Accepts a file path, `:memory:`, or a full `sqlite://` URL.
    pub async fn new(database_path: &str) -> Result<Self, EvidenceError> {
        Self::with_pool_limits(database_path, 1, 10).await
    }

    /// `new` with explicit connection-pool bounds.
    pub async fn with_pool_limits(
        database_path: &str,
        min_connections: u32,
        max_connections: u32,
    ) -> Result<Self, EvidenceError> {
        let database_url = if database_path == ":memory:" || database_path.starts_with("sqlite:") {
            if database_path == ":memory:" {
                "sqlite::memory:".to_string()
            } else {
                database_path.to_string()
            }
        } else {
            if let Some(parent) = std::path::Path::new(database_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| EvidenceError::storage(e.to_string()))?;
                }
            }
            format!("sqlite://{database_path}")
        };

        let pool = schema::initialize_database_sized(&database_url, min_connections, max_connections)
            .await
            .map_err(|e| {
                EvidenceError::database(format!("failed to initialize {database_path}: {e}"))
            })?;
        debug!("connected metadata repository at {database_path}");
        Ok(Self { pool })
    }

    /// Wraps an already-initialized pool (tests, shared pools).
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn timestamp(value: DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    fn event_timestamp(value: DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    async fn upsert_custodian(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        document: &EvidenceDocument,
    ) -> Result<i64, EvidenceError> {
        let row = sqlx::query(
            r#"
            INSERT INTO custodians (identifier, display_name, email)
            VALUES (?, ?, ?)
            ON CONFLICT (identifier) DO UPDATE SET
                display_name = excluded.display_name,
                email = excluded.email,
                updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            RETURNING id
            "#,
        )
        .bind(document.custodian().identifier())
        .bind(document.custodian().display_name())
        .bind(document.custodian().email())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| EvidenceError::database(format!("upsert custodian: {e}")))?;
        row.try_get::<i64, _>("id")
            .map_err(|e| EvidenceError::database(e.to_string()))
    }

    async fn upsert_document(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        document: &EvidenceDocument,
        custodian_id: i64,
    ) -> Result<i64, EvidenceError> {
        let metadata_json = serde_json::to_string(document.metadata())?;
        let row = sqlx::query(
            r#"
            INSERT INTO documents (
                document_id, source, custodian_id, subject, body_text,
                raw_path, collected_at, metadata_json
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (document_id) DO UPDATE SET
                source = excluded.source,
                custodian_id = excluded.custodian_id,
                subject = excluded.subject,
                body_text = excluded.body_text,
                raw_path = excluded.raw_path,
                collected_at = excluded.collected_at,
                metadata_json = excluded.metadata_json,
                indexed_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            RETURNING id
            "#,
        )
        .bind(document.document_id().as_str())
        .bind(document.source())
        .bind(custodian_id)
        .bind(document.subject())
        .bind(document.body_text())
        .bind(document.raw_path())
        .bind(Self::timestamp(document.collected_at()))
        .bind(metadata_json)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| EvidenceError::database(format!("upsert document: {e}")))?;
        row.try_get::<i64, _>("id")
            .map_err(|e| EvidenceError::database(e.to_string()))
    }

    async fn replace_attachments(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        document: &EvidenceDocument,
        document_row_id: i64,
    ) -> Result<(), EvidenceError> {
        sqlx::query("DELETE FROM attachments WHERE document_id = ?")
            .bind(document_row_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| EvidenceError::database(format!("clear attachments: {e}")))?;

        for attachment in document.attachments() {
            sqlx::query(
                r#"
                INSERT INTO attachments (
                    document_id, filename, content_type, size_bytes,
                    checksum_sha256, file_category, data_quality
                )
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(document_row_id)
            .bind(attachment.filename())
            .bind(attachment.content_type())
            .bind(attachment.size_bytes() as i64)
            .bind(attachment.checksum_sha256())
            .bind(attachment.file_category())
            .bind(attachment.data_quality())
            .execute(&mut **tx)
            .await
            .map_err(|e| EvidenceError::database(format!("insert attachment: {e}")))?;
        }
        Ok(())
    }

    async fn insert_custody_events(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        document: &EvidenceDocument,
        document_row_id: i64,
    ) -> Result<(), EvidenceError> {
        for event in document.chain_of_custody() {
            let metadata_json = serde_json::to_string(event.metadata())?;
            sqlx::query(
                r#"
                INSERT INTO custody_events (
                    document_id, event_timestamp, actor, action, metadata_json
                )
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(document_row_id)
            .bind(Self::event_timestamp(event.timestamp()))
            .bind(event.actor())
            .bind(event.action())
            .bind(metadata_json)
            .execute(&mut **tx)
            .await
            .map_err(|e| EvidenceError::database(format!("insert custody event: {e}")))?;
        }
        Ok(())
    }

    fn row_to_content(row: &sqlx::sqlite::SqliteRow) -> Result<DocumentContent, EvidenceError> {
        Ok(DocumentContent {
            document_id: row
                .try_get("document_id")
                .map_err(|e| EvidenceError::database(e.to_string()))?,
            subject: row
                .try_get("subject")
                .map_err(|e| EvidenceError::database(e.to_string()))?,
            body_text: row
                .try_get("body_text")
                .map_err(|e| EvidenceError::database(e.to_string()))?,
            custodian_email: row
                .try_get("custodian_email")
                .map_err(|e| EvidenceError::database(e.to_string()))?,
        })
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataRepository {
    async fn index(&self, document: &EvidenceDocument) -> Result<(), EvidenceError> {
        self.bulk_index(std::slice::from_ref(document)).await
    }

    async fn bulk_index(&self, documents: &[EvidenceDocument]) -> Result<(), EvidenceError> {
        if documents.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EvidenceError::database(format!("begin bulk index: {e}")))?;

        for document in documents {
            let custodian_id = Self::upsert_custodian(&mut tx, document).await?;
            let document_row_id = Self::upsert_document(&mut tx, document, custodian_id).await?;
            Self::replace_attachments(&mut tx, document, document_row_id).await?;
            Self::insert_custody_events(&mut tx, document, document_row_id).await?;
        }

        tx.commit()
            .await
            .map_err(|e| EvidenceError::database(format!("commit bulk index: {e}")))?;
        info!("indexed {} documents", documents.len());
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, EvidenceError> {
        SearchPlanner::text_only(self.pool.clone()).search(query).await
    }

    async fn documents_by_custodian(
        &self,
        custodian_email: &str,
        limit: u32,
    ) -> Result<Vec<SearchHit>, EvidenceError> {
        let query = SearchQuery {
            custodian: Some(custodian_email.to_string()),
            limit,
            ..SearchQuery::default()
        };
        self.search(&query).await
    }

    async fn document_count(&self) -> Result<u64, EvidenceError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| EvidenceError::database(e.to_string()))?;
        Ok(count as u64)
    }

    async fn statistics(&self) -> Result<StoreStatistics, EvidenceError> {
        let total_documents = self.document_count().await?;

        let total_custodians: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT custodian_id) FROM documents")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| EvidenceError::database(e.to_string()))?;

        let by_source = sqlx::query(
            "SELECT source, COUNT(*) AS count FROM documents GROUP BY source ORDER BY count DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?
        .into_iter()
        .map(|row| {
            let source: String = row.get("source");
            let count: i64 = row.get("count");
            (source, count as u64)
        })
        .collect();

        let range_row = sqlx::query(
            "SELECT MIN(collected_at) AS earliest, MAX(collected_at) AS latest FROM documents",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?;
        let earliest: Option<String> = range_row.get("earliest");
        let latest: Option<String> = range_row.get("latest");

        let top_custodians = sqlx::query(
            r#"
            SELECT c.email AS email, COUNT(*) AS doc_count
            FROM documents d
            JOIN custodians c ON d.custodian_id = c.id
            GROUP BY c.email
            ORDER BY doc_count DESC
            LIMIT 10
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?
        .into_iter()
        .map(|row| {
            let email: Option<String> = row.get("email");
            let count: i64 = row.get("doc_count");
            (email.unwrap_or_else(|| "unknown".to_string()), count as u64)
        })
        .collect();

        Ok(StoreStatistics {
            total_documents,
            total_custodians: total_custodians as u64,
            by_source,
            earliest: earliest.and_then(|raw| parse_timestamp(&raw)),
            latest: latest.and_then(|raw| parse_timestamp(&raw)),
            top_custodians,
        })
    }
}

#[async_trait]
impl EnrichmentStore for SqliteMetadataRepository {
    async fn pending_documents(&self, limit: u32) -> Result<Vec<DocumentContent>, EvidenceError> {
        let rows = sqlx::query(
            r#"
            SELECT d.document_id, d.subject, d.body_text, c.email AS custodian_email
            FROM documents d
            LEFT JOIN custodians c ON d.custodian_id = c.id
            LEFT JOIN ai_analysis a ON d.document_id = a.document_id
            WHERE a.document_id IS NULL
            ORDER BY d.collected_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?;
        rows.iter().map(Self::row_to_content).collect()
    }

    async fn document_content(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentContent>, EvidenceError> {
        let row = sqlx::query(
            r#"
            SELECT d.document_id, d.subject, d.body_text, c.email AS custodian_email
            FROM documents d
            LEFT JOIN custodians c ON d.custodian_id = c.id
            WHERE d.document_id = ?
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?;
        row.as_ref().map(Self::row_to_content).transpose()
    }

    async fn save_enrichment(
        &self,
        enrichment: &DocumentEnrichment,
        review_note: &str,
        tags: &[String],
    ) -> Result<(), EvidenceError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| EvidenceError::database(format!("begin enrichment save: {e}")))?;

        let analyzed_at = Self::timestamp(enrichment.analyzed_at);
        sqlx::query(
            r#"
            INSERT INTO ai_analysis (
                document_id, summary, entities, relevance_score, classification,
                privilege_risk, topics, action_items, review_notes, analyzed_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (document_id) DO UPDATE SET
                summary = excluded.summary,
                entities = excluded.entities,
                relevance_score = excluded.relevance_score,
                classification = excluded.classification,
                privilege_risk = excluded.privilege_risk,
                topics = excluded.topics,
                action_items = excluded.action_items,
                review_notes = excluded.review_notes,
                analyzed_at = excluded.analyzed_at
            "#,
        )
        .bind(enrichment.document_id.as_str())
        .bind(&enrichment.summary)
        .bind(serde_json::to_string(&enrichment.entities)?)
        .bind(i64::from(enrichment.relevance_score))
        .bind(enrichment.classification.as_str())
        .bind(i64::from(enrichment.privilege_risk))
        .bind(serde_json::to_string(&enrichment.topics)?)
        .bind(serde_json::to_string(&enrichment.action_items)?)
        .bind(&enrichment.review_notes)
        .bind(&analyzed_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| EvidenceError::database(format!("upsert ai_analysis: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO user_review (document_id, review_notes, review_status, is_reviewed, reviewed_at)
            VALUES (?, ?, 'reviewed', 1, ?)
            ON CONFLICT (document_id) DO UPDATE SET
                review_notes = CASE
                    WHEN user_review.review_notes IS NULL THEN excluded.review_notes
                    ELSE user_review.review_notes || ? || excluded.review_notes
                END,
                review_status = 'reviewed',
                reviewed_at = excluded.reviewed_at
            "#,
        )
        .bind(enrichment.document_id.as_str())
        .bind(review_note)
        .bind(&analyzed_at)
        .bind(REVIEW_NOTE_SEPARATOR)
        .execute(&mut *tx)
        .await
        .map_err(|e| EvidenceError::database(format!("append review notes: {e}")))?;

        for tag in tags {
            sqlx::query(
                r#"
                INSERT INTO user_tags (document_id, tag_name)
                VALUES (?, ?)
                ON CONFLICT (document_id, tag_name) DO NOTHING
                "#,
            )
            .bind(enrichment.document_id.as_str())
            .bind(tag)
            .execute(&mut *tx)
            .await
            .map_err(|e| EvidenceError::database(format!("insert tag '{tag}': {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| EvidenceError::database(format!("commit enrichment save: {e}")))?;
        Ok(())
    }

    async fn enrichment_report(&self, hot_threshold: u8) -> Result<EnrichmentReport, EvidenceError> {
        let total_documents = self.document_count().await?;

        let analyzed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ai_analysis")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| EvidenceError::database(e.to_string()))?;

        let hot: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ai_analysis WHERE relevance_score >= ?")
                .bind(i64::from(hot_threshold))
                .fetch_one(&self.pool)
                .await
                .map_err(|e| EvidenceError::database(e.to_string()))?;

        let high_privilege: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM ai_analysis WHERE privilege_risk >= 50")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| EvidenceError::database(e.to_string()))?;

        let by_classification = sqlx::query(
            r#"
            SELECT classification, COUNT(*) AS count
            FROM ai_analysis
            GROUP BY classification
            ORDER BY count DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?
        .into_iter()
        .map(|row| {
            let classification: Option<String> = row.get("classification");
            let count: i64 = row.get("count");
            (
                classification.unwrap_or_else(|| "unclassified".to_string()),
                count as u64,
            )
        })
        .collect();

        Ok(EnrichmentReport {
            total_documents,
            analyzed: analyzed as u64,
            pending: total_documents.saturating_sub(analyzed as u64),
            hot_documents: hot as u64,
            high_privilege_risk: high_privilege as u64,
            by_classification,
        })
    }

    async fn export_rows(&self) -> Result<Vec<EnrichmentExportRow>, EvidenceError> {
        let rows = sqlx::query(
            r#"
            SELECT document_id, summary, relevance_score, classification, privilege_risk, topics
            FROM ai_analysis
            ORDER BY document_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let topics_json: Option<String> = row.get("topics");
                let relevance: Option<i64> = row.get("relevance_score");
                let privilege: Option<i64> = row.get("privilege_risk");
                EnrichmentExportRow {
                    document_id: row.get("document_id"),
                    relevance_score: relevance.unwrap_or(0).clamp(0, 100) as u8,
                    privilege_risk: privilege.unwrap_or(0).clamp(0, 100) as u8,
                    classification: row
                        .get::<Option<String>, _>("classification")
                        .unwrap_or_default(),
                    topics: topics_json
                        .and_then(|raw| serde_json::from_str(&raw).ok())
                        .unwrap_or_default(),
                    summary: row.get::<Option<String>, _>("summary").unwrap_or_default(),
                }
            })
            .collect())
    }

    async fn documents_missing_embeddings(
        &self,
        limit: u32,
    ) -> Result<Vec<DocumentContent>, EvidenceError> {
        let rows = sqlx::query(
            r#"
            SELECT d.document_id, d.subject, d.body_text, c.email AS custodian_email
            FROM documents d
            LEFT JOIN custodians c ON d.custodian_id = c.id
            WHERE d.embedding IS NULL
            ORDER BY d.collected_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?;
        rows.iter().map(Self::row_to_content).collect()
    }

    async fn store_embedding(
        &self,
        document_id: &str,
        embedding: &[f32],
        model: &str,
    ) -> Result<(), EvidenceError> {
        let result = sqlx::query(
            r#"
            UPDATE documents SET
                embedding = ?,
                embedding_model = ?,
                embedding_generated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')
            WHERE document_id = ?
            "#,
        )
        .bind(encode_embedding(embedding))
        .bind(model)
        .bind(document_id)
        .execute(&self.pool)
        .await
        .map_err(|e| EvidenceError::database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(EvidenceError::not_found(format!(
                "document {document_id} not indexed"
            )));
        }
        Ok(())
    }

    async fn embedding_count(&self) -> Result<u64, EvidenceError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| EvidenceError::database(e.to_string()))?;
        Ok(count as u64)
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
