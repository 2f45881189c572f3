// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Search Query Planner
//!
//! Hybrid text/vector search over the metadata index:
//!
//! 1. With query text and at least one stored embedding, the query is
//!    embedded and documents score by cosine similarity. With query text
//!    but no embeddings (or no embedder), the FTS index ranks by bm25.
//!    Without query text, relevance is undefined.
//! 2. Non-null filters compose as AND predicates.
//! 3. Results left-join user review, AI analysis, and tags (aggregated
//!    into a list).
//! 4. Text/vector queries order by relevance then recency; pure filter
//!    queries order by `coalesce(user_relevance, ai_relevance, 0)` then
//!    recency. The limit applies last.
//!
//! Any failure on the embedding path (missing column, embedder error)
//! logs a warning and transparently re-plans as text rank; the caller
//! never sees the error.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::warn;

use evidence_domain::repositories::{SearchHit, SearchQuery};
use evidence_domain::EvidenceError;

use crate::infrastructure::repositories::embedding_codec::{cosine_similarity, decode_embedding};
use crate::infrastructure::services::llm_client::LanguageModelClient;

const SELECT_COLUMNS: &str = r#"
    d.id AS row_id,
    d.document_id,
    d.source,
    d.subject,
    d.collected_at,
    c.identifier AS custodian_identifier,
    c.email AS custodian_email,
    a.classification AS ai_classification,
    a.relevance_score AS ai_relevance,
    r.user_relevance_score AS user_relevance,
    COALESCE(r.is_reviewed, 0) AS is_reviewed,
    COALESCE(GROUP_CONCAT(t.tag_name, ','), '') AS tags
"#;

const JOINS: &str = r#"
    LEFT JOIN custodians c ON d.custodian_id = c.id
    LEFT JOIN ai_analysis a ON a.document_id = d.document_id
    LEFT JOIN user_review r ON r.document_id = d.document_id
    LEFT JOIN user_tags t ON t.document_id = d.document_id
"#;

pub struct SearchPlanner {
    pool: SqlitePool,
    embedder: Option<Arc<dyn LanguageModelClient>>,
}

impl SearchPlanner {
    pub fn new(pool: SqlitePool, embedder: Option<Arc<dyn LanguageModelClient>>) -> Self {
        Self { pool, embedder }
    }

    /// Planner without a vector leg; text rank only.
    pub fn text_only(pool: SqlitePool) -> Self {
        Self::new(pool, None)
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, EvidenceError> {
        let query_text = query
            .query_text
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        let Some(text) = query_text else {
            return self.filter_search(query).await;
        };

        if let Some(embedder) = &self.embedder {
            match self.vector_search(text, query, embedder.as_ref()).await {
                Ok(Some(hits)) => return Ok(hits),
                Ok(None) => {} // no embeddings stored yet
                Err(err) => {
                    warn!("vector search failed, falling back to text rank: {err}");
                }
            }
        }

        self.text_search(text, query).await
    }

    /// AND-composed filter predicates shared by every plan. All bind
    /// values are strings; `min_relevance` is a bounded integer inlined
    /// directly.
    fn filter_clauses(query: &SearchQuery) -> (Vec<String>, Vec<String>) {
        let mut clauses = Vec::new();
        let mut binds = Vec::new();

        if let Some(custodian) = &query.custodian {
            clauses.push("c.email LIKE ?".to_string());
            binds.push(format!("%{custodian}%"));
        }
        if let Some(from) = query.date_from {
            clauses.push("d.collected_at >= ?".to_string());
            binds.push(from.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        if let Some(to) = query.date_to {
            clauses.push("d.collected_at <= ?".to_string());
            binds.push(to.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        if let Some(classification) = query.classification {
            clauses.push("a.classification = ?".to_string());
            binds.push(classification.as_str().to_string());
        }
        if let Some(min_relevance) = query.min_relevance {
            clauses.push(format!(
                "COALESCE(r.user_relevance_score, a.relevance_score, 0) >= {}",
                i64::from(min_relevance)
            ));
        }
        if let Some(category) = query.file_category {
            clauses.push(
                "EXISTS (SELECT 1 FROM attachments att \
                 WHERE att.document_id = d.id AND att.file_category = ?)"
                    .to_string(),
            );
            binds.push(category.as_str().to_string());
        }
        if let Some(quality) = query.data_quality {
            clauses.push(
                "EXISTS (SELECT 1 FROM attachments att \
                 WHERE att.document_id = d.id AND att.data_quality = ?)"
                    .to_string(),
            );
            binds.push(quality.as_str().to_string());
        }

        (clauses, binds)
    }

    fn where_fragment(clauses: &[String]) -> String {
        if clauses.is_empty() {
            String::new()
        } else {
            format!("AND {}", clauses.join(" AND "))
        }
    }

    async fn text_search(
        &self,
        text: &str,
        query: &SearchQuery,
    ) -> Result<Vec<SearchHit>, EvidenceError> {
        let (clauses, binds) = Self::filter_clauses(query);
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}, bm25(documents_fts) AS rank
            FROM documents_fts
            JOIN documents d ON d.id = documents_fts.rowid
            {JOINS}
            WHERE documents_fts MATCH ? {where_fragment}
            GROUP BY d.id
            ORDER BY rank ASC, d.collected_at DESC
            LIMIT {limit}
            "#,
            where_fragment = Self::where_fragment(&clauses),
            limit = effective_limit(query),
        );

        let mut prepared = sqlx::query(&sql).bind(fts_match_expression(text));
        for bind in &binds {
            prepared = prepared.bind(bind);
        }

        let rows = prepared
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EvidenceError::database(format!("text search: {e}")))?;

        rows.iter()
            .map(|row| {
                let rank: f64 = row.try_get("rank").unwrap_or(0.0);
                // bm25 is smaller-is-better; negate into a descending score.
                row_to_hit(row, Some(-rank))
            })
            .collect()
    }

    async fn filter_search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, EvidenceError> {
        let (clauses, binds) = Self::filter_clauses(query);
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM documents d
            {JOINS}
            WHERE 1=1 {where_fragment}
            GROUP BY d.id
            ORDER BY COALESCE(r.user_relevance_score, a.relevance_score, 0) DESC,
                     d.collected_at DESC
            LIMIT {limit}
            "#,
            where_fragment = Self::where_fragment(&clauses),
            limit = effective_limit(query),
        );

        let mut prepared = sqlx::query(&sql);
        for bind in &binds {
            prepared = prepared.bind(bind);
        }

        let rows = prepared
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EvidenceError::database(format!("filter search: {e}")))?;
        rows.iter().map(|row| row_to_hit(row, None)).collect()
    }

    /// Vector leg. `Ok(None)` means no document carries an embedding yet
    /// and the caller should use text rank instead.
    async fn vector_search(
        &self,
        text: &str,
        query: &SearchQuery,
        embedder: &dyn LanguageModelClient,
    ) -> Result<Option<Vec<SearchHit>>, EvidenceError> {
        let embedded_docs: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM documents WHERE embedding IS NOT NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| EvidenceError::database(format!("embedding probe: {e}")))?;
        if embedded_docs == 0 {
            return Ok(None);
        }

        let query_embedding = embedder.embed(text).await?;

        let (clauses, binds) = Self::filter_clauses(query);
        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}, d.embedding AS embedding
            FROM documents d
            {JOINS}
            WHERE d.embedding IS NOT NULL {where_fragment}
            GROUP BY d.id
            "#,
            where_fragment = Self::where_fragment(&clauses),
        );

        let mut prepared = sqlx::query(&sql);
        for bind in &binds {
            prepared = prepared.bind(bind);
        }
        let rows = prepared
            .fetch_all(&self.pool)
            .await
            .map_err(|e| EvidenceError::database(format!("vector search: {e}")))?;

        let mut scored: Vec<SearchHit> = Vec::with_capacity(rows.len());
        for row in &rows {
            let blob: Vec<u8> = row
                .try_get("embedding")
                .map_err(|e| EvidenceError::database(e.to_string()))?;
            let Some(embedding) = decode_embedding(&blob) else {
                continue;
            };
            let Some(similarity) = cosine_similarity(&embedding, &query_embedding) else {
                continue;
            };
            scored.push(row_to_hit(row, Some(similarity))?);
        }

        scored.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.collected_at.cmp(&a.collected_at))
        });
        scored.truncate(effective_limit(query) as usize);
        Ok(Some(scored))
    }
}

fn effective_limit(query: &SearchQuery) -> u32 {
    if query.limit == 0 {
        100
    } else {
        query.limit
    }
}

/// Quotes each token so user text is never parsed as FTS5 syntax.
fn fts_match_expression(text: &str) -> String {
    text.split_whitespace()
        .map(|token| token.replace('"', ""))
        .filter(|token| !token.is_empty())
        .map(|token| format!("\"{token}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

fn row_to_hit(
    row: &sqlx::sqlite::SqliteRow,
    relevance: Option<f64>,
) -> Result<SearchHit, EvidenceError> {
    let collected_raw: String = row
        .try_get("collected_at")
        .map_err(|e| EvidenceError::database(e.to_string()))?;
    let collected_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&collected_raw)
        .map_err(|e| EvidenceError::database(format!("collected_at '{collected_raw}': {e}")))?
        .with_timezone(&Utc);

    let tags_raw: String = row.try_get("tags").unwrap_or_default();
    let tags = tags_raw
        .split(',')
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect();

    Ok(SearchHit {
        document_id: row
            .try_get("document_id")
            .map_err(|e| EvidenceError::database(e.to_string()))?,
        source: row
            .try_get("source")
            .map_err(|e| EvidenceError::database(e.to_string()))?,
        subject: row.try_get("subject").unwrap_or_default(),
        collected_at,
        custodian_identifier: row.try_get("custodian_identifier").unwrap_or_default(),
        custodian_email: row.try_get("custodian_email").unwrap_or_default(),
        relevance,
        ai_classification: row.try_get("ai_classification").unwrap_or_default(),
        ai_relevance: row.try_get("ai_relevance").unwrap_or_default(),
        user_relevance: row.try_get("user_relevance").unwrap_or_default(),
        is_reviewed: row.try_get::<i64, _>("is_reviewed").unwrap_or_default() != 0,
        tags,
    })
}
