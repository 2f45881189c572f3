// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Metadata Store Port
//!
//! Relational index over document metadata supporting text, vector, and
//! filter search. Upserts are idempotent on `document_id`; a bulk index
//! processes its batch in a single transaction - no partial batch is ever
//! visible.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Classification, EvidenceDocument};
use crate::error::EvidenceError;
use crate::services::file_analyzer::{DataQuality, FileCategory};

/// Search inputs; all filters are AND-composed, `None` means unfiltered.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub query_text: Option<String>,
    pub custodian: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub classification: Option<Classification>,
    pub min_relevance: Option<u8>,
    pub file_category: Option<FileCategory>,
    pub data_quality: Option<DataQuality>,
    pub limit: u32,
}

impl SearchQuery {
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query_text: Some(query.into()),
            limit: 100,
            ..Self::default()
        }
    }
}

/// One search result row, joined against review, analysis, and tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub document_id: String,
    pub source: String,
    pub subject: Option<String>,
    pub collected_at: DateTime<Utc>,
    pub custodian_identifier: Option<String>,
    pub custodian_email: Option<String>,
    /// Text rank or vector similarity when the query carried text;
    /// undefined otherwise.
    pub relevance: Option<f64>,
    pub ai_classification: Option<String>,
    pub ai_relevance: Option<i64>,
    pub user_relevance: Option<i64>,
    pub is_reviewed: bool,
    pub tags: Vec<String>,
}

/// Aggregate counts for the store as a whole.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatistics {
    pub total_documents: u64,
    pub total_custodians: u64,
    pub by_source: Vec<(String, u64)>,
    pub earliest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
    pub top_custodians: Vec<(String, u64)>,
}

/// Indexes normalized metadata for search and filtering.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Inserts or updates the representation of a single document.
    async fn index(&self, document: &EvidenceDocument) -> Result<(), EvidenceError>;

    /// Upserts a whole batch in one transaction. Rolls back entirely on
    /// any failure.
    async fn bulk_index(&self, documents: &[EvidenceDocument]) -> Result<(), EvidenceError>;

    /// Hybrid text/vector search with AND-composed filters.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, EvidenceError>;

    /// All documents for a custodian email, newest first.
    async fn documents_by_custodian(
        &self,
        custodian_email: &str,
        limit: u32,
    ) -> Result<Vec<SearchHit>, EvidenceError>;

    /// Total number of indexed documents.
    async fn document_count(&self) -> Result<u64, EvidenceError>;

    /// Aggregate statistics over the index.
    async fn statistics(&self) -> Result<StoreStatistics, EvidenceError>;
}
