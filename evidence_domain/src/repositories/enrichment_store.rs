// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Enrichment Store Port
//!
//! The write-back surface used by the enrichment workers: pending-work
//! queries bounded by batch size, the transactional enrichment save
//! (analysis row, review-note append, and tag inserts land together or
//! not at all), and the embedding upsert used by the embedding generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::DocumentEnrichment;
use crate::error::EvidenceError;

/// The slice of a document an enrichment worker needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContent {
    pub document_id: String,
    pub subject: Option<String>,
    pub body_text: Option<String>,
    pub custodian_email: Option<String>,
}

/// Aggregate view over enrichment state, printed by `enrich --report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub total_documents: u64,
    pub analyzed: u64,
    pub pending: u64,
    pub hot_documents: u64,
    pub high_privilege_risk: u64,
    pub by_classification: Vec<(String, u64)>,
}

/// One row of the enrichment CSV side-channel export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentExportRow {
    pub document_id: String,
    pub relevance_score: u8,
    pub privilege_risk: u8,
    pub classification: String,
    pub topics: Vec<String>,
    pub summary: String,
}

/// Store operations consumed by the enrichment and embedding workers.
#[async_trait]
pub trait EnrichmentStore: Send + Sync {
    /// Documents with no enrichment yet, newest first, bounded by `limit`.
    async fn pending_documents(&self, limit: u32) -> Result<Vec<DocumentContent>, EvidenceError>;

    /// Loads one document's content; `None` when the id is unknown.
    async fn document_content(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentContent>, EvidenceError>;

    /// Saves an enrichment transactionally with its review-note append and
    /// tag inserts: either all land or none do. Re-running replaces the
    /// analysis row and appends (never duplicates) the review note.
    async fn save_enrichment(
        &self,
        enrichment: &DocumentEnrichment,
        review_note: &str,
        tags: &[String],
    ) -> Result<(), EvidenceError>;

    /// Aggregates enrichment state; `hot_threshold` is the relevance bar
    /// for a hot document.
    async fn enrichment_report(&self, hot_threshold: u8) -> Result<EnrichmentReport, EvidenceError>;

    /// All enriched documents, shaped for the CSV side-channel export.
    async fn export_rows(&self) -> Result<Vec<EnrichmentExportRow>, EvidenceError>;

    /// Documents whose embedding column is still NULL, bounded by `limit`.
    async fn documents_missing_embeddings(
        &self,
        limit: u32,
    ) -> Result<Vec<DocumentContent>, EvidenceError>;

    /// Upserts the embedding vector and model name for a document.
    async fn store_embedding(
        &self,
        document_id: &str,
        embedding: &[f32],
        model: &str,
    ) -> Result<(), EvidenceError>;

    /// Number of documents carrying a non-null embedding.
    async fn embedding_count(&self) -> Result<u64, EvidenceError>;
}
