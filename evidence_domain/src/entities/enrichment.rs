// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Document Enrichment
//!
//! Machine-generated annotations attached to a document after ingestion:
//! summary, relevance and privilege scores on a 0-100 scale, a three-way
//! classification, topics, and review notes. Owned by the document and
//! replaced wholesale on re-analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value_objects::DocumentId;

/// Three-way review classification produced by the enrichment engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    Relevant,
    NotRelevant,
    NeedsReview,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Relevant => "relevant",
            Classification::NotRelevant => "not-relevant",
            Classification::NeedsReview => "needs-review",
        }
    }

    /// Lenient parse used on model output: anything unrecognized maps to
    /// `NeedsReview` rather than failing the document.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().trim_end_matches(['.', ',']).to_lowercase().as_str() {
            "relevant" => Classification::Relevant,
            "not-relevant" | "not_relevant" | "notrelevant" | "irrelevant" => {
                Classification::NotRelevant
            }
            _ => Classification::NeedsReview,
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enrichment row for one document; unique per document id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentEnrichment {
    pub document_id: DocumentId,
    pub summary: String,
    pub entities: Vec<String>,
    pub relevance_score: u8,
    pub classification: Classification,
    pub privilege_risk: u8,
    pub topics: Vec<String>,
    pub action_items: Vec<String>,
    pub review_notes: String,
    pub analyzed_at: DateTime<Utc>,
}

impl DocumentEnrichment {
    /// The defaults written when the model response matches none of the
    /// expected structure: mid-scale relevance, zero privilege risk,
    /// needs-review classification.
    pub fn fallback(document_id: DocumentId, analyzed_at: DateTime<Utc>) -> Self {
        Self {
            document_id,
            summary: String::new(),
            entities: Vec::new(),
            relevance_score: 50,
            classification: Classification::NeedsReview,
            privilege_risk: 0,
            topics: Vec::new(),
            action_items: Vec::new(),
            review_notes: String::new(),
            analyzed_at,
        }
    }

    /// Whether the document clears the hot-document threshold.
    pub fn is_hot(&self, threshold: u8) -> bool {
        self.relevance_score >= threshold
    }
}
