// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Deduplication Processor
//!
//! Drops any document whose SHA-256 over `subject ‖ body_text` has been
//! seen earlier in the same pipeline run and records the digest into
//! `metadata["hash_sha256"]`. The seen-set lives for one run; a fresh
//! chain starts empty.

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tracing::debug;

use evidence_domain::{EvidenceDocument, EvidenceError, Processor};

pub struct DeduplicationProcessor {
    seen_hashes: HashSet<String>,
}

impl DeduplicationProcessor {
    pub fn new() -> Self {
        Self {
            seen_hashes: HashSet::new(),
        }
    }

    fn content_digest(document: &EvidenceDocument) -> String {
        let mut hasher = Sha256::new();
        hasher.update(document.subject().unwrap_or_default().as_bytes());
        hasher.update(document.body_text().unwrap_or_default().as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl Default for DeduplicationProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for DeduplicationProcessor {
    fn name(&self) -> &'static str {
        "deduplication"
    }

    fn process(
        &mut self,
        batch: Vec<EvidenceDocument>,
    ) -> Result<Vec<EvidenceDocument>, EvidenceError> {
        let input = batch.len();
        let mut unique = Vec::with_capacity(batch.len());
        for mut document in batch {
            let digest = Self::content_digest(&document);
            if !self.seen_hashes.insert(digest.clone()) {
                debug!("dropping duplicate document {}", document.document_id());
                continue;
            }
            document.insert_metadata_if_absent("hash_sha256", digest);
            unique.push(document);
        }
        if unique.len() < input {
            debug!("deduplication kept {}/{input} documents", unique.len());
        }
        Ok(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use evidence_domain::{Custodian, DocumentId};

    fn doc(id: &str, subject: &str, body: &str) -> EvidenceDocument {
        EvidenceDocument::new(
            DocumentId::new(id).unwrap(),
            "test",
            Utc::now(),
            Custodian::new("c1"),
        )
        .with_subject(subject)
        .with_body_text(body)
    }

    #[test]
    fn test_identical_content_collapses_to_one() {
        let mut processor = DeduplicationProcessor::new();
        let batch = vec![
            doc("a", "Same subject", "same body"),
            doc("b", "Same subject", "same body"),
            doc("c", "Same subject", "same body"),
        ];
        let result = processor.process(batch).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].document_id().as_str(), "a");
    }

    #[test]
    fn test_distinct_content_passes_through() {
        let mut processor = DeduplicationProcessor::new();
        let batch = vec![
            doc("a", "Subject one", "body"),
            doc("b", "Subject two", "body"),
        ];
        let result = processor.process(batch).unwrap();
        assert_eq!(result.len(), 2);
        // Digest is recorded on every kept document.
        for document in &result {
            assert_eq!(document.metadata().get("hash_sha256").unwrap().len(), 64);
        }
    }

    #[test]
    fn test_seen_set_spans_batches_within_run() {
        let mut processor = DeduplicationProcessor::new();
        let first = processor.process(vec![doc("a", "S", "B")]).unwrap();
        assert_eq!(first.len(), 1);
        let second = processor.process(vec![doc("b", "S", "B")]).unwrap();
        assert!(second.is_empty());
    }

    #[test]
    fn test_empty_batch() {
        let mut processor = DeduplicationProcessor::new();
        assert!(processor.process(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_subject_and_body_hash_consistently() {
        let mut processor = DeduplicationProcessor::new();
        let bare_a = EvidenceDocument::new(
            DocumentId::new("x").unwrap(),
            "test",
            Utc::now(),
            Custodian::new("c1"),
        );
        let bare_b = EvidenceDocument::new(
            DocumentId::new("y").unwrap(),
            "test",
            Utc::now(),
            Custodian::new("c1"),
        );
        let result = processor.process(vec![bare_a, bare_b]).unwrap();
        assert_eq!(result.len(), 1);
    }
}
