// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Evidence Document
//!
//! The central entity of the evidence model. A document is produced by a
//! source connector, enriched by the processor chain, persisted immutably
//! by an object store, and indexed by the metadata store.
//!
//! ## Invariants
//!
//! - `document_id` is immutable after creation
//! - `chain_of_custody` is append-only; the field is private and the only
//!   mutation path is [`EvidenceDocument::record_custody_event`]
//! - attachment payloads are excluded from the canonical serialization and
//!   live out-of-band in the object store
//!
//! The canonical serialization is a field-ordered JSON record with RFC 3339
//! UTC timestamps, used for the `metadata.json` sidecar and round-tripped
//! by [`EvidenceDocument::from_canonical_json`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::{Attachment, Custodian, CustodyEvent};
use crate::error::EvidenceError;
use crate::value_objects::DocumentId;

/// An item of evidence flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceDocument {
    document_id: DocumentId,
    source: String,
    collected_at: DateTime<Utc>,
    custodian: Custodian,
    subject: Option<String>,
    body_text: Option<String>,
    raw_path: Option<String>,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    chain_of_custody: Vec<CustodyEvent>,
}

impl EvidenceDocument {
    pub fn new(
        document_id: DocumentId,
        source: impl Into<String>,
        collected_at: DateTime<Utc>,
        custodian: Custodian,
    ) -> Self {
        Self {
            document_id,
            source: source.into(),
            collected_at,
            custodian,
            subject: None,
            body_text: None,
            raw_path: None,
            metadata: BTreeMap::new(),
            attachments: Vec::new(),
            chain_of_custody: Vec::new(),
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_body_text(mut self, body_text: impl Into<String>) -> Self {
        self.body_text = Some(body_text.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Inserts a metadata entry, overwriting any existing value.
    pub fn insert_metadata(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.insert(key.into(), value.into());
    }

    /// Inserts a metadata entry only when the key is absent.
    pub fn insert_metadata_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.metadata.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Records the object-store locator once the document is persisted.
    pub fn set_raw_path(&mut self, raw_path: impl Into<String>) {
        self.raw_path = Some(raw_path.into());
    }

    /// Appends a custody event. The chain is append-only; events are never
    /// removed or reordered.
    pub fn record_custody_event(&mut self, event: CustodyEvent) {
        self.chain_of_custody.push(event);
    }

    /// Applies a closure to each attachment in place. Used by the
    /// file-analysis processor to copy analysis results onto attachments.
    pub fn attachments_mut(&mut self) -> &mut [Attachment] {
        &mut self.attachments
    }

    /// Matter grouping key, taken from metadata with a `default` fallback.
    /// Used as the object-store prefix segment.
    pub fn matter_id(&self) -> &str {
        self.metadata
            .get("matter_id")
            .map(String::as_str)
            .unwrap_or("default")
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    /// RFC 3339 rendering of the collection timestamp, as stored in the
    /// metadata index and in object-store metadata.
    pub fn collected_at_rfc3339(&self) -> String {
        self.collected_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    pub fn custodian(&self) -> &Custodian {
        &self.custodian
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn body_text(&self) -> Option<&str> {
        self.body_text.as_deref()
    }

    pub fn raw_path(&self) -> Option<&str> {
        self.raw_path.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn chain_of_custody(&self) -> &[CustodyEvent] {
        &self.chain_of_custody
    }

    /// Serializes the document into its canonical field-ordered JSON
    /// record. Attachment payloads are not included; they are written as
    /// separate blobs alongside this sidecar.
    pub fn to_canonical_json(&self) -> Result<String, EvidenceError> {
        serde_json::to_string_pretty(self).map_err(EvidenceError::from)
    }

    /// Reads a document back from its canonical serialization. Attachment
    /// payloads come back empty; everything else is semantically equal to
    /// the persisted value.
    pub fn from_canonical_json(json: &str) -> Result<Self, EvidenceError> {
        serde_json::from_str(json).map_err(EvidenceError::from)
    }

    /// Serializes the custody chain alone, for the `custody_chain.json`
    /// snapshot written at persist time.
    pub fn custody_chain_json(&self) -> Result<String, EvidenceError> {
        serde_json::to_string_pretty(&self.chain_of_custody).map_err(EvidenceError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::custody_event::actions;
    use chrono::TimeZone;

    fn sample_document() -> EvidenceDocument {
        let collected = Utc.with_ymd_and_hms(2025, 2, 3, 18, 30, 0).unwrap();
        let mut doc = EvidenceDocument::new(
            DocumentId::new("mail-001").unwrap(),
            "mock_email",
            collected,
            Custodian::from_email("kate.symes@enron.com"),
        )
        .with_subject("Scheduling question")
        .with_body_text("Can we move the west desk call to 3pm?")
        .with_metadata("thread_id", "west-desk")
        .with_attachment(Attachment::from_payload(
            "schedule.txt",
            Some("text/plain".into()),
            b"3pm works".to_vec(),
        ));
        doc.record_custody_event(CustodyEvent::at(collected, "mock_email", actions::COLLECTED));
        doc
    }

    #[test]
    fn test_canonical_round_trip() {
        let doc = sample_document();
        let json = doc.to_canonical_json().unwrap();
        let back = EvidenceDocument::from_canonical_json(&json).unwrap();

        assert_eq!(back.document_id(), doc.document_id());
        assert_eq!(back.subject(), doc.subject());
        assert_eq!(back.custodian(), doc.custodian());
        assert_eq!(back.chain_of_custody(), doc.chain_of_custody());
        assert_eq!(back.attachments().len(), 1);
        // Payloads live out-of-band.
        assert!(back.attachments()[0].payload().is_empty());
        assert_eq!(
            back.attachments()[0].checksum_sha256(),
            doc.attachments()[0].checksum_sha256()
        );
    }

    #[test]
    fn test_canonical_json_is_field_ordered() {
        let json = sample_document().to_canonical_json().unwrap();
        let id_pos = json.find("\"document_id\"").unwrap();
        let source_pos = json.find("\"source\"").unwrap();
        let custody_pos = json.find("\"chain_of_custody\"").unwrap();
        assert!(id_pos < source_pos && source_pos < custody_pos);
    }

    #[test]
    fn test_custody_chain_is_append_only() {
        let mut doc = sample_document();
        let before = doc.chain_of_custody().len();
        doc.record_custody_event(CustodyEvent::now("local_fs_store", actions::PERSISTED));
        assert_eq!(doc.chain_of_custody().len(), before + 1);
        assert_eq!(doc.chain_of_custody()[before].action(), actions::PERSISTED);
        // Earlier events are untouched.
        assert_eq!(doc.chain_of_custody()[0].action(), actions::COLLECTED);
    }

    #[test]
    fn test_matter_id_defaults() {
        let mut doc = sample_document();
        assert_eq!(doc.matter_id(), "default");
        doc.insert_metadata("matter_id", "case-2025-014");
        assert_eq!(doc.matter_id(), "case-2025-014");
    }

    #[test]
    fn test_metadata_if_absent_does_not_overwrite() {
        let mut doc = sample_document();
        doc.insert_metadata_if_absent("hash_sha256", "aaa");
        doc.insert_metadata_if_absent("hash_sha256", "bbb");
        assert_eq!(doc.metadata().get("hash_sha256").unwrap(), "aaa");
    }
}
