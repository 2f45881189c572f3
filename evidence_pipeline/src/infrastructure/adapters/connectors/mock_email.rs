// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Mock Email Connector
//!
//! Deterministic sample documents for demos and tests, seeded entirely by
//! the `batch_size` parameter: fixed base timestamp, numbered subjects,
//! one text attachment per message. Two runs with the same batch size
//! produce byte-identical documents.

use async_stream::try_stream;
use chrono::{Duration, TimeZone, Utc};

use evidence_domain::entities::custody_event::actions;
use evidence_domain::{
    Attachment, Custodian, CustodyEvent, DocumentId, DocumentStream, EvidenceDocument,
    EvidenceError, SourceConnector,
};

use crate::infrastructure::config::ConnectorConfig;

#[derive(Debug)]
pub struct MockEmailConnector {
    name: String,
    batch_size: u64,
}

impl MockEmailConnector {
    pub fn new(config: &ConnectorConfig) -> Result<Self, EvidenceError> {
        Ok(Self {
            name: config.name.clone(),
            batch_size: config.param_u64("batch_size", 10),
        })
    }

    fn build_document(&self, idx: u64) -> Result<EvidenceDocument, EvidenceError> {
        // Fixed epoch keeps runs reproducible.
        let base_time = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).single().ok_or_else(
            || EvidenceError::internal("mock base timestamp out of range"),
        )?;
        let collected_at = base_time + Duration::minutes(idx as i64);

        let subject = format!("Project Falcon status update #{idx}");
        let body = format!(
            "Team,\n\nAttached is status report #{idx} including open risk flags.\n\
             Please review before tomorrow's standup.\n\nThanks,\nOps"
        );
        let attachment = Attachment::from_payload(
            "status.txt",
            Some("text/plain".to_string()),
            body.clone().into_bytes(),
        );

        let mut document = EvidenceDocument::new(
            DocumentId::new(format!("mock-email-{idx}"))?,
            self.name.clone(),
            collected_at,
            Custodian::new(format!("custodian-{idx}"))
                .with_email(format!("user{idx}@example.com")),
        )
        .with_subject(subject)
        .with_body_text(body)
        .with_metadata("message_id", format!("<mock-{idx}@example.com>"))
        .with_metadata("thread_id", "falcon-initiative")
        .with_attachment(attachment);

        document.record_custody_event(
            CustodyEvent::at(collected_at, &self.name, actions::COLLECTED)
                .with_metadata("connector_type", "mock_email"),
        );
        Ok(document)
    }
}

impl SourceConnector for MockEmailConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> DocumentStream<'_> {
        Box::pin(try_stream! {
            for idx in 0..self.batch_size {
                yield self.build_document(idx)?;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::collections::BTreeMap;

    fn connector(batch_size: u64) -> MockEmailConnector {
        let config = ConnectorConfig {
            r#type: "mock_email".to_string(),
            name: "sample_mailbox".to_string(),
            enabled: true,
            params: BTreeMap::from([(
                "batch_size".to_string(),
                serde_json::Value::from(batch_size),
            )]),
        };
        MockEmailConnector::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_produces_batch_size_documents() {
        let docs: Vec<_> = connector(10).fetch().try_collect().await.unwrap();
        assert_eq!(docs.len(), 10);
        assert_eq!(docs[0].document_id().as_str(), "mock-email-0");
        assert_eq!(docs[9].document_id().as_str(), "mock-email-9");
    }

    #[tokio::test]
    async fn test_documents_are_deterministic() {
        let first: Vec<_> = connector(5).fetch().try_collect().await.unwrap();
        let second: Vec<_> = connector(5).fetch().try_collect().await.unwrap();
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a, b);
        }
    }

    #[tokio::test]
    async fn test_subjects_are_distinct() {
        let docs: Vec<_> = connector(10).fetch().try_collect().await.unwrap();
        let subjects: std::collections::HashSet<_> =
            docs.iter().filter_map(|d| d.subject()).collect();
        assert_eq!(subjects.len(), 10);
    }

    #[tokio::test]
    async fn test_custody_and_checksums_present() {
        let docs: Vec<_> = connector(3).fetch().try_collect().await.unwrap();
        for doc in &docs {
            assert_eq!(doc.chain_of_custody().len(), 1);
            assert_eq!(doc.chain_of_custody()[0].action(), actions::COLLECTED);
            assert_eq!(doc.attachments().len(), 1);
            assert_eq!(doc.attachments()[0].checksum_sha256().len(), 64);
        }
    }
}
