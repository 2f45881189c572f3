// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Local Filesystem Object Store
//!
//! Directory per document under `<base>/<source>/<matter>/<document_id>/`
//! holding `body.txt`, `metadata.json`, `custody_chain.json`, and
//! `attachments/<filename>`. Every file is written to a temp name and
//! renamed into place, so readers never observe a half-written artifact.
//!
//! Immutability on re-persist: the previous artifact set is moved intact
//! into `.versions/<n>/` before the new version is written, so old bytes
//! are never overwritten and the canonical layout always describes the
//! newest version.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use evidence_domain::entities::custody_event::actions;
use evidence_domain::{CustodyEvent, EvidenceDocument, EvidenceError, ObjectStore};

use crate::infrastructure::config::StorageTargetConfig;

pub struct LocalFilesystemObjectStore {
    base_path: PathBuf,
}

impl LocalFilesystemObjectStore {
    pub fn new(config: &StorageTargetConfig) -> Result<Self, EvidenceError> {
        let base_path = PathBuf::from(config.require_str("base_path")?);
        std::fs::create_dir_all(&base_path).map_err(|e| {
            EvidenceError::storage(format!("cannot create {}: {e}", base_path.display()))
        })?;
        Ok(Self { base_path })
    }

    fn document_dir(&self, document: &EvidenceDocument) -> PathBuf {
        self.base_path
            .join(document.source())
            .join(document.matter_id())
            .join(document.document_id().as_str())
    }

    /// Moves the current artifact set into the next `.versions/<n>/` slot.
    async fn snapshot_existing_version(&self, doc_dir: &Path) -> Result<(), EvidenceError> {
        let versions_dir = doc_dir.join(".versions");
        tokio::fs::create_dir_all(&versions_dir).await?;

        let mut next = 1u32;
        let mut entries = tokio::fs::read_dir(&versions_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(n) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u32>().ok())
            {
                next = next.max(n + 1);
            }
        }

        let slot = versions_dir.join(next.to_string());
        tokio::fs::create_dir_all(&slot).await?;

        let mut entries = tokio::fs::read_dir(doc_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name() == ".versions" {
                continue;
            }
            let target = slot.join(entry.file_name());
            tokio::fs::rename(entry.path(), target).await?;
        }
        debug!("snapshotted prior version into {}", slot.display());
        Ok(())
    }

    /// Temp-then-rename write; atomic on the same filesystem.
    async fn write_atomic(&self, target: &Path, contents: &[u8]) -> Result<(), EvidenceError> {
        let parent = target
            .parent()
            .ok_or_else(|| EvidenceError::storage("artifact path has no parent"))?;
        tokio::fs::create_dir_all(parent).await?;

        let file_name = target
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| EvidenceError::storage("artifact path has no file name"))?;
        let tmp = parent.join(format!(".tmp-{file_name}"));
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, target).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalFilesystemObjectStore {
    async fn persist(&self, document: &mut EvidenceDocument) -> Result<(), EvidenceError> {
        let doc_dir = self.document_dir(document);

        if doc_dir.join("metadata.json").exists() {
            self.snapshot_existing_version(&doc_dir).await?;
        }
        tokio::fs::create_dir_all(&doc_dir).await?;

        if let Some(body) = document.body_text() {
            self.write_atomic(&doc_dir.join("body.txt"), body.as_bytes())
                .await?;
        }

        let metadata_json = document.to_canonical_json()?;
        self.write_atomic(&doc_dir.join("metadata.json"), metadata_json.as_bytes())
            .await?;

        for attachment in document.attachments() {
            let filename = sanitize_filename(attachment.filename());
            self.write_atomic(
                &doc_dir.join("attachments").join(filename),
                attachment.payload(),
            )
            .await?;
        }

        // Chain snapshot reflects the state at persist time, before the
        // persisted event itself is appended.
        let custody_json = document.custody_chain_json()?;
        self.write_atomic(&doc_dir.join("custody_chain.json"), custody_json.as_bytes())
            .await?;

        let location = doc_dir.display().to_string();
        document.record_custody_event(
            CustodyEvent::now("local_fs_store", actions::PERSISTED)
                .with_metadata("location", location.clone()),
        );
        document.set_raw_path(location);

        info!("persisted document {} to {}", document.document_id(), doc_dir.display());
        Ok(())
    }
}

/// Keeps attachment names inside the document directory.
fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use evidence_domain::{Attachment, Custodian, DocumentId};
    use std::collections::BTreeMap;

    fn store(dir: &Path) -> LocalFilesystemObjectStore {
        let config = StorageTargetConfig {
            r#type: "local_fs".to_string(),
            params: BTreeMap::from([(
                "base_path".to_string(),
                serde_json::Value::from(dir.to_str().unwrap()),
            )]),
        };
        LocalFilesystemObjectStore::new(&config).unwrap()
    }

    fn sample_document() -> EvidenceDocument {
        let collected = Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, 0).unwrap();
        let mut doc = EvidenceDocument::new(
            DocumentId::new("doc-001").unwrap(),
            "mock_email",
            collected,
            Custodian::from_email("kate@example.com"),
        )
        .with_subject("Files")
        .with_body_text("See attachments.")
        .with_attachment(Attachment::from_payload(
            "report.txt",
            Some("text/plain".into()),
            b"quarterly numbers".to_vec(),
        ));
        doc.record_custody_event(CustodyEvent::at(collected, "mock_email", actions::COLLECTED));
        doc
    }

    #[tokio::test]
    async fn test_persist_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut doc = sample_document();

        store.persist(&mut doc).await.unwrap();

        let doc_dir = dir.path().join("mock_email/default/doc-001");
        assert!(doc_dir.join("body.txt").exists());
        assert!(doc_dir.join("metadata.json").exists());
        assert!(doc_dir.join("custody_chain.json").exists());
        assert!(doc_dir.join("attachments/report.txt").exists());

        // Store appended the persisted event and set the locator.
        assert_eq!(doc.chain_of_custody().len(), 2);
        assert_eq!(doc.chain_of_custody()[1].action(), actions::PERSISTED);
        assert!(doc.raw_path().unwrap().contains("doc-001"));
    }

    #[tokio::test]
    async fn test_metadata_sidecar_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut doc = sample_document();
        store.persist(&mut doc).await.unwrap();

        let raw = std::fs::read_to_string(
            dir.path().join("mock_email/default/doc-001/metadata.json"),
        )
        .unwrap();
        let restored = EvidenceDocument::from_canonical_json(&raw).unwrap();
        assert_eq!(restored.document_id(), doc.document_id());
        assert_eq!(restored.subject(), doc.subject());
        // Snapshot was taken before the persisted event was appended.
        assert_eq!(restored.chain_of_custody().len(), 1);
    }

    #[tokio::test]
    async fn test_custody_snapshot_excludes_persist_event() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut doc = sample_document();
        store.persist(&mut doc).await.unwrap();

        let raw = std::fs::read_to_string(
            dir.path().join("mock_email/default/doc-001/custody_chain.json"),
        )
        .unwrap();
        let events: Vec<CustodyEvent> = serde_json::from_str(&raw).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action(), actions::COLLECTED);
    }

    #[tokio::test]
    async fn test_re_persist_versions_old_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let mut doc = sample_document();
        store.persist(&mut doc).await.unwrap();
        let doc_dir = dir.path().join("mock_email/default/doc-001");
        let original_body = std::fs::read(doc_dir.join("body.txt")).unwrap();

        // Same id, new content.
        let mut updated = sample_document().with_body_text("Amended body.");
        store.persist(&mut updated).await.unwrap();

        let new_body = std::fs::read(doc_dir.join("body.txt")).unwrap();
        assert_eq!(new_body, b"Amended body.");

        // Prior version preserved byte-identical.
        let versioned = std::fs::read(doc_dir.join(".versions/1/body.txt")).unwrap();
        assert_eq!(versioned, original_body);
    }

    #[tokio::test]
    async fn test_attachment_names_are_sanitized() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let mut doc = sample_document().with_attachment(Attachment::from_payload(
            "../../escape.txt",
            None,
            b"payload".to_vec(),
        ));
        store.persist(&mut doc).await.unwrap();

        let attachments_dir = dir.path().join("mock_email/default/doc-001/attachments");
        assert!(attachments_dir.join(".._.._escape.txt").exists());
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_filename(""), "unnamed");
        assert_eq!(sanitize_filename(".."), "unnamed");
    }
}
