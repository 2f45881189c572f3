// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end ingestion: mock connector through the full processor chain
//! into the local filesystem store and the SQLite metadata index.

use std::sync::Arc;

use evidence_domain::{EvidenceDocument, MetadataStore};
use evidence_pipeline::application::orchestrator::IngestionPipeline;
use evidence_pipeline::infrastructure::adapters::connectors::build_default_factory;
use evidence_pipeline::infrastructure::adapters::object_stores::local_fs::LocalFilesystemObjectStore;
use evidence_pipeline::infrastructure::config::{
    AppConfig, ConnectorConfig, ProcessingConfig, StorageTargetConfig,
};
use evidence_pipeline::infrastructure::processors::build_processors;
use evidence_pipeline::infrastructure::repositories::{schema, SqliteMetadataRepository};
use sqlx::Row;

fn local_store(dir: &std::path::Path) -> Arc<LocalFilesystemObjectStore> {
    let config = StorageTargetConfig {
        r#type: "local_fs".to_string(),
        params: std::collections::BTreeMap::from([(
            "base_path".to_string(),
            serde_json::Value::from(dir.to_str().unwrap()),
        )]),
    };
    Arc::new(LocalFilesystemObjectStore::new(&config).unwrap())
}

fn mock_connector(batch_size: u64) -> ConnectorConfig {
    ConnectorConfig {
        r#type: "mock_email".to_string(),
        name: "sample_mailbox".to_string(),
        enabled: true,
        params: std::collections::BTreeMap::from([(
            "batch_size".to_string(),
            serde_json::Value::from(batch_size),
        )]),
    }
}

async fn repository() -> Arc<SqliteMetadataRepository> {
    let pool = schema::initialize_database("sqlite::memory:").await.unwrap();
    Arc::new(SqliteMetadataRepository::from_pool(pool))
}

#[tokio::test]
async fn test_mock_email_run_end_to_end() {
    let evidence_dir = tempfile::tempdir().unwrap();
    let repo = repository().await;
    let object_store = local_store(evidence_dir.path());

    let mut pipeline = IngestionPipeline::new(
        build_default_factory(),
        vec![mock_connector(10)],
        build_processors(&ProcessingConfig::default()),
        object_store,
        repo.clone(),
    );

    let results = pipeline.run().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].processed_documents, 10);

    // 10 rows in the metadata store.
    assert_eq!(repo.document_count().await.unwrap(), 10);

    // Every row carries the dedup digest, and no two share it (subjects
    // differ across the batch).
    let digests: Vec<String> = sqlx::query("SELECT metadata_json FROM documents")
        .fetch_all(repo.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|row| {
            let metadata: serde_json::Value =
                serde_json::from_str(&row.get::<String, _>("metadata_json")).unwrap();
            metadata["hash_sha256"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(digests.len(), 10);
    let unique: std::collections::HashSet<_> = digests.iter().collect();
    assert_eq!(unique.len(), 10);

    // Stage hooks left their stable keys.
    let metadata_json: String =
        sqlx::query_scalar("SELECT metadata_json FROM documents LIMIT 1")
            .fetch_one(repo.pool())
            .await
            .unwrap();
    let metadata: serde_json::Value = serde_json::from_str(&metadata_json).unwrap();
    assert_eq!(metadata["ocr_status"], "skipped_mock");
    assert_eq!(metadata["entities"], "[]");

    // Object store artifacts exist and round-trip.
    let doc_dir = evidence_dir
        .path()
        .join("sample_mailbox/default/mock-email-0");
    let sidecar = std::fs::read_to_string(doc_dir.join("metadata.json")).unwrap();
    let restored = EvidenceDocument::from_canonical_json(&sidecar).unwrap();
    assert_eq!(restored.document_id().as_str(), "mock-email-0");
    assert!(doc_dir.join("attachments/status.txt").exists());

    // Custody chain in the index: collected then persisted, in timestamp
    // order.
    let actions: Vec<String> = sqlx::query(
        r#"
        SELECT ce.action FROM custody_events ce
        JOIN documents d ON d.id = ce.document_id
        WHERE d.document_id = 'mock-email-0'
        ORDER BY ce.event_timestamp
        "#,
    )
    .fetch_all(repo.pool())
    .await
    .unwrap()
    .into_iter()
    .map(|row| row.get("action"))
    .collect();
    assert_eq!(actions, vec!["collected", "persisted"]);
}

#[tokio::test]
async fn test_rerun_is_idempotent_on_visible_state() {
    let evidence_dir = tempfile::tempdir().unwrap();
    let repo = repository().await;

    for _ in 0..2 {
        let mut pipeline = IngestionPipeline::new(
            build_default_factory(),
            vec![mock_connector(5)],
            build_processors(&ProcessingConfig::default()),
            local_store(evidence_dir.path()),
            repo.clone(),
        );
        pipeline.run().await.unwrap();
    }

    assert_eq!(repo.document_count().await.unwrap(), 5);
    let custodians: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM custodians")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!(custodians, 5);

    // Re-persisting versioned the old artifacts instead of overwriting.
    assert!(evidence_dir
        .path()
        .join("sample_mailbox/default/mock-email-0/.versions/1/metadata.json")
        .exists());
}

#[tokio::test]
async fn test_empty_batch_reports_zero() {
    let evidence_dir = tempfile::tempdir().unwrap();
    let repo = repository().await;
    let mut pipeline = IngestionPipeline::new(
        build_default_factory(),
        vec![mock_connector(0)],
        build_processors(&ProcessingConfig::default()),
        local_store(evidence_dir.path()),
        repo.clone(),
    );

    let results = pipeline.run().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].processed_documents, 0);
    assert_eq!(repo.document_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_config_file_drives_full_run() {
    let evidence_dir = tempfile::tempdir().unwrap();
    let db_dir = tempfile::tempdir().unwrap();
    let raw = format!(
        r#"{{
            "connectors": [
                {{"type": "mock_email", "name": "m1", "enabled": true, "params": {{"batch_size": 4}}}},
                {{"type": "mock_email", "name": "m2", "enabled": false, "params": {{"batch_size": 4}}}}
            ],
            "object_store": {{"type": "local_fs", "params": {{"base_path": "{}"}}}},
            "metadata_store": {{"type": "sqlite", "params": {{"path": "{}"}}}}
        }}"#,
        evidence_dir.path().display(),
        db_dir.path().join("metadata.db").display(),
    );
    let config = AppConfig::from_json_str(&raw).unwrap();

    let results = evidence_pipeline::application::use_cases::run_ingest::execute(&config)
        .await
        .unwrap();

    // The disabled connector produced no result entry.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].connector_name, "m1");
    assert_eq!(results[0].processed_documents, 4);
}
