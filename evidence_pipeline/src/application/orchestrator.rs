// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Ingestion Pipeline Orchestrator
//!
//! Drives connectors through the processor chain into dual-sink
//! persistence. Connectors run sequentially in config order; within a
//! connector the processors run in declared order over the whole batch;
//! each document persists to the object store before the batch is indexed
//! in one metadata-store transaction, so every persisted document is
//! indexed before the next connector starts.
//!
//! Failure boundaries: a malformed record is skipped with a warning; a
//! single-document persistence failure drops that document from the index
//! batch; a connector-level failure aborts that connector but never the
//! pipeline. All collaborators are injected - nothing is resolved from
//! process-wide state.

use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};

use evidence_domain::{
    EvidenceDocument, EvidenceError, MetadataStore, ObjectStore, Processor,
};

use crate::infrastructure::adapters::connectors::ConnectorFactory;
use crate::infrastructure::config::ConnectorConfig;

/// Per-connector outcome of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionResult {
    pub connector_name: String,
    pub processed_documents: usize,
}

pub struct IngestionPipeline {
    connector_factory: ConnectorFactory,
    connectors: Vec<ConnectorConfig>,
    processors: Vec<Box<dyn Processor>>,
    object_store: Arc<dyn ObjectStore>,
    metadata_store: Arc<dyn MetadataStore>,
}

impl IngestionPipeline {
    pub fn new(
        connector_factory: ConnectorFactory,
        connectors: Vec<ConnectorConfig>,
        processors: Vec<Box<dyn Processor>>,
        object_store: Arc<dyn ObjectStore>,
        metadata_store: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            connector_factory,
            connectors,
            processors,
            object_store,
            metadata_store,
        }
    }

    /// Runs every enabled connector once, in config order.
    pub async fn run(&mut self) -> Result<Vec<IngestionResult>, EvidenceError> {
        let configs = self.connectors.clone();
        let mut results = Vec::new();

        for config in &configs {
            if !config.enabled {
                info!("Skipping connector {} (disabled)", config.name);
                continue;
            }
            info!("Running connector {}", config.name);
            // An unknown connector type is a configuration error and fatal
            // for the whole run; failures past this point abort only the
            // connector.
            let connector = self.connector_factory.create(config)?;
            match self.run_connector(config, connector.as_ref()).await {
                Ok(result) => {
                    info!(
                        "Connector {} finished, {} documents processed",
                        result.connector_name, result.processed_documents
                    );
                    results.push(result);
                }
                Err(err) => {
                    error!("Connector {} failed: {err}", config.name);
                }
            }
        }
        Ok(results)
    }

    async fn run_connector(
        &mut self,
        config: &ConnectorConfig,
        connector: &dyn evidence_domain::SourceConnector,
    ) -> Result<IngestionResult, EvidenceError> {
        // Materialize the lazy stream: the processors are batch-typed.
        let mut documents: Vec<EvidenceDocument> = Vec::new();
        {
            let mut stream = connector.fetch();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(document) => documents.push(document),
                    Err(EvidenceError::Parse(message)) => {
                        warn!("{}: skipping malformed record: {message}", config.name);
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        for processor in &mut self.processors {
            documents = processor.process(documents)?;
        }

        let mut persisted = Vec::with_capacity(documents.len());
        for mut document in documents {
            match self.object_store.persist(&mut document).await {
                Ok(()) => persisted.push(document),
                Err(err) => {
                    // Not indexed: the metadata store never references a
                    // document whose payload write failed.
                    error!(
                        "persist failed for {}, skipping from index: {err}",
                        document.document_id()
                    );
                }
            }
        }

        self.metadata_store.bulk_index(&persisted).await?;

        Ok(IngestionResult {
            connector_name: config.name.clone(),
            processed_documents: persisted.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::connectors::build_default_factory;
    use crate::infrastructure::processors::build_processors;
    use crate::infrastructure::config::ProcessingConfig;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;

    /// Object store double that can fail specific document ids.
    struct FlakyObjectStore {
        fail_ids: Vec<String>,
        persisted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ObjectStore for FlakyObjectStore {
        async fn persist(&self, document: &mut EvidenceDocument) -> Result<(), EvidenceError> {
            if self.fail_ids.contains(&document.document_id().to_string()) {
                return Err(EvidenceError::storage("simulated put failure"));
            }
            self.persisted.lock().push(document.document_id().to_string());
            Ok(())
        }
    }

    /// Metadata store double recording batches.
    #[derive(Default)]
    struct RecordingMetadataStore {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl MetadataStore for RecordingMetadataStore {
        async fn index(&self, document: &EvidenceDocument) -> Result<(), EvidenceError> {
            self.bulk_index(std::slice::from_ref(document)).await
        }
        async fn bulk_index(&self, documents: &[EvidenceDocument]) -> Result<(), EvidenceError> {
            self.batches.lock().push(
                documents
                    .iter()
                    .map(|d| d.document_id().to_string())
                    .collect(),
            );
            Ok(())
        }
        async fn search(
            &self,
            _query: &evidence_domain::repositories::SearchQuery,
        ) -> Result<Vec<evidence_domain::repositories::SearchHit>, EvidenceError> {
            Ok(Vec::new())
        }
        async fn documents_by_custodian(
            &self,
            _custodian_email: &str,
            _limit: u32,
        ) -> Result<Vec<evidence_domain::repositories::SearchHit>, EvidenceError> {
            Ok(Vec::new())
        }
        async fn document_count(&self) -> Result<u64, EvidenceError> {
            Ok(self.batches.lock().iter().map(|b| b.len() as u64).sum())
        }
        async fn statistics(
            &self,
        ) -> Result<evidence_domain::repositories::StoreStatistics, EvidenceError> {
            unimplemented!("not exercised")
        }
    }

    fn connector_config(name: &str, connector_type: &str, batch_size: u64) -> ConnectorConfig {
        ConnectorConfig {
            r#type: connector_type.to_string(),
            name: name.to_string(),
            enabled: true,
            params: BTreeMap::from([(
                "batch_size".to_string(),
                serde_json::Value::from(batch_size),
            )]),
        }
    }

    fn pipeline(
        connectors: Vec<ConnectorConfig>,
        object_store: Arc<FlakyObjectStore>,
        metadata_store: Arc<RecordingMetadataStore>,
    ) -> IngestionPipeline {
        IngestionPipeline::new(
            build_default_factory(),
            connectors,
            build_processors(&ProcessingConfig::default()),
            object_store,
            metadata_store,
        )
    }

    #[tokio::test]
    async fn test_mock_run_persists_and_indexes_in_order() {
        let object_store = Arc::new(FlakyObjectStore {
            fail_ids: vec![],
            persisted: Mutex::new(Vec::new()),
        });
        let metadata_store = Arc::new(RecordingMetadataStore::default());
        let mut pipeline = pipeline(
            vec![connector_config("mock_a", "mock_email", 10)],
            object_store.clone(),
            metadata_store.clone(),
        );

        let results = pipeline.run().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].processed_documents, 10);

        // One transaction per connector, production order preserved.
        let batches = metadata_store.batches.lock();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 10);
        assert_eq!(batches[0][0], "mock-email-0");
        assert_eq!(batches[0][9], "mock-email-9");
    }

    #[tokio::test]
    async fn test_disabled_connector_produces_no_result() {
        let object_store = Arc::new(FlakyObjectStore {
            fail_ids: vec![],
            persisted: Mutex::new(Vec::new()),
        });
        let metadata_store = Arc::new(RecordingMetadataStore::default());
        let mut disabled = connector_config("mock_a", "mock_email", 5);
        disabled.enabled = false;
        let mut pipeline = pipeline(vec![disabled], object_store, metadata_store.clone());

        let results = pipeline.run().await.unwrap();
        assert!(results.is_empty());
        assert!(metadata_store.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_skips_document_from_index() {
        let object_store = Arc::new(FlakyObjectStore {
            fail_ids: vec!["mock-email-1".to_string()],
            persisted: Mutex::new(Vec::new()),
        });
        let metadata_store = Arc::new(RecordingMetadataStore::default());
        let mut pipeline = pipeline(
            vec![connector_config("mock_a", "mock_email", 3)],
            object_store,
            metadata_store.clone(),
        );

        let results = pipeline.run().await.unwrap();
        assert_eq!(results[0].processed_documents, 2);

        let batches = metadata_store.batches.lock();
        assert_eq!(batches[0], vec!["mock-email-0", "mock-email-2"]);
    }

    #[tokio::test]
    async fn test_connector_failure_does_not_abort_pipeline() {
        let object_store = Arc::new(FlakyObjectStore {
            fail_ids: vec![],
            persisted: Mutex::new(Vec::new()),
        });
        let metadata_store = Arc::new(RecordingMetadataStore::default());
        let mut pipeline = pipeline(
            vec![
                connector_config("broken", "workspace_api", 1),
                connector_config("mock_a", "mock_email", 2),
            ],
            object_store,
            metadata_store.clone(),
        );

        let results = pipeline.run().await.unwrap();
        // The failing connector yields no result entry; the next one runs.
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].connector_name, "mock_a");
        assert_eq!(results[0].processed_documents, 2);
    }

    #[tokio::test]
    async fn test_unknown_connector_type_is_fatal() {
        let object_store = Arc::new(FlakyObjectStore {
            fail_ids: vec![],
            persisted: Mutex::new(Vec::new()),
        });
        let metadata_store = Arc::new(RecordingMetadataStore::default());
        let mut pipeline = pipeline(
            vec![connector_config("mystery", "imap_v9", 1)],
            object_store,
            metadata_store,
        );
        assert!(matches!(
            pipeline.run().await,
            Err(EvidenceError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_dedup_across_identical_bodies() {
        // Three documents with identical (subject, body) and different ids
        // collapse to one through the dedup stage.
        struct TripletStore;
        #[async_trait]
        impl ObjectStore for TripletStore {
            async fn persist(&self, _document: &mut EvidenceDocument) -> Result<(), EvidenceError> {
                Ok(())
            }
        }

        use chrono::Utc;
        use evidence_domain::{Custodian, DocumentId, DocumentStream, SourceConnector};

        #[derive(Debug)]
        struct TripletConnector;
        impl SourceConnector for TripletConnector {
            fn name(&self) -> &str {
                "triplet"
            }
            fn fetch(&self) -> DocumentStream<'_> {
                let docs: Vec<Result<EvidenceDocument, EvidenceError>> = (0..3)
                    .map(|idx| {
                        Ok(EvidenceDocument::new(
                            DocumentId::new(format!("dup-{idx}")).unwrap(),
                            "triplet",
                            Utc::now(),
                            Custodian::new("c1"),
                        )
                        .with_subject("Same")
                        .with_body_text("Body"))
                    })
                    .collect();
                Box::pin(futures::stream::iter(docs))
            }
        }

        let mut factory = ConnectorFactory::new();
        factory.register("triplet", |_config| Ok(Box::new(TripletConnector)));

        let metadata_store = Arc::new(RecordingMetadataStore::default());
        let mut pipeline = IngestionPipeline::new(
            factory,
            vec![ConnectorConfig {
                r#type: "triplet".to_string(),
                name: "triplet".to_string(),
                enabled: true,
                params: BTreeMap::new(),
            }],
            build_processors(&ProcessingConfig::default()),
            Arc::new(TripletStore),
            metadata_store.clone(),
        );

        let results = pipeline.run().await.unwrap();
        assert_eq!(results[0].processed_documents, 1);
        assert_eq!(metadata_store.document_count().await.unwrap(), 1);
    }
}
