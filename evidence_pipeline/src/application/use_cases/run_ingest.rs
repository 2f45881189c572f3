// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! `run-ingest`: one full pipeline pass over every enabled connector.

use tracing::info;

use evidence_domain::EvidenceError;

use crate::application::orchestrator::{IngestionPipeline, IngestionResult};
use crate::infrastructure::adapters::connectors::build_default_factory;
use crate::infrastructure::adapters::object_stores::build_object_store;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::processors::build_processors;
use crate::infrastructure::repositories::build_metadata_store;

pub async fn execute(config: &AppConfig) -> Result<Vec<IngestionResult>, EvidenceError> {
    let object_store = build_object_store(&config.object_store).await?;
    let metadata_store = build_metadata_store(&config.metadata_store).await?;
    let processors = build_processors(&config.processing);

    let mut pipeline = IngestionPipeline::new(
        build_default_factory(),
        config.connectors.clone(),
        processors,
        object_store,
        metadata_store,
    );

    let results = pipeline.run().await?;

    let total: usize = results.iter().map(|r| r.processed_documents).sum();
    info!("ingestion complete: {total} documents across {} connectors", results.len());
    for result in &results {
        println!(
            "{:<30} {:>6} documents",
            result.connector_name, result.processed_documents
        );
    }
    Ok(results)
}
