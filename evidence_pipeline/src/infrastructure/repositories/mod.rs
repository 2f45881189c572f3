// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! SQLite-backed metadata repository, schema helpers, and the embedding
//! blob codec shared with the search planner.

pub mod embedding_codec;
pub mod schema;
pub mod sqlite_metadata_repository;

pub use sqlite_metadata_repository::SqliteMetadataRepository;

use std::sync::Arc;

use evidence_domain::EvidenceError;

use crate::infrastructure::config::StorageTargetConfig;

/// Resolves the configured metadata store. Unknown types are a fatal
/// configuration error.
pub async fn build_metadata_store(
    config: &StorageTargetConfig,
) -> Result<Arc<SqliteMetadataRepository>, EvidenceError> {
    match config.r#type.as_str() {
        "sqlite" => {
            let path = config.require_str("path")?;
            let min = config.params.get("min_connections").and_then(|v| v.as_u64());
            let max = config.params.get("max_connections").and_then(|v| v.as_u64());
            Ok(Arc::new(
                SqliteMetadataRepository::with_pool_limits(
                    path,
                    min.unwrap_or(1) as u32,
                    max.unwrap_or(10) as u32,
                )
                .await?,
            ))
        }
        other => Err(EvidenceError::config(format!(
            "Unsupported metadata store type: {other}"
        ))),
    }
}
