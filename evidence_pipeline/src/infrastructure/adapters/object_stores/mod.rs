// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Object-store adapters and their factory. `local_fs` writes
//! directory-per-document with atomic temp-then-rename files; `s3`
//! (feature-gated) persists to a per-tenant bucket with versioning and
//! server-side encryption.

pub mod local_fs;
#[cfg(feature = "s3")]
pub mod remote;

use std::sync::Arc;

use evidence_domain::{EvidenceError, ObjectStore};

use crate::infrastructure::config::StorageTargetConfig;

/// Resolves the configured object store. Unknown types are a fatal
/// configuration error.
pub async fn build_object_store(
    config: &StorageTargetConfig,
) -> Result<Arc<dyn ObjectStore>, EvidenceError> {
    match config.r#type.as_str() {
        "local_fs" => Ok(Arc::new(local_fs::LocalFilesystemObjectStore::new(config)?)),
        #[cfg(feature = "s3")]
        "s3" => Ok(Arc::new(remote::S3ObjectStore::new(config).await?)),
        other => Err(EvidenceError::config(format!(
            "Unsupported object store type: {other}"
        ))),
    }
}
