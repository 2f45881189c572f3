// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cloud Storage Connector (skeleton)
//!
//! Placeholder for generic object-store sync (S3, Azure Blob, and
//! friends). A complete implementation must stream objects, compute
//! checksums locally, and attach provider metadata (etag, last-modified)
//! into `document.metadata`. Without credentials and bucket details the
//! fetch fails fast with a configuration error.

use evidence_domain::{DocumentStream, EvidenceDocument, EvidenceError, SourceConnector};

use crate::infrastructure::config::ConnectorConfig;

#[derive(Debug)]
pub struct CloudStorageConnector {
    name: String,
    provider: String,
    bucket: Option<String>,
    #[allow(dead_code)] // held for the full implementation
    prefix: String,
}

impl CloudStorageConnector {
    pub fn new(config: &ConnectorConfig) -> Result<Self, EvidenceError> {
        Ok(Self {
            name: config.name.clone(),
            provider: config.param_str("provider").unwrap_or("aws_s3").to_string(),
            bucket: config.param_str("bucket").map(String::from),
            prefix: config.param_str("prefix").unwrap_or("").to_string(),
        })
    }
}

impl SourceConnector for CloudStorageConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> DocumentStream<'_> {
        let err: Result<EvidenceDocument, EvidenceError> = Err(EvidenceError::config(format!(
            "connector '{}': cloud storage ingestion ({}, bucket {:?}) must stream \
             objects, compute checksums, and attach etag/last-modified metadata; \
             provide credentials and bucket details to enable it",
            self.name, self.provider, self.bucket
        )));
        Box::pin(futures::stream::iter([err]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_fetch_fails_fast() {
        let connector = CloudStorageConnector::new(&ConnectorConfig {
            r#type: "cloud_storage".to_string(),
            name: "s3_sync".to_string(),
            enabled: true,
            params: BTreeMap::from([(
                "bucket".to_string(),
                serde_json::Value::from("case-evidence"),
            )]),
        })
        .unwrap();
        let result: Result<Vec<_>, _> = connector.fetch().try_collect().await;
        let err = result.unwrap_err();
        assert!(err.to_string().contains("case-evidence"));
    }
}
