// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Workspace API Connector (skeleton)
//!
//! Placeholder for workspace-suite ingestion (mail + drive). A complete
//! implementation authenticates through a service account with
//! domain-wide delegation and iterates messages and files with change
//! tokens. Until credentials and endpoints are wired, fetch fails fast
//! with a configuration error instead of silently yielding nothing.

use evidence_domain::{DocumentStream, EvidenceDocument, EvidenceError, SourceConnector};

use crate::infrastructure::config::ConnectorConfig;

#[derive(Debug)]
pub struct WorkspaceApiConnector {
    name: String,
    #[allow(dead_code)] // held for the full implementation
    service_account_file: Option<String>,
    #[allow(dead_code)]
    subject_user: Option<String>,
}

impl WorkspaceApiConnector {
    pub fn new(config: &ConnectorConfig) -> Result<Self, EvidenceError> {
        Ok(Self {
            name: config.name.clone(),
            service_account_file: config.param_str("service_account_file").map(String::from),
            subject_user: config.param_str("subject_user").map(String::from),
        })
    }
}

impl SourceConnector for WorkspaceApiConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> DocumentStream<'_> {
        let err: Result<EvidenceDocument, EvidenceError> = Err(EvidenceError::config(format!(
            "connector '{}': workspace ingestion requires service-account \
             delegation and change-token iteration; not configured",
            self.name
        )));
        Box::pin(futures::stream::iter([err]))
    }
}
