// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Connector Registry & Factory
//!
//! Connector type strings are resolved to constructors through an
//! explicit registry built at composition time - never through
//! process-wide state - so tests stay deterministic and several isolated
//! pipelines can coexist in one process. Unknown types fail with a
//! `Config` error.

pub mod cloud_storage;
pub mod file_based;
pub mod mail_api;
pub mod mock_email;
pub mod workspace;

use std::collections::HashMap;

use evidence_domain::{EvidenceError, SourceConnector};

use crate::infrastructure::config::ConnectorConfig;

type ConnectorBuilder =
    Box<dyn Fn(&ConnectorConfig) -> Result<Box<dyn SourceConnector>, EvidenceError> + Send + Sync>;

/// Registry-backed factory for connector instances.
pub struct ConnectorFactory {
    registry: HashMap<String, ConnectorBuilder>,
}

impl ConnectorFactory {
    /// An empty factory; register builders explicitly.
    pub fn new() -> Self {
        Self {
            registry: HashMap::new(),
        }
    }

    /// Registers a builder under a connector type key.
    pub fn register<F>(&mut self, connector_type: impl Into<String>, builder: F)
    where
        F: Fn(&ConnectorConfig) -> Result<Box<dyn SourceConnector>, EvidenceError>
            + Send
            + Sync
            + 'static,
    {
        self.registry.insert(connector_type.into(), Box::new(builder));
    }

    /// Instantiates a connector for the given configuration.
    pub fn create(
        &self,
        config: &ConnectorConfig,
    ) -> Result<Box<dyn SourceConnector>, EvidenceError> {
        let builder = self.registry.get(&config.r#type).ok_or_else(|| {
            EvidenceError::config(format!("Unknown connector type: {}", config.r#type))
        })?;
        builder(config)
    }

    /// Type keys currently registered, for diagnostics.
    pub fn known_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }
}

impl Default for ConnectorFactory {
    fn default() -> Self {
        build_default_factory()
    }
}

/// The factory with every built-in connector registered.
pub fn build_default_factory() -> ConnectorFactory {
    let mut factory = ConnectorFactory::new();
    factory.register("mock_email", |config| {
        Ok(Box::new(mock_email::MockEmailConnector::new(config)?))
    });
    factory.register("file_based_json", |config| {
        Ok(Box::new(file_based::FileBasedJsonConnector::new(config)?))
    });
    factory.register("mail_api", |config| {
        Ok(Box::new(mail_api::MailApiConnector::new(config)?))
    });
    factory.register("workspace_api", |config| {
        Ok(Box::new(workspace::WorkspaceApiConnector::new(config)?))
    });
    factory.register("cloud_storage", |config| {
        Ok(Box::new(cloud_storage::CloudStorageConnector::new(config)?))
    });
    factory
}
