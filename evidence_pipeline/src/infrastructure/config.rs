// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Configuration
//!
//! JSON configuration tree for the pipeline: connectors, both stores,
//! processing toggles, and security controls. `${VAR}` references are
//! expanded from the environment against the raw file text before
//! parsing, so secrets never live in the config file itself. An unset
//! variable is a fatal `Config` error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use evidence_domain::EvidenceError;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("static pattern"));

/// Generic connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector type key resolved through the factory registry
    pub r#type: String,
    /// Instance name; becomes the document `source`
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ConnectorConfig {
    /// String parameter lookup.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    /// String parameter that must be present.
    pub fn require_str(&self, key: &str) -> Result<&str, EvidenceError> {
        self.param_str(key).ok_or_else(|| {
            EvidenceError::config(format!(
                "connector '{}' requires param '{}'",
                self.name, key
            ))
        })
    }

    /// Integer parameter with a default.
    pub fn param_u64(&self, key: &str, default: u64) -> u64 {
        self.params.get(key).and_then(|v| v.as_u64()).unwrap_or(default)
    }
}

/// Toggleable processing stages, in declared pipeline order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_true")]
    pub enable_deduplication: bool,
    #[serde(default = "default_true")]
    pub enable_file_analysis: bool,
    #[serde(default = "default_true")]
    pub enable_ocr: bool,
    #[serde(default = "default_true")]
    pub enable_entity_extraction: bool,
    #[serde(default)]
    pub enable_privilege_detection: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            enable_deduplication: true,
            enable_file_analysis: true,
            enable_ocr: true,
            enable_entity_extraction: true,
            enable_privilege_detection: false,
        }
    }
}

/// Storage settings for the object and metadata stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageTargetConfig {
    pub r#type: String,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl StorageTargetConfig {
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(|v| v.as_str())
    }

    pub fn require_str(&self, key: &str) -> Result<&str, EvidenceError> {
        self.param_str(key).ok_or_else(|| {
            EvidenceError::config(format!(
                "{} store requires param '{}'",
                self.r#type, key
            ))
        })
    }

    pub fn param_bool(&self, key: &str, default: bool) -> bool {
        self.params.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }
}

/// Security controls enforced across the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_true")]
    pub envelope_encryption: bool,
    #[serde(default)]
    pub kms_key_id: Option<String>,
    #[serde(default)]
    pub rbac_policy: Option<String>,
    #[serde(default)]
    pub audit_log_destination: Option<String>,
}

/// Top-level configuration for the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub connectors: Vec<ConnectorConfig>,
    pub object_store: StorageTargetConfig,
    pub metadata_store: StorageTargetConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl AppConfig {
    /// Loads a config file, expanding `${VAR}` references first.
    pub fn from_json_file(path: &Path) -> Result<Self, EvidenceError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            EvidenceError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parses config from raw JSON text with `${VAR}` expansion.
    pub fn from_json_str(raw: &str) -> Result<Self, EvidenceError> {
        let expanded = expand_env_vars(raw)?;
        serde_json::from_str(&expanded)
            .map_err(|e| EvidenceError::config(format!("invalid config: {e}")))
    }
}

/// Replaces every `${VAR}` occurrence with the environment value; unset
/// variables fail the load.
fn expand_env_vars(raw: &str) -> Result<String, EvidenceError> {
    let mut missing: Vec<String> = Vec::new();
    let expanded = ENV_VAR_PATTERN.replace_all(raw, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });
    if let Some(name) = missing.first() {
        return Err(EvidenceError::config(format!(
            "environment variable '{name}' referenced by config is not set"
        )));
    }
    Ok(expanded.into_owned())
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "connectors": [
            {
                "type": "mock_email",
                "name": "sample_mailbox",
                "enabled": true,
                "params": {"batch_size": 10}
            },
            {
                "type": "file_based_json",
                "name": "dropzone",
                "enabled": false,
                "params": {"data_path": "./drop"}
            }
        ],
        "object_store": {"type": "local_fs", "params": {"base_path": "./_evidence"}},
        "metadata_store": {"type": "sqlite", "params": {"path": "./_metadata/evidence.db"}},
        "processing": {"enable_privilege_detection": true}
    }"#;

    #[test]
    fn test_parse_sample_config() {
        let config = AppConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.connectors.len(), 2);
        assert!(config.connectors[0].enabled);
        assert!(!config.connectors[1].enabled);
        assert_eq!(config.connectors[0].param_u64("batch_size", 50), 10);
        assert_eq!(config.object_store.r#type, "local_fs");
        assert!(config.processing.enable_deduplication);
        assert!(config.processing.enable_privilege_detection);
    }

    #[test]
    fn test_env_expansion() {
        std::env::set_var("EVIDENCE_TEST_BUCKET_PREFIX", "ediscovery-test");
        let raw = r#"{
            "connectors": [],
            "object_store": {"type": "s3", "params": {"bucket_prefix": "${EVIDENCE_TEST_BUCKET_PREFIX}", "tenant_id": "acme"}},
            "metadata_store": {"type": "sqlite", "params": {"path": ":memory:"}}
        }"#;
        let config = AppConfig::from_json_str(raw).unwrap();
        assert_eq!(
            config.object_store.param_str("bucket_prefix"),
            Some("ediscovery-test")
        );
    }

    #[test]
    fn test_missing_env_var_is_fatal() {
        let raw = r#"{
            "connectors": [],
            "object_store": {"type": "local_fs", "params": {"base_path": "${EVIDENCE_TEST_UNSET_VAR_XYZ}"}},
            "metadata_store": {"type": "sqlite", "params": {"path": ":memory:"}}
        }"#;
        let err = AppConfig::from_json_str(raw).unwrap_err();
        assert!(matches!(err, EvidenceError::Config(_)));
        assert!(err.to_string().contains("EVIDENCE_TEST_UNSET_VAR_XYZ"));
    }

    #[test]
    fn test_require_str_reports_connector() {
        let config = AppConfig::from_json_str(SAMPLE).unwrap();
        let err = config.connectors[0].require_str("client_secret").unwrap_err();
        assert!(err.to_string().contains("sample_mailbox"));
    }
}
