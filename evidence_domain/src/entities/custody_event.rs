// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Chain-of-Custody Event
//!
//! One entry in a document's append-only audit log. Every custody-relevant
//! operation (collection, persistence, analysis) records who did what and
//! when; timestamps are UTC and serialize as RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known custody actions. Free-form actions are permitted; these are
/// the ones the pipeline itself records.
pub mod actions {
    pub const COLLECTED: &str = "collected";
    pub const PERSISTED: &str = "persisted";
    pub const ANALYZED: &str = "analyzed";
}

/// A single custody-relevant operation on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyEvent {
    timestamp: DateTime<Utc>,
    actor: String,
    action: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
}

impl CustodyEvent {
    /// Records an event happening now.
    pub fn now(actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self::at(Utc::now(), actor, action)
    }

    /// Records an event at an explicit timestamp (used by deterministic
    /// connectors and by tests).
    pub fn at(timestamp: DateTime<Utc>, actor: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            timestamp,
            actor: actor.into(),
            action: action.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// Attaches a metadata entry to the event.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}
