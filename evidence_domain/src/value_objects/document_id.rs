// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Document Identifier
//!
//! Globally unique, source-assigned identifier for an evidence document.
//! The value is immutable after creation; uniqueness is enforced by the
//! metadata store. Because the identifier is embedded in object-store keys
//! (`<source>/<matter>/<document_id>/...`), path separators and control
//! characters are rejected at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EvidenceError;

const MAX_LENGTH: usize = 512;

/// Validated document identifier.
///
/// Construct with [`DocumentId::new`]; the inner string is never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a document id, validating shape but not uniqueness.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::Parse` when the value is empty, longer than
    /// 512 bytes, or contains path separators / control characters.
    pub fn new(value: impl Into<String>) -> Result<Self, EvidenceError> {
        let value = value.into();
        if value.is_empty() {
            return Err(EvidenceError::parse("document id must not be empty"));
        }
        if value.len() > MAX_LENGTH {
            return Err(EvidenceError::parse(format!(
                "document id exceeds {} bytes: {}...",
                MAX_LENGTH,
                &value[..32]
            )));
        }
        if value.chars().any(|c| c == '/' || c == '\\' || c.is_control()) {
            return Err(EvidenceError::parse(format!(
                "document id contains path separators or control characters: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DocumentId {
    type Err = EvidenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl AsRef<str> for DocumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_typical_source_ids() {
        assert!(DocumentId::new("mock-email-0").is_ok());
        assert!(DocumentId::new("AAMkAGI2TG93AAA=").is_ok());
        assert!(DocumentId::new("enron-maildir_skilling-j_0412").is_ok());
    }

    #[test]
    fn test_rejects_empty_and_separators() {
        assert!(DocumentId::new("").is_err());
        assert!(DocumentId::new("a/b").is_err());
        assert!(DocumentId::new("a\\b").is_err());
        assert!(DocumentId::new("a\nb").is_err());
    }

    #[test]
    fn test_rejects_oversized() {
        let long = "x".repeat(MAX_LENGTH + 1);
        assert!(DocumentId::new(long).is_err());
    }

    #[test]
    fn test_serde_transparent() {
        let id = DocumentId::new("doc-42").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"doc-42\"");
        let back: DocumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
