// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attachment
//!
//! A binary payload owned exclusively by one document. The payload is
//! written once at collection time and never mutated afterwards; its
//! SHA-256 is computed by the connector and re-verified during file
//! analysis. The payload itself is excluded from the document's canonical
//! serialization - it is persisted out-of-band as a blob next to the
//! metadata sidecar.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::EvidenceError;
use crate::services::file_analyzer::FileAnalysis;

/// Attachment carried by an evidence document.
///
/// The file-analysis fields (`file_category`, `data_quality`, `md5`,
/// `detected_mime`, `is_processable`) start empty and are filled in by the
/// file-analysis processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    filename: String,
    content_type: Option<String>,
    size_bytes: u64,
    #[serde(skip, default)]
    payload: Vec<u8>,
    checksum_sha256: String,
    file_category: Option<String>,
    data_quality: Option<String>,
    quality_details: Option<String>,
    md5: Option<String>,
    detected_mime: Option<String>,
    is_processable: bool,
}

impl Attachment {
    /// Creates an attachment from its raw payload, computing the SHA-256
    /// checksum in the process.
    pub fn from_payload(
        filename: impl Into<String>,
        content_type: Option<String>,
        payload: Vec<u8>,
    ) -> Self {
        let checksum_sha256 = hex::encode(Sha256::digest(&payload));
        Self {
            filename: filename.into(),
            content_type,
            size_bytes: payload.len() as u64,
            payload,
            checksum_sha256,
            file_category: None,
            data_quality: None,
            quality_details: None,
            md5: None,
            detected_mime: None,
            is_processable: true,
        }
    }

    /// Recomputes the payload checksum and compares it against the value
    /// declared at collection time.
    ///
    /// # Errors
    ///
    /// Returns `EvidenceError::Integrity` on mismatch.
    pub fn verify_checksum(&self) -> Result<(), EvidenceError> {
        let actual = hex::encode(Sha256::digest(&self.payload));
        if actual != self.checksum_sha256 {
            return Err(EvidenceError::integrity(format!(
                "sha256 mismatch for attachment '{}': declared {} computed {}",
                self.filename, self.checksum_sha256, actual
            )));
        }
        Ok(())
    }

    /// Copies the results of a file analysis onto the attachment.
    pub fn apply_analysis(&mut self, analysis: &FileAnalysis) {
        self.file_category = Some(analysis.category.as_str().to_string());
        self.data_quality = Some(analysis.quality.as_str().to_string());
        self.quality_details = Some(analysis.quality_details.clone());
        self.md5 = Some(analysis.md5.clone());
        self.detected_mime = analysis.detected_mime.clone();
        self.is_processable = analysis.is_processable;
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn checksum_sha256(&self) -> &str {
        &self.checksum_sha256
    }

    pub fn file_category(&self) -> Option<&str> {
        self.file_category.as_deref()
    }

    pub fn data_quality(&self) -> Option<&str> {
        self.data_quality.as_deref()
    }

    pub fn quality_details(&self) -> Option<&str> {
        self.quality_details.as_deref()
    }

    pub fn md5(&self) -> Option<&str> {
        self.md5.as_deref()
    }

    pub fn detected_mime(&self) -> Option<&str> {
        self.detected_mime.as_deref()
    }

    pub fn is_processable(&self) -> bool {
        self.is_processable
    }
}
