// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object Store Port
//!
//! Immutable, content-preserving persistence for raw payloads. A persist
//! writes four logical artifacts under `<source>/<matter>/<document_id>/`:
//! `body.txt` (when a body is present), `metadata.json` (the canonical
//! serialization), one blob per attachment, and `custody_chain.json`
//! (the chain at persist time).
//!
//! Writes are all-or-nothing from the caller's view: any artifact failure
//! aborts persistence for that document, and the metadata index must not
//! be updated for a document that failed to persist. Re-persisting an
//! existing document produces a new version; prior bytes are never
//! overwritten.

use async_trait::async_trait;

use crate::entities::EvidenceDocument;
use crate::error::EvidenceError;

/// Persists raw evidence payloads in immutable storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Persists the document's artifacts. On success the store appends a
    /// `persisted` custody event carrying the storage location - the only
    /// mutation of the document a store is permitted to make.
    async fn persist(&self, document: &mut EvidenceDocument) -> Result<(), EvidenceError>;
}
