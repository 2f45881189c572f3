// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processor Port
//!
//! A processing stage that transforms an ordered batch of documents into
//! an ordered batch. Stages may drop, reorder, merge, or enrich documents
//! but must be deterministic given the same input batch and internal
//! state. Stage state (such as a dedup seen-set) is scoped to one
//! pipeline run.

use crate::entities::EvidenceDocument;
use crate::error::EvidenceError;

/// A processing stage in the ingestion pipeline.
pub trait Processor: Send {
    /// Stage name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Transforms a batch of documents. An empty input batch must yield an
    /// empty output batch.
    fn process(
        &mut self,
        batch: Vec<EvidenceDocument>,
    ) -> Result<Vec<EvidenceDocument>, EvidenceError>;
}
