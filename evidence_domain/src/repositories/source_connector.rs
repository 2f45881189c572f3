// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Connector Port
//!
//! A connector pulls raw evidence from one external system and surfaces it
//! as a lazy, finite stream of fully populated documents. Connectors must
//! attach at least one `collected` custody event per document and compute
//! attachment checksums themselves.

use futures::Stream;
use std::pin::Pin;

use crate::entities::EvidenceDocument;
use crate::error::EvidenceError;

/// Lazy sequence of documents produced by a connector. The stream is
/// finite; the orchestrator materializes it per-connector because the
/// processor chain is batch-typed.
pub type DocumentStream<'a> =
    Pin<Box<dyn Stream<Item = Result<EvidenceDocument, EvidenceError>> + Send + 'a>>;

/// A connector capable of pulling raw evidence from an external system.
pub trait SourceConnector: Send + Sync + std::fmt::Debug {
    /// Connector instance name, used as the document `source` and as the
    /// custody-event actor.
    fn name(&self) -> &str;

    /// Streams evidence documents gathered from the source. Item-level
    /// errors carry skippable failures (a malformed record); a stream that
    /// yields `Err` with a non-recoverable error ends the connector run.
    fn fetch(&self) -> DocumentStream<'_>;
}
