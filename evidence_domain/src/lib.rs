// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Evidence Domain
//!
//! Pure domain layer for the evidence ingestion and enrichment pipeline:
//! the canonical evidence model, the file analyzer, and the ports that the
//! infrastructure layer implements.
//!
//! ## Structure
//!
//! - `entities` - `EvidenceDocument`, `Attachment`, `Custodian`,
//!   `CustodyEvent`, and `DocumentEnrichment`
//! - `value_objects` - validated identifiers (`DocumentId`)
//! - `services` - CPU-bound domain services (`FileAnalyzer`)
//! - `repositories` - async ports: `SourceConnector`, `Processor`,
//!   `ObjectStore`, `MetadataStore`, `EnrichmentStore`
//! - `error` - the `EvidenceError` taxonomy shared by every layer
//!
//! The domain crate carries no runtime: I/O-bound ports are `async-trait`
//! traits implemented elsewhere, while domain services such as the file
//! analyzer are synchronous and deterministic.

pub mod entities;
pub mod error;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{
    Attachment, Classification, Custodian, CustodyEvent, DocumentEnrichment, EvidenceDocument,
};
pub use error::EvidenceError;
pub use repositories::{
    DocumentStream, EnrichmentStore, MetadataStore, ObjectStore, Processor, SourceConnector,
};
pub use services::file_analyzer::{DataQuality, FileAnalysis, FileAnalyzer, FileCategory};
pub use value_objects::DocumentId;
