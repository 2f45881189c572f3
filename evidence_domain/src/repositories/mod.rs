// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Ports
//!
//! Async traits implemented by the infrastructure layer. The pipeline
//! orchestrator and the enrichment runtime depend only on these
//! abstractions; concrete adapters (HTTP connectors, the S3 store, the
//! SQLite repository) are wired in explicitly at composition time - never
//! resolved from process-wide state.

pub mod enrichment_store;
pub mod metadata_store;
pub mod object_store;
pub mod processor;
pub mod source_connector;

pub use enrichment_store::{
    DocumentContent, EnrichmentExportRow, EnrichmentReport, EnrichmentStore,
};
pub use metadata_store::{MetadataStore, SearchHit, SearchQuery, StoreStatistics};
pub use object_store::ObjectStore;
pub use processor::Processor;
pub use source_connector::{DocumentStream, SourceConnector};
