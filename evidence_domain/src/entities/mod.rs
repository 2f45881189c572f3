// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Entities of the evidence model.
//!
//! `EvidenceDocument` is the aggregate root; attachments and custody events
//! are owned exclusively by their document. `DocumentEnrichment` is the
//! secondary entity written by the enrichment engine, keyed by document id.

pub mod attachment;
pub mod custodian;
pub mod custody_event;
pub mod document;
pub mod enrichment;

pub use attachment::Attachment;
pub use custodian::Custodian;
pub use custody_event::CustodyEvent;
pub use document::EvidenceDocument;
pub use enrichment::{Classification, DocumentEnrichment};
