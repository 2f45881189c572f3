// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Evidence Pipeline
//!
//! Evidence ingestion and enrichment for legal e-discovery. Documents are
//! pulled from heterogeneous sources, normalized into the evidence model,
//! pushed through an ordered processor chain, persisted to an immutable
//! object store and a searchable metadata index, and enriched in parallel
//! through an external LLM - all under a verifiable chain of custody.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (Pipeline orchestrator, use cases per CLI verb)            │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (Evidence model, file analyzer, ports - evidence-domain)   │
//! └─────────────────────────────────────────────────────────────┘
//!                                ▲
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (Connectors, object stores, SQLite repository,             │
//! │   enrichment runtime, search planner, codecs)               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The binary (`src/main.rs`) composes the layers from the bootstrap
//! crate's validated CLI input; nothing in here reaches for process-wide
//! state.

pub mod application;
pub mod infrastructure;
