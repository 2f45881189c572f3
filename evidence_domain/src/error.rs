// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! One hierarchical error type shared by the ingestion pipeline, the store
//! adapters, and the enrichment runtime. Each variant corresponds to a
//! recovery policy:
//!
//! - **Config** - fatal at startup, never retried
//! - **Auth** - credentials refreshed once, then fatal for the connector
//! - **Transport** / **RateLimited** / **Storage** - retried with
//!   exponential backoff by the caller
//! - **Integrity** / **Parse** - the offending unit is skipped, the batch
//!   continues
//! - **LlmParse** - enrichment falls back to defaults
//! - **NotFound** - the unit is skipped and progress still advances
//! - **Database** / **Serialization** / **Cancelled** / **Internal** -
//!   surfaced to the caller as-is
//!
//! Batch boundaries are failure boundaries: a document failure never aborts
//! a batch, a batch failure never aborts a connector, and a connector
//! failure never aborts the pipeline run.

use thiserror::Error;

/// Domain-specific errors for the evidence pipeline.
///
/// Variants carry a human-readable message; `RateLimited` additionally
/// carries the server-provided retry delay when one was present.
#[derive(Error, Debug, Clone)]
pub enum EvidenceError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Seconds to wait, taken from a `Retry-After` header when present.
        retry_after: Option<u64>,
    },

    #[error("Integrity check failed: {0}")]
    Integrity(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("LLM response parse error: {0}")]
    LlmParse(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EvidenceError {
    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Creates a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates a new rate-limit error with an optional retry delay
    pub fn rate_limited(msg: impl Into<String>, retry_after: Option<u64>) -> Self {
        Self::RateLimited {
            message: msg.into(),
            retry_after,
        }
    }

    /// Creates a new integrity error
    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Creates a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Creates a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Creates a new LLM parse error
    pub fn llm_parse(msg: impl Into<String>) -> Self {
        Self::LlmParse(msg.into())
    }

    /// Creates a new not-found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a new database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Creates a new serialization error
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Creates a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Checks whether the error indicates a transient condition worth
    /// retrying with backoff.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EvidenceError::Transport(_) | EvidenceError::RateLimited { .. } | EvidenceError::Storage(_)
        )
    }

    /// Checks whether the error is fatal at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EvidenceError::Config(_))
    }
}

impl From<std::io::Error> for EvidenceError {
    fn from(err: std::io::Error) -> Self {
        EvidenceError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for EvidenceError {
    fn from(err: serde_json::Error) -> Self {
        EvidenceError::Serialization(err.to_string())
    }
}
