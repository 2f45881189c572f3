// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Tracing initialization for the binary. `RUST_LOG` wins when set;
//! otherwise the CLI `--log-level` seeds the filter.

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. Safe to call once per process;
/// later calls are ignored so tests can race it freely.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("evidence_pipeline={log_level},{log_level}")));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
