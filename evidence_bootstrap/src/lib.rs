// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! Sits outside the enterprise layers (domain, application,
//! infrastructure) and owns the process boundary:
//!
//! - **Argument parsing** - clap definition and validation of the CLI
//!   surface (`run-ingest`, `enrich`, `enrich-worker`, `search`)
//! - **Exit codes** - mapping application results onto process exit codes
//! - **Signal handling** - ctrl-c / SIGTERM turned into a shutdown token
//!   that long-running workers observe at their next I/O boundary
//!
//! Enterprise layers never depend on this crate; the binary wires them
//! together using what bootstrap parsed and validated.

pub mod cli;
pub mod exit_code;
pub mod signals;

pub use cli::{parse_and_validate, Cli, Command, ParseError};
pub use exit_code::{result_to_exit_code, ExitCode};
pub use signals::ShutdownToken;
