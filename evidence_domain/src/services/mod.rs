// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! CPU-bound domain services. These stay synchronous and deterministic;
//! anything touching I/O lives behind the ports in `repositories`.

pub mod file_analyzer;
