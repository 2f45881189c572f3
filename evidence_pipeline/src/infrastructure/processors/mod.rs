// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Processor Chain Assembly
//!
//! Builds the ordered processor list from the processing toggles. The
//! declared order is fixed: deduplication, file analysis, then the OCR /
//! entity-extraction / privilege-detection stage hooks. Disabled stages
//! are absent from the chain entirely, not bypassed at runtime.

pub mod deduplication;
pub mod file_analysis;
pub mod stage_hooks;

use evidence_domain::Processor;

use crate::infrastructure::config::ProcessingConfig;

/// Assembles the processor chain in declared pipeline order.
pub fn build_processors(config: &ProcessingConfig) -> Vec<Box<dyn Processor>> {
    let mut processors: Vec<Box<dyn Processor>> = Vec::new();
    if config.enable_deduplication {
        processors.push(Box::new(deduplication::DeduplicationProcessor::new()));
    }
    if config.enable_file_analysis {
        processors.push(Box::new(file_analysis::FileAnalysisProcessor::new()));
    }
    if config.enable_ocr {
        processors.push(Box::new(stage_hooks::OcrProcessor));
    }
    if config.enable_entity_extraction {
        processors.push(Box::new(stage_hooks::EntityExtractionProcessor));
    }
    if config.enable_privilege_detection {
        processors.push(Box::new(stage_hooks::PrivilegeDetectionProcessor));
    }
    processors
}
