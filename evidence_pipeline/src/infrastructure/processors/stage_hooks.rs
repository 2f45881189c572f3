// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Stage Hooks
//!
//! Placeholder stages for OCR, entity extraction, and privilege
//! detection. Each sets its default metadata key (`ocr_status`,
//! `entities`, `privilege_score`) so downstream consumers always find a
//! stable key, and none overwrites a value an earlier stage already set.

use evidence_domain::{EvidenceDocument, EvidenceError, Processor};

pub struct OcrProcessor;

impl Processor for OcrProcessor {
    fn name(&self) -> &'static str {
        "ocr"
    }

    fn process(
        &mut self,
        mut batch: Vec<EvidenceDocument>,
    ) -> Result<Vec<EvidenceDocument>, EvidenceError> {
        for document in &mut batch {
            document.insert_metadata_if_absent("ocr_status", "skipped_mock");
        }
        Ok(batch)
    }
}

pub struct EntityExtractionProcessor;

impl Processor for EntityExtractionProcessor {
    fn name(&self) -> &'static str {
        "entity_extraction"
    }

    fn process(
        &mut self,
        mut batch: Vec<EvidenceDocument>,
    ) -> Result<Vec<EvidenceDocument>, EvidenceError> {
        for document in &mut batch {
            document.insert_metadata_if_absent("entities", "[]");
        }
        Ok(batch)
    }
}

pub struct PrivilegeDetectionProcessor;

impl Processor for PrivilegeDetectionProcessor {
    fn name(&self) -> &'static str {
        "privilege_detection"
    }

    fn process(
        &mut self,
        mut batch: Vec<EvidenceDocument>,
    ) -> Result<Vec<EvidenceDocument>, EvidenceError> {
        for document in &mut batch {
            document.insert_metadata_if_absent("privilege_score", "0.0");
        }
        Ok(batch)
    }
}
