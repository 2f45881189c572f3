// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File Analysis Processor
//!
//! Runs the domain file analyzer over every attachment in the batch
//! (hashing and signature checks fan out across CPU cores via rayon) and
//! copies the results onto the attachment fields. Attachment checksums
//! declared at collection time are re-verified here; a mismatch fails
//! that document with an integrity error while the rest of the batch
//! continues. Per-run statistics are kept for the completion log line.

use rayon::prelude::*;
use tracing::{error, info, warn};

use evidence_domain::{DataQuality, EvidenceDocument, EvidenceError, FileAnalyzer, Processor};

/// Per-run counters, one increment per analyzed attachment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AnalysisStats {
    pub analyzed: u64,
    pub valid: u64,
    pub corrupted: u64,
    pub encrypted: u64,
    pub suspicious: u64,
    pub invalid_format: u64,
    pub integrity_failures: u64,
}

pub struct FileAnalysisProcessor {
    analyzer: FileAnalyzer,
    stats: AnalysisStats,
}

impl FileAnalysisProcessor {
    pub fn new() -> Self {
        Self {
            analyzer: FileAnalyzer::new(),
            stats: AnalysisStats::default(),
        }
    }

    pub fn statistics(&self) -> &AnalysisStats {
        &self.stats
    }

    /// Analyzes one document's attachments in place. Returns an integrity
    /// error when any attachment's payload no longer matches its declared
    /// checksum.
    fn analyze_document(
        analyzer: &FileAnalyzer,
        document: &mut EvidenceDocument,
    ) -> Result<Vec<DataQuality>, EvidenceError> {
        for attachment in document.attachments() {
            attachment.verify_checksum()?;
        }

        let qualities: Vec<DataQuality> = document
            .attachments_mut()
            .par_iter_mut()
            .map(|attachment| {
                let analysis = analyzer.analyze_bytes(attachment.filename(), attachment.payload());
                attachment.apply_analysis(&analysis);
                if !analysis.is_processable {
                    warn!(
                        "unprocessable file {}: {} ({})",
                        analysis.filename,
                        analysis.quality.as_str(),
                        analysis.quality_details
                    );
                }
                analysis.quality
            })
            .collect();
        Ok(qualities)
    }

    fn record(&mut self, quality: DataQuality) {
        self.stats.analyzed += 1;
        match quality {
            DataQuality::Valid => self.stats.valid += 1,
            DataQuality::Corrupted | DataQuality::Truncated => self.stats.corrupted += 1,
            DataQuality::Encrypted => self.stats.encrypted += 1,
            DataQuality::Suspicious => self.stats.suspicious += 1,
            DataQuality::InvalidFormat => self.stats.invalid_format += 1,
        }
    }
}

impl Default for FileAnalysisProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for FileAnalysisProcessor {
    fn name(&self) -> &'static str {
        "file_analysis"
    }

    fn process(
        &mut self,
        batch: Vec<EvidenceDocument>,
    ) -> Result<Vec<EvidenceDocument>, EvidenceError> {
        let mut passed = Vec::with_capacity(batch.len());
        for mut document in batch {
            match Self::analyze_document(&self.analyzer, &mut document) {
                Ok(qualities) => {
                    for quality in qualities {
                        self.record(quality);
                    }
                    passed.push(document);
                }
                Err(err) => {
                    // Integrity failure drops the document, not the batch.
                    self.stats.integrity_failures += 1;
                    error!("document {} failed integrity check: {err}", document.document_id());
                }
            }
        }
        info!(
            "file analysis: {} analyzed, {} valid, {} corrupted, {} encrypted, {} suspicious",
            self.stats.analyzed,
            self.stats.valid,
            self.stats.corrupted,
            self.stats.encrypted,
            self.stats.suspicious
        );
        Ok(passed)
    }
}
