// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Load Files & Enrichment Export
//!
//! Review-tool load files are delimited text with a header row of field
//! names. The conventional delimiter is the thorn character `þ` (with
//! `|` as the plain alternative) - a multi-byte character in UTF-8, so
//! framing is done on `char` boundaries rather than through a byte-level
//! CSV reader. Header matching is case-insensitive; unknown columns are
//! preserved in a generic metadata map; malformed rows are skipped with a
//! warning, never aborting the parse.
//!
//! The enrichment exporter writes the CSV side-channel consumed by review
//! tools: a fixed header, two-decimal confidence values derived from the
//! 0-100 scores, and a configurable delimiter.

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use evidence_domain::repositories::EnrichmentExportRow;
use evidence_domain::EvidenceError;

/// Standard review-tool delimiter.
pub const THORN_DELIMITER: char = 'þ';
/// Plain-text alternative delimiter.
pub const PIPE_DELIMITER: char = '|';

/// The fixed export header, in order.
pub const EXPORT_HEADER: [&str; 13] = [
    "DocID",
    "AI_Responsive",
    "AI_Responsive_Confidence",
    "AI_Privileged",
    "AI_Privilege_Confidence",
    "AI_Privilege_Type",
    "AI_Classification",
    "AI_Topics",
    "Hot_Score",
    "AI_Sentiment",
    "AI_Entities",
    "Redaction_Suggestions",
    "Similar_Document_IDs",
];

/// One row of a parsed load file, mapped onto the well-known fields with
/// everything else retained in `metadata`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadFileRecord {
    pub doc_id: String,
    pub bates_number: Option<String>,
    pub custodian: Option<String>,
    pub date_sent: Option<String>,
    pub subject: Option<String>,
    pub from_field: Option<String>,
    pub to_field: Option<String>,
    pub file_path: Option<String>,
    pub extracted_text_path: Option<String>,
    pub metadata: BTreeMap<String, String>,
}

/// Parser for thorn-delimited load files.
pub struct LoadFileParser {
    delimiter: char,
}

impl LoadFileParser {
    pub fn new() -> Self {
        Self {
            delimiter: THORN_DELIMITER,
        }
    }

    pub fn with_delimiter(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// Parses a load file from disk.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<LoadFileRecord>, EvidenceError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EvidenceError::parse(format!("{}: {e}", path.display())))?;
        info!("parsing load file {}", path.display());
        self.parse_str(&raw)
    }

    /// Parses load-file text. The first row is the column order; data
    /// rows with a mismatched field count are skipped with a warning.
    pub fn parse_str(&self, raw: &str) -> Result<Vec<LoadFileRecord>, EvidenceError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        let mut lines = raw.lines().filter(|line| !line.is_empty());

        let header_line = lines
            .next()
            .ok_or_else(|| EvidenceError::parse("load file is empty"))?;
        let field_names: Vec<String> = self.split_row(header_line);
        if field_names.iter().all(|name| name.is_empty()) {
            return Err(EvidenceError::parse("load file header row is empty"));
        }

        let mut records = Vec::new();
        for (row_number, line) in lines.enumerate() {
            let values = self.split_row(line);
            if values.len() != field_names.len() {
                warn!(
                    "load file row {}: expected {} fields, found {} - skipping",
                    row_number + 2,
                    field_names.len(),
                    values.len()
                );
                continue;
            }
            records.push(Self::map_record(&field_names, values));
        }
        info!("parsed {} load file records", records.len());
        Ok(records)
    }

    fn split_row(&self, line: &str) -> Vec<String> {
        line.trim_end_matches('\r')
            .split(self.delimiter)
            .map(|field| field.trim().to_string())
            .collect()
    }

    fn map_record(field_names: &[String], values: Vec<String>) -> LoadFileRecord {
        let mut metadata = BTreeMap::new();
        let mut lower = BTreeMap::new();
        for (name, value) in field_names.iter().zip(values) {
            lower.insert(name.to_lowercase(), value.clone());
            metadata.insert(name.clone(), value);
        }

        let pick = |keys: &[&str]| -> Option<String> {
            keys.iter()
                .find_map(|key| lower.get(*key).filter(|v| !v.is_empty()).cloned())
        };

        LoadFileRecord {
            doc_id: pick(&["docid", "document_id"]).unwrap_or_default(),
            bates_number: pick(&["batesnumber", "bates_number"]),
            custodian: pick(&["custodian"]),
            date_sent: pick(&["datesent", "date_sent", "date"]),
            subject: pick(&["subject"]),
            from_field: pick(&["from"]),
            to_field: pick(&["to"]),
            file_path: pick(&["filepath", "native_file_path"]),
            extracted_text_path: pick(&["textpath", "extracted_text_path"]),
            metadata,
        }
    }
}

impl Default for LoadFileParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Writer for the enrichment CSV side-channel.
pub struct EnrichmentExporter {
    delimiter: char,
    hot_threshold: u8,
}

impl EnrichmentExporter {
    pub fn new() -> Self {
        Self {
            delimiter: PIPE_DELIMITER,
            hot_threshold: 70,
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_hot_threshold(mut self, hot_threshold: u8) -> Self {
        self.hot_threshold = hot_threshold;
        self
    }

    /// Renders the export to a string.
    pub fn render(&self, rows: &[EnrichmentExportRow]) -> String {
        let mut out = String::new();
        out.push_str(&self.join_row(EXPORT_HEADER.iter().map(|s| s.to_string()).collect()));
        for row in rows {
            out.push_str(&self.join_row(self.export_fields(row)));
        }
        out
    }

    /// Writes the export to a file.
    pub fn export_to_file(
        &self,
        path: &Path,
        rows: &[EnrichmentExportRow],
    ) -> Result<(), EvidenceError> {
        std::fs::write(path, self.render(rows))
            .map_err(|e| EvidenceError::storage(format!("{}: {e}", path.display())))?;
        info!("exported {} enrichment rows to {}", rows.len(), path.display());
        Ok(())
    }

    fn export_fields(&self, row: &EnrichmentExportRow) -> Vec<String> {
        let responsive = match row.classification.as_str() {
            "relevant" => "Yes",
            "not-relevant" => "No",
            _ => "",
        };
        let privileged = if row.privilege_risk >= 50 { "Yes" } else { "No" };
        let hot_score = if row.relevance_score >= self.hot_threshold {
            row.relevance_score.to_string()
        } else {
            String::new()
        };

        vec![
            row.document_id.clone(),
            responsive.to_string(),
            format!("{:.2}", f64::from(row.relevance_score) / 100.0),
            privileged.to_string(),
            format!("{:.2}", f64::from(row.privilege_risk) / 100.0),
            String::new(), // AI_Privilege_Type
            row.classification.clone(),
            row.topics.join(";"),
            hot_score,
            String::new(), // AI_Sentiment
            String::new(), // AI_Entities
            String::new(), // Redaction_Suggestions
            String::new(), // Similar_Document_IDs
        ]
    }

    fn join_row(&self, fields: Vec<String>) -> String {
        let escaped: Vec<String> = fields
            .into_iter()
            .map(|field| {
                if field.contains(self.delimiter) || field.contains('\n') || field.contains('"') {
                    format!("\"{}\"", field.replace('"', "\"\""))
                } else {
                    field
                }
            })
            .collect();
        let mut line = escaped.join(&self.delimiter.to_string());
        line.push_str("\r\n");
        line
    }
}

impl Default for EnrichmentExporter {
    fn default() -> Self {
        Self::new()
    }
}
