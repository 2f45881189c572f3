// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # File-Based JSON Connector
//!
//! Reads email records exported as one JSON file per message from a drop
//! directory. A malformed file is skipped with a warning - one bad record
//! never aborts the fetch. Custodian identity is derived from the sender
//! address (identifier = local-part).

use async_stream::try_stream;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use evidence_domain::entities::custody_event::actions;
use evidence_domain::{
    Custodian, CustodyEvent, DocumentId, DocumentStream, EvidenceDocument, EvidenceError,
    SourceConnector,
};

use crate::infrastructure::config::ConnectorConfig;

/// One exported email message on disk.
#[derive(Debug, Deserialize)]
struct EmailRecord {
    #[serde(default)]
    from: Option<String>,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug)]
pub struct FileBasedJsonConnector {
    name: String,
    data_path: PathBuf,
}

impl FileBasedJsonConnector {
    pub fn new(config: &ConnectorConfig) -> Result<Self, EvidenceError> {
        let data_path = PathBuf::from(config.require_str("data_path")?);
        Ok(Self {
            name: config.name.clone(),
            data_path,
        })
    }

    fn parse_file(&self, path: &Path) -> Result<EvidenceDocument, EvidenceError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EvidenceError::parse(format!("{}: {e}", path.display())))?;
        let record: EmailRecord = serde_json::from_str(&raw)
            .map_err(|e| EvidenceError::parse(format!("{}: {e}", path.display())))?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "record".to_string());

        let collected_at = record
            .date
            .as_deref()
            .and_then(parse_record_date)
            .unwrap_or_else(Utc::now);

        let sender = record.from.clone().unwrap_or_else(|| "unknown@unknown".to_string());

        let mut document = EvidenceDocument::new(
            DocumentId::new(format!("{}-{stem}", self.name))?,
            self.name.clone(),
            collected_at,
            Custodian::from_email(&sender),
        )
        .with_subject(record.subject.unwrap_or_else(|| "No Subject".to_string()))
        .with_body_text(record.body.unwrap_or_default())
        .with_metadata("from", sender.clone())
        .with_metadata("to", record.to.unwrap_or_default())
        .with_metadata("date", record.date.unwrap_or_default());

        document.record_custody_event(
            CustodyEvent::now(&self.name, actions::COLLECTED)
                .with_metadata("source_file", path.display().to_string()),
        );
        Ok(document)
    }

    fn list_files(&self) -> Result<Vec<PathBuf>, EvidenceError> {
        if !self.data_path.is_dir() {
            return Err(EvidenceError::config(format!(
                "data path not found: {}",
                self.data_path.display()
            )));
        }
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.data_path)
            .map_err(|e| EvidenceError::storage(e.to_string()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }
}

impl SourceConnector for FileBasedJsonConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn fetch(&self) -> DocumentStream<'_> {
        Box::pin(try_stream! {
            let files = self.list_files()?;
            info!("{}: found {} email files to ingest", self.name, files.len());
            let mut skipped = 0usize;
            for path in files {
                match self.parse_file(&path) {
                    Ok(document) => yield document,
                    Err(err) => {
                        skipped += 1;
                        warn!("{}: skipping {}: {err}", self.name, path.display());
                    }
                }
            }
            if skipped > 0 {
                warn!("{}: skipped {skipped} malformed files", self.name);
            }
        })
    }
}

/// Accepts `YYYY-MM-DD` or full RFC 3339 timestamps.
fn parse_record_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
