// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Job Progress Registry
//!
//! Shared progress state for enrichment jobs. All mutations go through
//! the registry's lock; readers get consistent snapshots. Entries are
//! created when a job starts, read by status surfaces, and evicted after
//! a TTL past completion so the registry never leaks entries.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Default eviction delay after completion.
const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Outcome of one enriched document, insertion-ordered by completion.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentOutcome {
    pub document_id: String,
    pub subject: Option<String>,
    pub relevance: u8,
    pub privilege_risk: u8,
    pub classification: String,
    pub key_findings: String,
    pub redacted: bool,
    pub failed: bool,
}

/// Redacted rendition of a document; kept on the job only, never written
/// back to the canonical document.
#[derive(Debug, Clone, PartialEq)]
pub struct RedactionOutcome {
    pub document_id: String,
    pub original_subject: Option<String>,
    pub original_body: Option<String>,
    pub redacted_subject: String,
    pub redacted_body: String,
    pub redaction_summary: String,
}

/// Progress record for one job.
#[derive(Debug, Clone, Default)]
pub struct JobProgress {
    pub total: usize,
    pub processed: usize,
    pub current_document: Option<String>,
    pub current_subject: Option<String>,
    pub results: Vec<DocumentOutcome>,
    pub redactions: Vec<RedactionOutcome>,
    pub completed: bool,
}

struct Entry {
    progress: JobProgress,
    completed_at: Option<Instant>,
}

/// Process-wide registry of enrichment job progress.
pub struct ProgressRegistry {
    jobs: Mutex<HashMap<Uuid, Entry>>,
    ttl: Duration,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Registers a new job. Expired entries are evicted opportunistically.
    pub fn start_job(&self, job_id: Uuid, total: usize) {
        let mut jobs = self.jobs.lock();
        let ttl = self.ttl;
        jobs.retain(|_, entry| {
            entry
                .completed_at
                .map(|at| at.elapsed() < ttl)
                .unwrap_or(true)
        });
        jobs.insert(
            job_id,
            Entry {
                progress: JobProgress {
                    total,
                    ..JobProgress::default()
                },
                completed_at: None,
            },
        );
    }

    /// Mutates a job's progress under the registry lock.
    pub fn update<F>(&self, job_id: Uuid, mutate: F)
    where
        F: FnOnce(&mut JobProgress),
    {
        if let Some(entry) = self.jobs.lock().get_mut(&job_id) {
            mutate(&mut entry.progress);
        }
    }

    /// Marks a job finished, starting its eviction clock.
    pub fn complete(&self, job_id: Uuid) {
        if let Some(entry) = self.jobs.lock().get_mut(&job_id) {
            entry.progress.completed = true;
            entry.completed_at = Some(Instant::now());
        }
    }

    /// Consistent snapshot of a job's progress.
    pub fn snapshot(&self, job_id: Uuid) -> Option<JobProgress> {
        self.jobs.lock().get(&job_id).map(|entry| entry.progress.clone())
    }

    /// Number of tracked jobs (post-eviction count is approximate until
    /// the next `start_job`).
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }
}

impl Default for ProgressRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let registry = ProgressRegistry::new();
        let job_id = Uuid::new_v4();

        registry.start_job(job_id, 3);
        registry.update(job_id, |progress| {
            progress.processed += 1;
            progress.current_document = Some("doc-1".to_string());
        });

        let snapshot = registry.snapshot(job_id).unwrap();
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.processed, 1);
        assert!(!snapshot.completed);

        registry.complete(job_id);
        assert!(registry.snapshot(job_id).unwrap().completed);
    }

    #[test]
    fn test_unknown_job_is_ignored() {
        let registry = ProgressRegistry::new();
        registry.update(Uuid::new_v4(), |progress| {
            progress.processed += 1;
        });
        assert!(registry.snapshot(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_completed_jobs_evicted_after_ttl() {
        let registry = ProgressRegistry::with_ttl(Duration::from_millis(0));
        let finished = Uuid::new_v4();
        registry.start_job(finished, 1);
        registry.complete(finished);

        // The next start sweeps expired entries.
        let fresh = Uuid::new_v4();
        registry.start_job(fresh, 1);
        assert!(registry.snapshot(finished).is_none());
        assert!(registry.snapshot(fresh).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_running_jobs_survive_sweep() {
        let registry = ProgressRegistry::with_ttl(Duration::from_millis(0));
        let running = Uuid::new_v4();
        registry.start_job(running, 5);

        registry.start_job(Uuid::new_v4(), 1);
        assert!(registry.snapshot(running).is_some());
    }
}
