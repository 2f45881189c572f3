// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Retry Policy
//!
//! Bounded retries with exponential backoff for transient failures:
//! 3 attempts, delays doubling from 2 s and capped at 10 s. Rate-limit
//! errors override the computed delay with the server-provided
//! `Retry-After` value. Only errors classified recoverable by the domain
//! taxonomy are retried; everything else propagates immediately.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use evidence_domain::EvidenceError;

/// Backoff parameters for an operation class.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before the retry following `attempt` (1-based).
    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.base_delay.saturating_mul(1u32 << (attempt.saturating_sub(1)).min(16));
        exp.min(self.max_delay)
    }
}

/// Runs `operation` until it succeeds, fails unrecoverably, or exhausts
/// the retry budget.
pub async fn retry_async<T, F, Fut>(
    policy: RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, EvidenceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EvidenceError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_recoverable() && attempt < policy.max_attempts => {
                let delay = match &err {
                    EvidenceError::RateLimited {
                        retry_after: Some(seconds),
                        ..
                    } => Duration::from_secs(*seconds),
                    _ => policy.delay_for(attempt),
                };
                warn!(
                    "{operation_name} attempt {attempt}/{} failed ({err}), retrying in {:?}",
                    policy.max_attempts, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result = retry_async(fast_policy(), "unit", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(EvidenceError::transport("connection reset"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = retry_async(fast_policy(), "unit", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EvidenceError::storage("put failed"))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_unrecoverable_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let result: Result<(), _> = retry_async(fast_policy(), "unit", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(EvidenceError::integrity("checksum mismatch"))
            }
        })
        .await;
        assert!(matches!(result, Err(EvidenceError::Integrity(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
        assert_eq!(policy.delay_for(4), Duration::from_secs(10));
        assert_eq!(policy.delay_for(30), Duration::from_secs(10));
    }
}
