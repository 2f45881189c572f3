// /////////////////////////////////////////////////////////////////////////////
// Evidence Ingestion Pipeline
// Copyright (c) 2025 Evidence Pipeline Contributors
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Signal Handling & Shutdown Coordination
//!
//! Translates ctrl-c (and SIGTERM on Unix) into a cloneable
//! [`ShutdownToken`]. Long-running work checks `is_cancelled` at batch
//! boundaries and selects on `cancelled()` around sleeps, so a signal
//! interrupts at the next I/O boundary while already-persisted partial
//! results remain durable.

use tokio::sync::watch;
use tracing::info;

/// Cloneable handle observing shutdown state.
#[derive(Debug, Clone)]
pub struct ShutdownToken {
    receiver: watch::Receiver<bool>,
}

impl ShutdownToken {
    /// A token that never fires; useful for tests and one-shot commands.
    pub fn inert() -> Self {
        let (sender, receiver) = watch::channel(false);
        // Keep the channel open for the lifetime of the process.
        std::mem::forget(sender);
        Self { receiver }
    }

    /// Whether shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves when shutdown is requested (or the sender is dropped).
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow() {
                return;
            }
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Installs signal handlers and returns the token they trip.
///
/// The background task stays alive for the process lifetime; a second
/// signal after the first is left to the runtime's default handling.
pub fn install_shutdown_handler() -> ShutdownToken {
    let (sender, receiver) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Shutdown signal received, finishing in-flight work");
        let _ = sender.send(true);
        // Hold the sender so receivers keep observing `true`.
        std::future::pending::<()>().await;
    });

    ShutdownToken { receiver }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_inert_token_never_cancels() {
        let token = ShutdownToken::inert();
        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_token_observes_trigger() {
        let (sender, receiver) = watch::channel(false);
        let token = ShutdownToken { receiver };
        assert!(!token.is_cancelled());

        sender.send(true).unwrap();
        assert!(token.is_cancelled());
        // cancelled() resolves immediately once tripped.
        token.cancelled().await;
    }

    #[tokio::test]
    async fn test_cancelled_resolves_on_sender_drop() {
        let (sender, receiver) = watch::channel(false);
        let token = ShutdownToken { receiver };
        drop(sender);
        token.cancelled().await;
    }
}
