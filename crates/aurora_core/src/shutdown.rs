//! Shutdown coordination between the signal handler, the accept loop and
//! connection tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::info;

/// Shared shutdown flags. Cloning shares the same state.
#[derive(Debug, Clone, Default)]
pub struct ShutdownState {
    /// No new connections or requests are accepted.
    initiated: Arc<AtomicBool>,
    /// Every connection has been torn down.
    complete: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutdown_initiated(&self) -> bool {
        self.initiated.load(Ordering::Acquire)
    }

    pub fn is_shutdown_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// Stops intake and wakes everything parked in [`wait`](Self::wait).
    pub fn initiate_shutdown(&self) {
        if !self.initiated.swap(true, Ordering::AcqRel) {
            info!("🛑 Shutdown initiated - closing listener and connections");
        }
        self.notify.notify_waiters();
    }

    pub fn complete_shutdown(&self) {
        self.complete.store(true, Ordering::Release);
        info!("✅ All connections closed - ready for final cleanup");
    }

    /// Resolves once shutdown has been initiated.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_shutdown_initiated() {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn waiters_wake_on_initiate() {
        let state = ShutdownState::new();
        let waiter = {
            let state = state.clone();
            tokio::spawn(async move { state.wait().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!state.is_shutdown_initiated());

        state.initiate_shutdown();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not wake")
            .unwrap();
        assert!(state.is_shutdown_initiated());
        assert!(!state.is_shutdown_complete());
    }

    #[tokio::test]
    async fn wait_returns_immediately_after_initiate() {
        let state = ShutdownState::new();
        state.initiate_shutdown();
        state.wait().await;
        state.complete_shutdown();
        assert!(state.is_shutdown_complete());
    }
}
