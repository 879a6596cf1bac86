//! Scheduled-task abstraction with explicit cancellation.
//!
//! Every timer the connection manager runs (throughput tick, reconnect
//! backoff) lives inside one [`ScheduledTask`] and races against its
//! [`CancelToken`]. Cancelling the token and awaiting the task guarantees
//! nothing scheduled by it fires afterwards.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Cloneable one-shot cancellation flag
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called on any clone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // sender lives in self, so this only errs if the runtime is tearing down
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// How a cancellable timer ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Fired,
    Cancelled,
}

/// Sleep for `delay` unless the token is cancelled first.
pub async fn sleep_or_cancel(delay: Duration, token: &CancelToken) -> TimerOutcome {
    tokio::select! {
        biased;
        _ = token.cancelled() => TimerOutcome::Cancelled,
        _ = tokio::time::sleep(delay) => TimerOutcome::Fired,
    }
}

/// Spawned task paired with the token that stops it
#[derive(Debug)]
pub struct ScheduledTask {
    token: CancelToken,
    handle: JoinHandle<()>,
}

impl ScheduledTask {
    /// Spawn `body` on the current tokio runtime, handing it a fresh token.
    pub fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(CancelToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancelToken::new();
        let handle = tokio::spawn(body(token.clone()));
        Self { token, handle }
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Request cancellation without waiting for the task to observe it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait until the task body has returned.
    pub async fn cancel_and_wait(self) {
        self.token.cancel();
        if let Err(err) = self.handle.await {
            log::error!("[ScheduledTask] Task ended abnormally: {}", err);
        }
    }
}
