//! # Readiness Signal
//!
//! Single-fire broadcast with replay. Callers that wait before the signal
//! fires are suspended; once fired, the payload is kept forever and every
//! later waiter returns immediately.

use tokio::sync::watch;

/// Whether an owner's initial load succeeded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadStatus {
    /// Record loaded and reconciled.
    Loaded,
    /// Load failed; operations on the owner are rejected.
    Failed(String),
}

/// One-shot gate carrying the payload it was fired with.
#[derive(Debug)]
pub struct ReadinessSignal<T> {
    state: watch::Sender<Option<T>>,
}

impl<T: Clone> ReadinessSignal<T> {
    /// Create an unfired signal.
    pub fn new() -> Self {
        let (state, _) = watch::channel(None);
        Self { state }
    }

    /// Create a signal that has already fired.
    pub fn fired(payload: T) -> Self {
        let (state, _) = watch::channel(Some(payload));
        Self { state }
    }

    /// Fire the signal. Returns `false` if it had already fired; the first
    /// payload is kept.
    pub fn fire(&self, payload: T) -> bool {
        self.state.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(payload);
            true
        })
    }

    /// Has the signal fired?
    pub fn is_fired(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Payload if fired, without waiting.
    pub fn peek(&self) -> Option<T> {
        self.state.borrow().clone()
    }

    /// Suspend until the signal fires, then return its payload.
    pub async fn wait(&self) -> T {
        let mut rx = self.state.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(payload) = current {
                return payload;
            }
            // The sender lives in `self`, so the channel cannot close here.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl<T: Clone> Default for ReadinessSignal<T> {
    fn default() -> Self {
        Self::new()
    }
}
