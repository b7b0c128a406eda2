//! # Root Locks
//!
//! Advisory per-root-field flags for global operations. Acquisition never
//! waits: a held root is rejected with `GlobalRootLocked` and the caller
//! retries later.

use crate::domain::RecordError;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Table of held global root fields.
#[derive(Clone, Debug, Default)]
pub struct RootLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl RootLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock for `root`, or fail immediately if it is held.
    pub fn try_acquire(&self, root: &str) -> Result<RootLockGuard, RecordError> {
        if !self.held.lock().insert(root.to_string()) {
            debug!("[records] Global root {} is locked, rejecting", root);
            return Err(RecordError::GlobalRootLocked(root.to_string()));
        }
        Ok(RootLockGuard {
            held: Arc::clone(&self.held),
            root: root.to_string(),
        })
    }

    /// Is `root` currently held?
    pub fn is_locked(&self, root: &str) -> bool {
        self.held.lock().contains(root)
    }
}

/// Held root lock; released on drop.
#[derive(Debug)]
pub struct RootLockGuard {
    held: Arc<Mutex<HashSet<String>>>,
    root: String,
}

impl RootLockGuard {
    /// Root field this guard holds.
    pub fn root(&self) -> &str {
        &self.root
    }
}

impl Drop for RootLockGuard {
    fn drop(&mut self) {
        self.held.lock().remove(&self.root);
    }
}
