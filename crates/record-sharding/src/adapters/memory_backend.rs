//! In-Memory Backend Adapter
//!
//! Implements `RecordBackend` over a `HashMap`, with switches to simulate an
//! unavailable backend and a per-key payload limit.

use crate::domain::RecordError;
use crate::ports::outbound::RecordBackend;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

/// In-memory key-value backend for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    /// (namespace, key) -> payload.
    data: RwLock<HashMap<(String, String), Vec<u8>>>,
    /// When set, every call fails.
    unavailable: AtomicBool,
    /// Per-key payload limit in bytes (0 = unlimited).
    max_payload: AtomicUsize,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects payloads larger than `limit` bytes.
    pub fn with_payload_limit(limit: usize) -> Self {
        let backend = Self::new();
        backend.max_payload.store(limit, Ordering::SeqCst);
        backend
    }

    /// Make every call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Payload stored under `key`, bypassing availability.
    pub fn raw(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.data
            .read()
            .get(&(namespace.to_string(), key.to_string()))
            .cloned()
    }

    /// Seed a payload, bypassing availability and limits.
    pub fn insert_raw(&self, namespace: &str, key: &str, payload: Vec<u8>) {
        self.data
            .write()
            .insert((namespace.to_string(), key.to_string()), payload);
    }

    /// Drop a payload, bypassing availability.
    pub fn remove_raw(&self, namespace: &str, key: &str) -> Option<Vec<u8>> {
        self.data
            .write()
            .remove(&(namespace.to_string(), key.to_string()))
    }

    /// Keys stored in `namespace`, sorted.
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .data
            .read()
            .keys()
            .filter(|(ns, _)| ns == namespace)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn check_available(&self, namespace: &str, key: &str) -> Result<(), RecordError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RecordError::backend(namespace, key, "backend unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordBackend for InMemoryBackend {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, RecordError> {
        self.check_available(namespace, key)?;
        debug!("[records] backend get {}/{}", namespace, key);
        Ok(self.raw(namespace, key))
    }

    async fn set(&self, namespace: &str, key: &str, payload: Vec<u8>) -> Result<(), RecordError> {
        self.check_available(namespace, key)?;
        let limit = self.max_payload.load(Ordering::SeqCst);
        if limit > 0 && payload.len() > limit {
            return Err(RecordError::backend(
                namespace,
                key,
                format!("payload of {} bytes exceeds limit {}", payload.len(), limit),
            ));
        }
        debug!("[records] backend set {}/{} ({} bytes)", namespace, key, payload.len());
        self.insert_raw(namespace, key, payload);
        Ok(())
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), RecordError> {
        self.check_available(namespace, key)?;
        debug!("[records] backend remove {}/{}", namespace, key);
        self.remove_raw(namespace, key);
        Ok(())
    }
}
