//! # Outbound Ports
//!
//! Traits for external dependencies: the size-limited key-value backend and
//! the payload codec.

use crate::domain::{RecordError, Value};
use async_trait::async_trait;

/// Key-value backend with three logical namespaces (records, fragments,
/// global fields).
///
/// Implementations own retries and size-limit enforcement; every failure
/// surfaces as `RecordError::BackendUnavailable`.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Get a payload. `Ok(None)` when the key is absent.
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, RecordError>;

    /// Store a payload.
    async fn set(&self, namespace: &str, key: &str, payload: Vec<u8>) -> Result<(), RecordError>;

    /// Remove a key. Removing an absent key succeeds.
    async fn remove(&self, namespace: &str, key: &str) -> Result<(), RecordError>;
}

/// Turns in-memory values into backend payloads and back.
pub trait ValueCodec: Send + Sync {
    /// Encode a value.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, RecordError>;

    /// Decode a value.
    fn decode(&self, payload: &[u8]) -> Result<Value, RecordError>;
}
