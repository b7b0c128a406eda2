//! # Engine Configuration
//!
//! Packing budget and backend namespace names.

use super::errors::RecordError;
use serde::{Deserialize, Serialize};

/// Default packing budget per fragment, in estimated bytes.
pub const DEFAULT_SHARD_BYTE_LIMIT: usize = 4_000_000;

/// Configuration for the record sharding engine.
///
/// All values have defaults suitable for a backend with a 4 MB per-key
/// payload limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Estimated-byte budget for one shard fragment.
    ///
    /// The estimate ignores encoding overhead, so this is a packing
    /// heuristic rather than an exact backend limit.
    pub shard_byte_limit: usize,
    /// Namespace holding owner records.
    pub record_namespace: String,
    /// Namespace holding shard fragments.
    pub fragment_namespace: String,
    /// Namespace holding global root fields.
    pub global_namespace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            shard_byte_limit: DEFAULT_SHARD_BYTE_LIMIT,
            record_namespace: "records".to_string(),
            fragment_namespace: "shards".to_string(),
            global_namespace: "global".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Small budget for tests.
    pub fn for_testing() -> Self {
        Self::default().with_shard_byte_limit(64)
    }

    /// Set the packing budget.
    pub fn with_shard_byte_limit(mut self, limit: usize) -> Self {
        self.shard_byte_limit = limit;
        self
    }

    /// Set the three backend namespace names.
    pub fn with_namespaces(
        mut self,
        records: impl Into<String>,
        fragments: impl Into<String>,
        global: impl Into<String>,
    ) -> Self {
        self.record_namespace = records.into();
        self.fragment_namespace = fragments.into();
        self.global_namespace = global.into();
        self
    }

    /// Reject unusable values.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.shard_byte_limit == 0 {
            return Err(RecordError::ConfigError(
                "shard_byte_limit must be greater than zero".to_string(),
            ));
        }
        let names = [
            &self.record_namespace,
            &self.fragment_namespace,
            &self.global_namespace,
        ];
        if names.iter().any(|name| name.is_empty()) {
            return Err(RecordError::ConfigError(
                "namespace names must not be empty".to_string(),
            ));
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(RecordError::ConfigError(
                "namespace names must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}
