//! # Domain Errors
//!
//! Error types for the record sharding engine.
//!
//! Every failure is local and recoverable: the operation did not happen and
//! the previous state is preserved.

use thiserror::Error;

/// Owner identifier (one attached session drives one owner).
pub type OwnerId = u64;

/// Record sharding error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// A backend get/set/remove call failed.
    #[error("Backend unavailable ({namespace}/{key}): {reason}")]
    BackendUnavailable {
        /// Logical namespace of the call.
        namespace: String,
        /// Key being accessed.
        key: String,
        /// Backend failure message.
        reason: String,
    },

    /// The path does not resolve inside the record.
    #[error("Path not found: {0}")]
    PathNotFound(String),

    /// The target of an operation resolved to nothing.
    #[error("Value not found at path: {0}")]
    ValueNotFound(String),

    /// An intermediate segment, or the target itself, is not a container.
    #[error("Invalid path target: {0}")]
    InvalidPathTarget(String),

    /// The path string could not be tokenized.
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath {
        /// The rejected path string.
        path: String,
        /// Why the tokenizer rejected it.
        reason: String,
    },

    /// Operator name is not recognized.
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// The current value or operand does not satisfy the operator precondition.
    #[error("Operator {operator} expects {expected}")]
    OperandMismatch {
        /// Operator being applied.
        operator: String,
        /// What the operator required.
        expected: String,
    },

    /// A fragment needed for a merge is absent.
    #[error("Shard fragment missing: {key}")]
    ShardFragmentMissing {
        /// Composite key of the absent fragment.
        key: String,
    },

    /// Another global operation holds the root field.
    #[error("Global root locked: {0}")]
    GlobalRootLocked(String),

    /// The root field is not declared global.
    #[error("Not a global field: {0}")]
    NotGlobalField(String),

    /// The owner's initial load failed.
    #[error("Owner {owner} not loaded: {reason}")]
    OwnerNotLoaded {
        /// Owner whose load failed.
        owner: OwnerId,
        /// Load failure message.
        reason: String,
    },

    /// Encoding or decoding a payload failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration rejected.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RecordError {
    /// Build a `BackendUnavailable` error.
    pub fn backend(namespace: &str, key: &str, reason: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            namespace: namespace.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Build an `OperandMismatch` error.
    pub fn mismatch(operator: &str, expected: &str) -> Self {
        Self::OperandMismatch {
            operator: operator.to_string(),
            expected: expected.to_string(),
        }
    }
}
