//! # Record Sharding
//!
//! Path-addressed nested records persisted to a size-limited key-value
//! backend, with oversized tables split into shard fragments.
//!
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Address nested fields with path strings (`inventory.items['a.b']`)
//! - Split large tables into fragments that fit a per-key byte budget
//! - Apply atomic operators through an unshard → mutate → reshard protocol
//! - Suspend callers until an owner's or the global namespace's load finishes
//!
//! ## Invariants
//!
//! | Rule | Enforced by |
//! |------|-------------|
//! | Fragments never contain markers | `invariant_no_nested_markers` |
//! | A marker with count N has fragments 1..=N | `invariant_marker_count` |
//! | Declared sharded fields are stored sharded | `ShardingCoordinator::recover` |
//! | One global operation per root field at a time | `RootLocks` |
//!
//! ## Module Structure
//!
//! ```text
//! record-sharding/
//! ├── domain/          # Value, Path, Scope, Schema, EngineConfig, RecordError
//! ├── algorithms/      # Path resolver, size estimator, shard packer, operators
//! ├── ports/           # API traits + backend/codec traits
//! ├── adapters/        # In-memory backend, JSON codec
//! ├── store.rs         # Records, global record, fragment store
//! ├── coordinator.rs   # Sharding transitions
//! ├── locks.rs         # Global root locks
//! ├── readiness.rs     # One-shot readiness signal
//! └── service/         # Async facade
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod algorithms;
pub mod coordinator;
pub mod domain;
pub mod locks;
pub mod ports;
pub mod readiness;
pub mod service;
pub mod store;

// Re-exports
pub use adapters::{InMemoryBackend, JsonCodec};
pub use coordinator::ShardingCoordinator;
pub use domain::{
    record, EngineConfig, Operation, OperationOutcome, OperatorKind, OwnerId, Path, Record,
    RecordError, Schema, Scope, ShardMarker, ShutdownReport, Value, DEFAULT_SHARD_BYTE_LIMIT,
};
pub use locks::{RootLockGuard, RootLocks};
pub use ports::{RecordBackend, RecordLifecycle, ShardedRecordsApi, ValueCodec};
pub use readiness::{LoadStatus, ReadinessSignal};
pub use service::ShardedRecordService;
pub use store::RecordStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
