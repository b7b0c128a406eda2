//! # Integration Flows
//!
//! Drive `ShardedRecordService` through its lifecycle events the way a host
//! would, checking both the in-memory view and what reached the backend.

pub mod contention;
pub mod lifecycle;
pub mod recovery;
