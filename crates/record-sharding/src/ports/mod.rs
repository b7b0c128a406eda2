//! # Ports Module
//!
//! Hexagonal architecture ports: the API this crate offers and the
//! dependencies it needs.

pub mod inbound;
pub mod outbound;

pub use inbound::{RecordLifecycle, ShardedRecordsApi};
pub use outbound::{RecordBackend, ValueCodec};
