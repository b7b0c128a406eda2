//! # Inbound Ports
//!
//! API traits defining what the record sharding engine can do, and the
//! lifecycle events a host drives it with.

use crate::domain::{
    Operation, OperationOutcome, OwnerId, Record, RecordError, Schema, ShutdownReport, Value,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// Record sharding API - inbound port.
///
/// `owner = None` addresses the global namespace. Reads and operations
/// suspend until the addressed namespace has finished its initial load.
#[async_trait]
pub trait ShardedRecordsApi: Send + Sync {
    /// Install the schema and load every declared global field.
    async fn initialize(&self, schema: Schema) -> Result<(), RecordError>;

    /// Read the value at `path`.
    async fn read(&self, owner: Option<OwnerId>, path: &str) -> Result<Option<Value>, RecordError>;

    /// Apply one atomic operation.
    async fn apply_operator(
        &self,
        owner: Option<OwnerId>,
        operation: Operation,
    ) -> Result<OperationOutcome, RecordError>;

    /// Shard (`enabled`) or unshard the table at `path`.
    async fn set_sharding(
        &self,
        owner: Option<OwnerId>,
        path: &str,
        enabled: bool,
    ) -> Result<(), RecordError>;

    /// Delete an owner's record from memory and the backend.
    async fn delete_owner_record(&self, owner: OwnerId) -> Result<(), RecordError>;

    /// Delete a global root field from memory and the backend.
    async fn delete_global_field(&self, path: &str) -> Result<(), RecordError>;

    /// Raw owner records: one owner, or all attached owners.
    fn raw_owner_records(&self, owner: Option<OwnerId>) -> HashMap<OwnerId, Record>;

    /// Raw fragment store: one fragment, or all of them.
    fn raw_fragment_store(&self, key: Option<&str>) -> HashMap<String, Record>;

    /// Raw global record, or the raw value at one path in it.
    fn raw_global_record(&self, path: Option<&str>) -> Result<Option<Value>, RecordError>;
}

/// Lifecycle events delivered by the host environment.
#[async_trait]
pub trait RecordLifecycle: Send + Sync {
    /// An owner joined: load and reconcile its record, then fire readiness.
    async fn owner_attached(&self, owner: OwnerId) -> Result<(), RecordError>;

    /// An owner left: recover sharding, persist and evict its record.
    async fn owner_detached(&self, owner: OwnerId) -> Result<(), RecordError>;

    /// The process is stopping: persist every attached owner and every
    /// declared global field.
    async fn shutdown(&self) -> ShutdownReport;
}
