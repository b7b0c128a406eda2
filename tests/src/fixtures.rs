//! # Test Fixtures
//!
//! Shared schemas and service builders, plus a backend whose writes can be
//! held open to keep a save in flight.

use async_trait::async_trait;
use record_sharding::{
    record, EngineConfig, InMemoryBackend, Record, RecordBackend, RecordError, Schema,
    ShardedRecordService, Value,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};
use tracing::debug;

/// Service over the plain in-memory backend.
pub type MemoryService = ShardedRecordService<InMemoryBackend>;

/// Packing budget used by the integration flows.
pub const SHARD_LIMIT: usize = 32;

/// Install a `RUST_LOG`-driven subscriber; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Player template with a sharded inventory, a sharded global leaderboard
/// and a scalar global season counter.
pub fn player_schema() -> Schema {
    Schema::new(record([
        ("coins", Value::from(0)),
        (
            "stats",
            Value::Map(record([("level", Value::from(1)), ("xp", Value::from(0))])),
        ),
        ("inventory", Value::empty_map()),
        ("quests", Value::List(Vec::new())),
        ("leaderboard", Value::empty_map()),
        ("season", Value::from(1)),
    ]))
    .with_sharded_fields(["inventory", "leaderboard"])
    .expect("sharded field paths parse")
    .with_global_fields(["leaderboard", "season"])
    .expect("global field paths parse")
}

/// `count` inventory entries of about 18 estimated bytes each.
pub fn items(count: usize) -> Record {
    (0..count)
        .map(|i| (format!("item_{i:03}"), Value::from("x".repeat(10))))
        .collect()
}

/// Engine configuration used by the flows.
pub fn test_config() -> EngineConfig {
    EngineConfig::new().with_shard_byte_limit(SHARD_LIMIT)
}

/// Service over `backend` with [`test_config`].
pub fn memory_service(backend: &Arc<InMemoryBackend>) -> MemoryService {
    ShardedRecordService::with_json(Arc::clone(backend), test_config())
        .expect("test config is valid")
}

/// Backend whose `set` calls park at a gate while it is closed.
#[derive(Debug)]
pub struct GatedBackend {
    inner: InMemoryBackend,
    closed: AtomicBool,
    gate: Semaphore,
    arrived: Notify,
}

impl Default for GatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl GatedBackend {
    /// Create an open gate over an empty store.
    pub fn new() -> Self {
        Self {
            inner: InMemoryBackend::new(),
            closed: AtomicBool::new(false),
            gate: Semaphore::new(0),
            arrived: Notify::new(),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }

    /// Park every following write.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Release parked writes and stop parking new ones.
    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
        self.gate.add_permits(1024);
    }

    /// Resolve once a write has reached the closed gate.
    pub async fn write_parked(&self) {
        self.arrived.notified().await;
    }
}

#[async_trait]
impl RecordBackend for GatedBackend {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Vec<u8>>, RecordError> {
        self.inner.get(namespace, key).await
    }

    async fn set(&self, namespace: &str, key: &str, payload: Vec<u8>) -> Result<(), RecordError> {
        if self.closed.load(Ordering::SeqCst) {
            debug!("[records] write {}/{} parked at gate", namespace, key);
            self.arrived.notify_one();
            self.gate
                .acquire()
                .await
                .map_err(|e| RecordError::backend(namespace, key, e.to_string()))?
                .forget();
        }
        self.inner.set(namespace, key, payload).await
    }

    async fn remove(&self, namespace: &str, key: &str) -> Result<(), RecordError> {
        self.inner.remove(namespace, key).await
    }
}
