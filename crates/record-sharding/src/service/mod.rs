//! # Sharded Record Service
//!
//! The async facade implementing `ShardedRecordsApi` and `RecordLifecycle`.
//!
//! ## Architecture
//!
//! This service:
//! 1. Suspends callers on per-scope readiness signals until the initial load
//! 2. Runs every read and operation as one synchronous block over the store
//! 3. Guards global root fields with advisory `RootLocks`
//! 4. Talks to the backend only to load or save whole records
//!
//! The store sits behind a `parking_lot::Mutex` that is never held across an
//! `.await`, so no backend call can land between an unshard and its
//! reshard.

mod api;
mod lifecycle;
mod persistence;


use crate::adapters::JsonCodec;
use crate::coordinator::ShardingCoordinator;
use crate::domain::{EngineConfig, OwnerId, Path, RecordError, Schema, Scope};
use crate::locks::{RootLockGuard, RootLocks};
use crate::ports::outbound::{RecordBackend, ValueCodec};
use crate::readiness::{LoadStatus, ReadinessSignal};
use crate::store::RecordStore;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

type OwnerSignals = HashMap<OwnerId, Arc<ReadinessSignal<LoadStatus>>>;

/// The record sharding service.
pub struct ShardedRecordService<B, C = JsonCodec>
where
    B: RecordBackend,
    C: ValueCodec,
{
    /// Key-value backend.
    backend: Arc<B>,
    /// Payload codec.
    codec: C,
    /// Engine configuration.
    config: EngineConfig,
    /// Shard/unshard transitions.
    coordinator: ShardingCoordinator,
    /// Schema installed by `initialize`.
    schema: RwLock<Schema>,
    /// In-memory records and fragments.
    store: Mutex<RecordStore>,
    /// Advisory locks for global root fields.
    root_locks: RootLocks,
    /// Per-owner readiness.
    owner_ready: Mutex<OwnerSignals>,
    /// Detach saves in flight, keyed by owner. Fired when the save settles.
    detaching: Mutex<HashMap<OwnerId, Arc<ReadinessSignal<()>>>>,
    /// Fires once every declared global field has loaded.
    global_ready: ReadinessSignal<()>,
}

impl<B: RecordBackend> ShardedRecordService<B, JsonCodec> {
    /// Create a service storing JSON payloads.
    pub fn with_json(backend: Arc<B>, config: EngineConfig) -> Result<Self, RecordError> {
        Self::new(backend, JsonCodec, config)
    }
}

impl<B, C> ShardedRecordService<B, C>
where
    B: RecordBackend,
    C: ValueCodec,
{
    /// Create a new service. Fails if `config` is invalid.
    pub fn new(backend: Arc<B>, codec: C, config: EngineConfig) -> Result<Self, RecordError> {
        config.validate()?;
        info!(
            "[records] Service created (shard limit {} bytes, namespaces {}/{}/{})",
            config.shard_byte_limit,
            config.record_namespace,
            config.fragment_namespace,
            config.global_namespace
        );

        Ok(Self {
            backend,
            codec,
            coordinator: ShardingCoordinator::new(config.shard_byte_limit),
            config,
            schema: RwLock::new(Schema::default()),
            store: Mutex::new(RecordStore::new()),
            root_locks: RootLocks::new(),
            owner_ready: Mutex::new(HashMap::new()),
            detaching: Mutex::new(HashMap::new()),
            global_ready: ReadinessSignal::new(),
        })
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The installed schema.
    pub fn schema(&self) -> Schema {
        self.schema.read().clone()
    }

    /// The backend this service persists to.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Has `initialize` completed?
    pub fn is_initialized(&self) -> bool {
        self.global_ready.is_fired()
    }

    /// Is the owner's record in memory?
    pub fn is_attached(&self, owner: OwnerId) -> bool {
        self.store.lock().has_owner(owner)
    }

    /// Attached owners, ascending.
    pub fn attached_owners(&self) -> Vec<OwnerId> {
        self.store.lock().owner_ids()
    }

    /// Take the advisory lock of a declared global root field.
    ///
    /// Operations on that field are rejected with `GlobalRootLocked` until
    /// the guard is dropped.
    pub fn lock_global_root(&self, field: &str) -> Result<RootLockGuard, RecordError> {
        self.ensure_global_field(field)?;
        self.root_locks.try_acquire(field)
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    /// Readiness signal of `owner`, created unfired on first use.
    fn owner_signal(&self, owner: OwnerId) -> Arc<ReadinessSignal<LoadStatus>> {
        Arc::clone(self.owner_ready.lock().entry(owner).or_default())
    }

    /// Signal for a new load of `owner`: the pending one if callers are
    /// already queued on it, otherwise a fresh one.
    fn loading_signal(&self, owner: OwnerId) -> Arc<ReadinessSignal<LoadStatus>> {
        let mut ready = self.owner_ready.lock();
        match ready.get(&owner) {
            Some(signal) if !signal.is_fired() => Arc::clone(signal),
            _ => {
                let signal = Arc::new(ReadinessSignal::new());
                ready.insert(owner, Arc::clone(&signal));
                signal
            }
        }
    }

    /// Suspend until `scope` has loaded.
    async fn wait_ready(&self, scope: Scope) -> Result<(), RecordError> {
        match scope {
            Scope::Global => {
                self.global_ready.wait().await;
                Ok(())
            }
            Scope::Owner(owner) => {
                let waiter = OwnerWaiter {
                    table: &self.owner_ready,
                    owner,
                    signal: Some(self.owner_signal(owner)),
                };
                match waiter.wait().await {
                    LoadStatus::Loaded => Ok(()),
                    LoadStatus::Failed(reason) => Err(RecordError::OwnerNotLoaded { owner, reason }),
                }
            }
        }
    }

    /// Whether `owner` is in memory, and its detach save if one is in
    /// flight. Both are read under the store lock.
    fn attach_state(&self, owner: OwnerId) -> (bool, Option<Arc<ReadinessSignal<()>>>) {
        let store = self.store.lock();
        let pending = self.detaching.lock().get(&owner).cloned();
        (store.has_owner(owner), pending)
    }

    /// Suspend while a detach save of `owner` is in flight.
    async fn settle_detach(&self, owner: OwnerId) {
        while let (false, Some(pending)) = self.attach_state(owner) {
            debug!("[records] Waiting for detach save of owner {}", owner);
            pending.wait().await;
        }
    }

    fn ensure_global_field(&self, field: &str) -> Result<(), RecordError> {
        if self.schema.read().is_global(field) {
            Ok(())
        } else {
            Err(RecordError::NotGlobalField(field.to_string()))
        }
    }

    /// Root lock for a global operation on `path`; `None` for owner scopes.
    fn lock_scope(&self, scope: Scope, path: &Path) -> Result<Option<RootLockGuard>, RecordError> {
        match scope {
            Scope::Owner(_) => Ok(None),
            Scope::Global => self.lock_global_root(path.root()).map(Some),
        }
    }

    fn sharded_fields(&self, scope: Scope) -> Vec<Path> {
        self.schema.read().sharded_fields_for(scope).cloned().collect()
    }
}

/// A caller suspended on an owner's readiness. When the last waiter of a
/// signal that never fired goes away, the signal leaves the table.
struct OwnerWaiter<'a> {
    table: &'a Mutex<OwnerSignals>,
    owner: OwnerId,
    signal: Option<Arc<ReadinessSignal<LoadStatus>>>,
}

impl OwnerWaiter<'_> {
    async fn wait(&self) -> LoadStatus {
        match &self.signal {
            Some(signal) => signal.wait().await,
            None => LoadStatus::Failed("waiter released".to_string()),
        }
    }
}

impl Drop for OwnerWaiter<'_> {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        // Release our handle under the table lock so the count below is exact.
        drop(self.signal.take());
        let idle = table
            .get(&self.owner)
            .map_or(false, |signal| !signal.is_fired() && Arc::strong_count(signal) == 1);
        if idle {
            table.remove(&self.owner);
        }
    }
}
