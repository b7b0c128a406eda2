//! Owner attach/detach, explicit saves and shutdown.

use super::persistence::{marker_counts, marker_fragments, markers_under, Snapshot};
use super::ShardedRecordService;
use crate::domain::{
    collect_marker_paths, reconcile, OwnerId, RecordError, Scope, ShutdownReport, Value,
};
use crate::ports::inbound::RecordLifecycle;
use crate::ports::outbound::{RecordBackend, ValueCodec};
use crate::readiness::{LoadStatus, ReadinessSignal};
use crate::store::RecordStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

impl<B, C> ShardedRecordService<B, C>
where
    B: RecordBackend,
    C: ValueCodec,
{
    /// Persist an attached owner without evicting it.
    pub async fn save_owner(&self, owner: OwnerId) -> Result<(), RecordError> {
        let scope = Scope::Owner(owner);
        let snapshot = {
            let mut store = self.store.lock();
            self.recover_scope(&mut store, scope);
            let record = store.record(scope)?.clone();
            let markers = collect_marker_paths(&record);
            Snapshot {
                scope,
                namespace: self.config.record_namespace.clone(),
                key: owner.to_string(),
                fragments: marker_fragments(&store, scope, &markers),
                persisted: store.persisted_paths(scope),
                payload: Value::Map(record),
                markers,
            }
        };

        let counts = self.write_snapshot(&snapshot).await?;
        let mut store = self.store.lock();
        if store.has_owner(owner) {
            store.replace_persisted_counts(scope, None, counts);
        }
        info!("[records] Saved owner {}", owner);
        Ok(())
    }

    /// Persist one declared global root field. The field's root lock is
    /// held for the duration of the save.
    pub async fn save_global_field(&self, field: &str) -> Result<(), RecordError> {
        self.global_ready.wait().await;
        let _guard = self.lock_global_root(field)?;

        let snapshot = {
            let mut store = self.store.lock();
            self.recover_scope(&mut store, Scope::Global);
            let Some(value) = store.global().get(field).cloned() else {
                debug!("[records] Global field {} is absent, nothing to save", field);
                return Ok(());
            };
            let markers = markers_under(field, &value);
            let persisted = store
                .persisted_paths(Scope::Global)
                .into_iter()
                .filter(|(path, _)| path.root() == field)
                .collect();
            Snapshot {
                scope: Scope::Global,
                namespace: self.config.global_namespace.clone(),
                key: field.to_string(),
                fragments: marker_fragments(&store, Scope::Global, &markers),
                persisted,
                payload: value,
                markers,
            }
        };

        let counts = self.write_snapshot(&snapshot).await?;
        self.store
            .lock()
            .replace_persisted_counts(Scope::Global, Some(field), counts);
        info!("[records] Saved global field {}", field);
        Ok(())
    }

    /// Re-shard every declared sharded field of `scope` found merged.
    pub(super) fn recover_scope(&self, store: &mut RecordStore, scope: Scope) {
        let fields = self.sharded_fields(scope);
        for (path, err) in self.coordinator.recover(store, scope, &fields) {
            warn!("[records] Could not shard declared field {}:{}: {}", scope, path, err);
        }
    }

    /// Load, reconcile and hydrate `owner`, then install it in the store.
    async fn load_owner(&self, owner: OwnerId) -> Result<(), RecordError> {
        let scope = Scope::Owner(owner);
        let template = self.schema.read().owner_template();
        let key = owner.to_string();

        let record = match self.fetch(&self.config.record_namespace, &key).await? {
            None => {
                debug!("[records] No stored record for owner {}, using template", owner);
                template
            }
            Some(Value::Map(loaded)) => reconcile(loaded, &template),
            Some(other) => {
                return Err(RecordError::Serialization(format!(
                    "record {key} is a {}, expected a mapping",
                    other.type_name()
                )))
            }
        };

        let markers = collect_marker_paths(&record);
        let fragments = self.fetch_fragments(scope, &markers).await?;

        let mut store = self.store.lock();
        store.insert_owner(owner, record);
        store.restore_fragments(fragments);
        store.replace_persisted_counts(scope, None, marker_counts(&markers));
        self.recover_scope(&mut store, scope);
        Ok(())
    }
}

#[async_trait]
impl<B, C> RecordLifecycle for ShardedRecordService<B, C>
where
    B: RecordBackend,
    C: ValueCodec,
{
    async fn owner_attached(&self, owner: OwnerId) -> Result<(), RecordError> {
        self.global_ready.wait().await;
        self.settle_detach(owner).await;
        if self.is_attached(owner) {
            debug!("[records] Owner {} already attached", owner);
            return Ok(());
        }

        let signal = self.loading_signal(owner);
        match self.load_owner(owner).await {
            Ok(()) => {
                signal.fire(LoadStatus::Loaded);
                info!("[records] Owner {} attached", owner);
                Ok(())
            }
            Err(err) => {
                error!("[records] Load of owner {} failed: {}", owner, err);
                signal.fire(LoadStatus::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn owner_detached(&self, owner: OwnerId) -> Result<(), RecordError> {
        let scope = Scope::Owner(owner);

        let save = Arc::new(ReadinessSignal::new());
        let taken = {
            let mut store = self.store.lock();
            if store.has_owner(owner) {
                self.recover_scope(&mut store, scope);
                let persisted = store.persisted_paths(scope);
                store.replace_persisted_counts(scope, None, HashMap::new());
                self.detaching.lock().insert(owner, Arc::clone(&save));
                store
                    .remove_owner(owner)
                    .map(|record| (record, store.take_scope_fragments(scope), persisted))
            } else {
                None
            }
        };
        let Some((record, fragments, persisted)) = taken else {
            debug!("[records] Owner {} is not attached", owner);
            return Ok(());
        };
        self.owner_ready.lock().remove(&owner);

        let markers = collect_marker_paths(&record);
        let snapshot = Snapshot {
            scope,
            namespace: self.config.record_namespace.clone(),
            key: owner.to_string(),
            payload: Value::Map(record),
            markers,
            fragments,
            persisted,
        };

        let written = self.write_snapshot(&snapshot).await;
        if written.is_err() {
            let Snapshot {
                payload,
                fragments,
                persisted,
                ..
            } = snapshot;
            {
                let mut store = self.store.lock();
                if let Value::Map(record) = payload {
                    store.insert_owner(owner, record);
                }
                store.restore_fragments(fragments);
                store.replace_persisted_counts(scope, None, persisted);
            }
            self.owner_signal(owner).fire(LoadStatus::Loaded);
        }
        self.detaching.lock().remove(&owner);
        save.fire(());

        match written {
            Ok(_) => {
                info!("[records] Owner {} saved and evicted", owner);
                Ok(())
            }
            Err(err) => {
                error!("[records] Save of owner {} failed, keeping it in memory: {}", owner, err);
                Err(err)
            }
        }
    }

    async fn shutdown(&self) -> ShutdownReport {
        let mut report = ShutdownReport::default();

        for owner in self.attached_owners() {
            match self.owner_detached(owner).await {
                Ok(()) => report.saved_owners.push(owner),
                Err(err) => report.failures.push((owner.to_string(), err)),
            }
        }

        if self.is_initialized() {
            let fields: Vec<String> = self.schema.read().global_fields.iter().cloned().collect();
            for field in fields {
                match self.save_global_field(&field).await {
                    Ok(()) => report.saved_global_fields.push(field),
                    Err(err) => report.failures.push((format!("global:{field}"), err)),
                }
            }
        }

        if report.is_clean() {
            info!(
                "[records] Shutdown saved {} owners and {} global fields",
                report.saved_owners.len(),
                report.saved_global_fields.len()
            );
        } else {
            error!("[records] Shutdown left {} unsaved entries", report.failures.len());
        }
        report
    }
}
