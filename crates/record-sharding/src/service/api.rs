//! `ShardedRecordsApi` implementation.

use super::persistence::{marker_counts, markers_under};
use super::ShardedRecordService;
use crate::domain::{
    collect_marker_paths, reconcile, Operation, OperationOutcome, OperatorKind, OwnerId, Path,
    Record, RecordError, Schema, Scope, Value,
};
use crate::ports::inbound::ShardedRecordsApi;
use crate::ports::outbound::{RecordBackend, ValueCodec};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

#[async_trait]
impl<B, C> ShardedRecordsApi for ShardedRecordService<B, C>
where
    B: RecordBackend,
    C: ValueCodec,
{
    async fn initialize(&self, schema: Schema) -> Result<(), RecordError> {
        if self.is_initialized() {
            return Err(RecordError::ConfigError(
                "engine is already initialized".to_string(),
            ));
        }

        let template = schema.template.clone();
        let fields: Vec<String> = schema.global_fields.iter().cloned().collect();
        let sharded_count = schema.sharded_fields.len();
        *self.schema.write() = schema;

        let mut loaded = Vec::with_capacity(fields.len());
        for field in &fields {
            let stored = self.fetch(&self.config.global_namespace, field).await?;
            let value = match (stored, template.get(field)) {
                (Some(Value::Map(map)), Some(Value::Map(defaults))) => {
                    Some(Value::Map(reconcile(map, defaults)))
                }
                (Some(value), _) => Some(value),
                (None, Some(default)) => Some(default.clone()),
                (None, None) => None,
            };
            let Some(value) = value else {
                debug!("[records] Global field {} has no stored value or default", field);
                continue;
            };
            let markers = markers_under(field, &value);
            let fragments = self.fetch_fragments(Scope::Global, &markers).await?;
            loaded.push((field, value, markers, fragments));
        }

        {
            let mut store = self.store.lock();
            for (field, value, markers, fragments) in loaded {
                store.set_global_field(field, value);
                store.restore_fragments(fragments);
                store.replace_persisted_counts(
                    Scope::Global,
                    Some(field.as_str()),
                    marker_counts(&markers),
                );
            }
            self.recover_scope(&mut store, Scope::Global);
        }

        self.global_ready.fire(());
        info!(
            "[records] Initialized with {} global fields and {} sharded fields",
            fields.len(),
            sharded_count
        );
        Ok(())
    }

    async fn read(&self, owner: Option<OwnerId>, path: &str) -> Result<Option<Value>, RecordError> {
        let path = Path::parse(path)?;
        let scope = Scope::from_owner(owner);
        self.wait_ready(scope).await?;
        if scope == Scope::Global {
            self.ensure_global_field(path.root())?;
        }

        let store = self.store.lock();
        self.coordinator.read(&store, scope, &path)
    }

    async fn apply_operator(
        &self,
        owner: Option<OwnerId>,
        operation: Operation,
    ) -> Result<OperationOutcome, RecordError> {
        let path = Path::parse(&operation.path)?;
        let operator: OperatorKind = operation.operator.parse()?;
        let scope = Scope::from_owner(owner);
        self.wait_ready(scope).await?;

        let _guard = self.lock_scope(scope, &path)?;
        let outcome = {
            let mut store = self.store.lock();
            self.coordinator
                .apply(&mut store, scope, &path, operator, &operation.operand)?
        };

        debug!("[records] Applied {} at {}:{}", operator, scope, path);
        Ok(outcome)
    }

    async fn set_sharding(
        &self,
        owner: Option<OwnerId>,
        path: &str,
        enabled: bool,
    ) -> Result<(), RecordError> {
        let path = Path::parse(path)?;
        let scope = Scope::from_owner(owner);
        self.wait_ready(scope).await?;

        let _guard = self.lock_scope(scope, &path)?;
        let mut store = self.store.lock();
        if enabled {
            let marker = self.coordinator.enable(&mut store, scope, &path)?;
            info!("[records] Enabled sharding of {}:{} ({} fragments)", scope, path, marker.count);
        } else {
            self.coordinator.disable(&mut store, scope, &path)?;
            info!("[records] Disabled sharding of {}:{}", scope, path);
        }
        Ok(())
    }

    async fn delete_owner_record(&self, owner: OwnerId) -> Result<(), RecordError> {
        let scope = Scope::Owner(owner);
        let key = owner.to_string();
        self.settle_detach(owner).await;

        let in_memory = {
            let store = self.store.lock();
            store.has_owner(owner).then(|| {
                let mut keys: BTreeSet<String> = store.scope_fragments(scope).into_keys().collect();
                for (path, count) in store.persisted_paths(scope) {
                    keys.extend((1..=count).map(|index| scope.fragment_key(&path, index)));
                }
                keys
            })
        };
        let fragment_keys = match in_memory {
            Some(keys) => keys,
            None => match self.fetch(&self.config.record_namespace, &key).await? {
                Some(Value::Map(stored)) => collect_marker_paths(&stored)
                    .into_iter()
                    .flat_map(|(path, marker)| {
                        (1..=marker.count).map(move |index| scope.fragment_key(&path, index))
                    })
                    .collect(),
                _ => BTreeSet::new(),
            },
        };

        self.backend.remove(&self.config.record_namespace, &key).await?;
        for fragment_key in &fragment_keys {
            self.backend
                .remove(&self.config.fragment_namespace, fragment_key)
                .await?;
        }

        {
            let mut store = self.store.lock();
            store.remove_owner(owner);
            store.take_scope_fragments(scope);
            store.replace_persisted_counts(scope, None, HashMap::new());
        }
        {
            let mut ready = self.owner_ready.lock();
            if ready.get(&owner).map_or(false, |signal| signal.is_fired()) {
                ready.remove(&owner);
            }
        }

        info!(
            "[records] Deleted owner {} ({} fragments)",
            owner,
            fragment_keys.len()
        );
        Ok(())
    }

    async fn delete_global_field(&self, path: &str) -> Result<(), RecordError> {
        let path = Path::parse(path)?;
        if path.len() > 1 {
            return Err(RecordError::InvalidPath {
                path: path.to_string(),
                reason: "expected a global root field".to_string(),
            });
        }
        self.global_ready.wait().await;
        let field = path.root();
        let _guard = self.lock_global_root(field)?;

        let (marker_paths, fragment_keys) = {
            let store = self.store.lock();
            let markers = store
                .global()
                .get(field)
                .map(|value| markers_under(field, value))
                .unwrap_or_default();
            let mut keys = BTreeSet::new();
            for (path, marker) in &markers {
                keys.extend((1..=marker.count).map(|index| Scope::Global.fragment_key(path, index)));
            }
            for (path, count) in store.persisted_paths(Scope::Global) {
                if path.root() == field {
                    keys.extend((1..=count).map(|index| Scope::Global.fragment_key(&path, index)));
                }
            }
            let paths: Vec<Path> = markers.into_iter().map(|(path, _)| path).collect();
            (paths, keys)
        };

        self.backend.remove(&self.config.global_namespace, field).await?;
        for key in &fragment_keys {
            self.backend.remove(&self.config.fragment_namespace, key).await?;
        }

        {
            let mut store = self.store.lock();
            store.remove_global_field(field);
            for path in &marker_paths {
                store.clear_fragments(Scope::Global, path);
            }
            store.replace_persisted_counts(Scope::Global, Some(field), HashMap::new());
        }

        info!("[records] Deleted global field {}", field);
        Ok(())
    }

    fn raw_owner_records(&self, owner: Option<OwnerId>) -> HashMap<OwnerId, Record> {
        let store = self.store.lock();
        match owner {
            Some(owner) => store
                .owners()
                .get(&owner)
                .map(|record| HashMap::from([(owner, record.clone())]))
                .unwrap_or_default(),
            None => store.owners().clone(),
        }
    }

    fn raw_fragment_store(&self, key: Option<&str>) -> HashMap<String, Record> {
        let store = self.store.lock();
        match key {
            Some(key) => store
                .fragment(key)
                .map(|fragment| HashMap::from([(key.to_string(), fragment.clone())]))
                .unwrap_or_default(),
            None => store.fragments().clone(),
        }
    }

    fn raw_global_record(&self, path: Option<&str>) -> Result<Option<Value>, RecordError> {
        let store = self.store.lock();
        match path {
            None => Ok(Some(Value::Map(store.global().clone()))),
            Some(path) => {
                let path = Path::parse(path)?;
                Ok(store.resolve(Scope::Global, &path)?.cloned())
            }
        }
    }
}
