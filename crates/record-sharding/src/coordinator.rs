//! # Sharding Coordinator
//!
//! Shard/unshard transitions and the unshard → mutate → reshard protocol.
//!
//! ## State Machine (per scope and path)
//!
//! ```text
//!              enable (pack, write marker)
//! Unsharded ─────────────────────────────→ Sharded
//!     ↑                                       │
//!     └───────────────────────────────────────┘
//!        disable (merge all fragments; abort on any gap)
//! ```
//!
//! Everything here is synchronous. The service holds the store lock for the
//! whole of `apply`, so no other operation can observe the transient
//! unsharded state.

use crate::algorithms::{operator_engine, path_resolver, shard_packer};
use crate::domain::{
    invariant_no_nested_markers, OperationOutcome, OperatorKind, Path, Record, RecordError, Scope,
    ShardMarker, Value,
};
use crate::store::RecordStore;
use tracing::{debug, info, warn};

/// Drives sharding transitions against a [`RecordStore`].
#[derive(Clone, Debug)]
pub struct ShardingCoordinator {
    byte_limit: usize,
}

impl ShardingCoordinator {
    /// Create a coordinator packing fragments to `byte_limit` estimated bytes.
    pub fn new(byte_limit: usize) -> Self {
        Self { byte_limit }
    }

    /// Packing budget.
    pub fn byte_limit(&self) -> usize {
        self.byte_limit
    }

    /// First prefix of `path`, root to leaf, that resolves to a marker.
    ///
    /// At most one exists because fragments never contain markers.
    pub fn find_sharded_ancestor(record: &Record, path: &Path) -> Option<(Path, ShardMarker)> {
        for prefix in path.prefixes() {
            match path_resolver::resolve(record, &prefix) {
                Some(Value::Sharded(marker)) => return Some((prefix, *marker)),
                Some(value) if value.is_container() => continue,
                _ => return None,
            }
        }
        None
    }

    /// Unsharded → Sharded. Safe to re-run: existing fragments are replaced.
    pub fn enable(
        &self,
        store: &mut RecordStore,
        scope: Scope,
        path: &Path,
    ) -> Result<ShardMarker, RecordError> {
        let record = store.record(scope)?;
        if let Some((ancestor, _)) = Self::find_sharded_ancestor(record, path) {
            if ancestor.len() < path.len() {
                return Err(RecordError::InvalidPathTarget(format!(
                    "{path} lies inside sharded {ancestor}"
                )));
            }
        }

        let table = match path_resolver::resolve(record, path) {
            None => return Err(RecordError::PathNotFound(path.to_string())),
            Some(Value::Sharded(marker)) => {
                shard_packer::unpack(store.collect_fragments(scope, path, marker.count)?)
            }
            Some(Value::Map(table)) => table.clone(),
            Some(other) => {
                return Err(RecordError::InvalidPathTarget(format!(
                    "{path} is a {}, only mappings can be sharded",
                    other.type_name()
                )))
            }
        };

        let fragments = shard_packer::pack(&table, self.byte_limit);
        invariant_no_nested_markers(&fragments)?;

        let marker = ShardMarker::new(fragments.len());
        let cleared = store.clear_fragments(scope, path);
        store.store_fragments(scope, path, fragments);
        path_resolver::assign(store.record_mut(scope)?, path, Value::Sharded(marker))?;

        debug!(
            "[records] Sharded {}:{} into {} fragments (replaced {})",
            scope, path, marker.count, cleared
        );
        Ok(marker)
    }

    /// Sharded → Unsharded. A no-op when `path` is not sharded; aborts with
    /// the marker intact when a fragment is missing.
    pub fn disable(
        &self,
        store: &mut RecordStore,
        scope: Scope,
        path: &Path,
    ) -> Result<(), RecordError> {
        let marker = match store.resolve(scope, path)? {
            None => return Err(RecordError::PathNotFound(path.to_string())),
            Some(Value::Sharded(marker)) => *marker,
            Some(_) => {
                debug!("[records] {}:{} is not sharded", scope, path);
                return Ok(());
            }
        };

        let merged = shard_packer::unpack(store.collect_fragments(scope, path, marker.count)?);
        path_resolver::assign(store.record_mut(scope)?, path, Value::Map(merged))?;
        store.clear_fragments(scope, path);

        debug!("[records] Unsharded {}:{} from {} fragments", scope, path, marker.count);
        Ok(())
    }

    /// Read `path`, merging fragments of a sharded ancestor when needed.
    ///
    /// Missing values read as `None`; an intermediate scalar is an error.
    pub fn read(
        &self,
        store: &RecordStore,
        scope: Scope,
        path: &Path,
    ) -> Result<Option<Value>, RecordError> {
        let record = store.record(scope)?;

        if let Some((ancestor, marker)) = Self::find_sharded_ancestor(record, path) {
            let merged = shard_packer::unpack(store.collect_fragments(scope, &ancestor, marker.count)?);
            if ancestor.len() == path.len() {
                return Ok(Some(Value::Map(merged)));
            }
            let rest = path.suffix(ancestor.len());
            check_intermediates(&merged, &rest, path)?;
            return Ok(path_resolver::resolve(&merged, &rest).cloned());
        }

        check_intermediates(record, path, path)?;
        Ok(path_resolver::resolve(record, path).cloned())
    }

    /// Apply `operator` at `path`: unshard the sharded ancestor, mutate,
    /// reshard.
    ///
    /// If resolution or the operator fails, the ancestor is re-sharded from
    /// its untouched merged value, so the record ends as it started. A
    /// failing reshard after a successful mutation is reported in the
    /// outcome; the mutation stays.
    pub fn apply(
        &self,
        store: &mut RecordStore,
        scope: Scope,
        path: &Path,
        operator: OperatorKind,
        operand: &Value,
    ) -> Result<OperationOutcome, RecordError> {
        let ancestor = Self::find_sharded_ancestor(store.record(scope)?, path).map(|(p, _)| p);
        if let Some(ancestor) = &ancestor {
            self.disable(store, scope, ancestor)?;
        }

        let mutated = mutate(store.record_mut(scope)?, path, operator, operand);

        let Some(ancestor) = ancestor else {
            return mutated.map(|value| OperationOutcome {
                value,
                resharded: false,
                reshard_error: None,
            });
        };

        match mutated {
            Err(err) => {
                if let Err(restore_err) = self.enable(store, scope, &ancestor) {
                    warn!(
                        "[records] Could not restore sharding of {}:{}: {}",
                        scope, ancestor, restore_err
                    );
                }
                Err(err)
            }
            Ok(value) => {
                let reshard_error = match self.enable(store, scope, &ancestor) {
                    Ok(_) => None,
                    Err(err) => {
                        warn!(
                            "[records] Reshard of {}:{} failed after {}: {}",
                            scope, ancestor, operator, err
                        );
                        Some(err)
                    }
                };
                Ok(OperationOutcome {
                    value,
                    resharded: reshard_error.is_none(),
                    reshard_error,
                })
            }
        }
    }

    /// Put every declared sharded field of `scope` back into sharded form.
    ///
    /// Run before persisting, so an operation interrupted between unshard
    /// and reshard never reaches the backend in merged form. Returns the
    /// fields that could not be re-sharded.
    pub fn recover<'a, I>(
        &self,
        store: &mut RecordStore,
        scope: Scope,
        sharded_fields: I,
    ) -> Vec<(Path, RecordError)>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut failures = Vec::new();
        for path in sharded_fields {
            let needs_enable = match store.resolve(scope, path) {
                Ok(Some(Value::Sharded(_))) | Ok(None) => false,
                Ok(Some(_)) => true,
                Err(err) => {
                    failures.push((path.clone(), err));
                    continue;
                }
            };
            if !needs_enable {
                continue;
            }
            match self.enable(store, scope, path) {
                Ok(marker) => info!(
                    "[records] Recovered unsharded field {}:{} ({} fragments)",
                    scope, path, marker.count
                ),
                Err(err) => failures.push((path.clone(), err)),
            }
        }
        failures
    }
}

/// Resolve, transform and write back. Nothing is written unless the
/// operator succeeds.
fn mutate(
    record: &mut Record,
    path: &Path,
    operator: OperatorKind,
    operand: &Value,
) -> Result<Value, RecordError> {
    check_intermediates(record, path, path)?;
    let current = path_resolver::resolve(record, path)
        .cloned()
        .ok_or_else(|| RecordError::ValueNotFound(path.to_string()))?;
    let value = operator_engine::apply(operator, current, operand)?;
    path_resolver::assign(record, path, value.clone())?;
    Ok(value)
}

/// Fail if a strict prefix of `rel` resolves to a non-container.
fn check_intermediates(record: &Record, rel: &Path, full: &Path) -> Result<(), RecordError> {
    for len in 1..rel.len() {
        match path_resolver::resolve(record, &rel.prefix(len)) {
            Some(value) if !value.is_container() => {
                return Err(RecordError::InvalidPathTarget(full.to_string()))
            }
            Some(_) => {}
            None => break,
        }
    }
    Ok(())
}
