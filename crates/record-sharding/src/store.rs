//! # Record Store
//!
//! In-memory owner records, the global record and the fragment store.
//!
//! Fragments are keyed by `Scope::fragment_key`, so two scopes or two paths
//! never share a key prefix.

use crate::algorithms::path_resolver::resolve;
use crate::domain::{OwnerId, Path, Record, RecordError, Scope, Value};
use std::collections::HashMap;

/// Owner records, the global record and shard fragments.
#[derive(Debug, Default)]
pub struct RecordStore {
    owners: HashMap<OwnerId, Record>,
    global: Record,
    fragments: HashMap<String, Record>,
    /// Fragment count last written to the backend, per sharded path.
    persisted_counts: HashMap<(Scope, Path), usize>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // RECORDS
    // =========================================================================

    /// Record for `scope`.
    pub fn record(&self, scope: Scope) -> Result<&Record, RecordError> {
        match scope {
            Scope::Owner(owner) => self.owners.get(&owner).ok_or_else(|| not_attached(owner)),
            Scope::Global => Ok(&self.global),
        }
    }

    /// Mutable record for `scope`.
    pub fn record_mut(&mut self, scope: Scope) -> Result<&mut Record, RecordError> {
        match scope {
            Scope::Owner(owner) => self
                .owners
                .get_mut(&owner)
                .ok_or_else(|| not_attached(owner)),
            Scope::Global => Ok(&mut self.global),
        }
    }

    /// Resolve `path` in `scope` (markers are returned as-is).
    pub fn resolve(&self, scope: Scope, path: &Path) -> Result<Option<&Value>, RecordError> {
        Ok(resolve(self.record(scope)?, path))
    }

    /// Install an owner record.
    pub fn insert_owner(&mut self, owner: OwnerId, record: Record) {
        self.owners.insert(owner, record);
    }

    /// Remove an owner record.
    pub fn remove_owner(&mut self, owner: OwnerId) -> Option<Record> {
        self.owners.remove(&owner)
    }

    /// Is the owner's record in memory?
    pub fn has_owner(&self, owner: OwnerId) -> bool {
        self.owners.contains_key(&owner)
    }

    /// Attached owner ids, ascending.
    pub fn owner_ids(&self) -> Vec<OwnerId> {
        let mut ids: Vec<_> = self.owners.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All owner records.
    pub fn owners(&self) -> &HashMap<OwnerId, Record> {
        &self.owners
    }

    /// The global record.
    pub fn global(&self) -> &Record {
        &self.global
    }

    /// Set one global root field.
    pub fn set_global_field(&mut self, field: &str, value: Value) {
        self.global.insert(field.to_string(), value);
    }

    /// Remove one global root field.
    pub fn remove_global_field(&mut self, field: &str) -> Option<Value> {
        self.global.remove(field)
    }

    // =========================================================================
    // FRAGMENTS
    // =========================================================================

    /// Fragment by composite key.
    pub fn fragment(&self, key: &str) -> Option<&Record> {
        self.fragments.get(key)
    }

    /// All fragments.
    pub fn fragments(&self) -> &HashMap<String, Record> {
        &self.fragments
    }

    /// Insert a fragment under its composite key.
    pub fn insert_fragment(&mut self, key: String, fragment: Record) {
        self.fragments.insert(key, fragment);
    }

    /// Clone fragments `1..=count` of `path`. Fails on the first gap.
    pub fn collect_fragments(
        &self,
        scope: Scope,
        path: &Path,
        count: usize,
    ) -> Result<Vec<Record>, RecordError> {
        (1..=count)
            .map(|index| {
                let key = scope.fragment_key(path, index);
                self.fragments
                    .get(&key)
                    .cloned()
                    .ok_or(RecordError::ShardFragmentMissing { key })
            })
            .collect()
    }

    /// Store `fragments` as indices `1..=len` of `path`.
    pub fn store_fragments(&mut self, scope: Scope, path: &Path, fragments: Vec<Record>) {
        for (i, fragment) in fragments.into_iter().enumerate() {
            self.fragments.insert(scope.fragment_key(path, i + 1), fragment);
        }
    }

    /// Remove every fragment of `path`. Returns how many were removed.
    ///
    /// Only keys whose remainder after `{scope}:{path}:shard:` is an index
    /// match, so a sibling path such as `bag:shard:x` keeps its fragments.
    pub fn clear_fragments(&mut self, scope: Scope, path: &Path) -> usize {
        let prefix = format!("{}:shard:", scope.fragment_prefix(path));
        let before = self.fragments.len();
        self.fragments.retain(|key, _| {
            key.strip_prefix(&prefix)
                .map_or(true, |index| index.parse::<usize>().is_err())
        });
        before - self.fragments.len()
    }

    /// Take every fragment belonging to `scope` out of the store.
    pub fn take_scope_fragments(&mut self, scope: Scope) -> HashMap<String, Record> {
        let prefix = format!("{scope}:");
        let keys: Vec<String> = self
            .fragments
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect();
        keys.into_iter()
            .filter_map(|key| self.fragments.remove_entry(&key))
            .collect()
    }

    /// Clone every fragment belonging to `scope`.
    pub fn scope_fragments(&self, scope: Scope) -> HashMap<String, Record> {
        let prefix = format!("{scope}:");
        self.fragments
            .iter()
            .filter(|(key, _)| key.starts_with(&prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Put fragments back (used when a persist fails).
    pub fn restore_fragments(&mut self, fragments: HashMap<String, Record>) {
        self.fragments.extend(fragments);
    }

    // =========================================================================
    // PERSISTENCE BOOKKEEPING
    // =========================================================================

    /// Fragment count last persisted for `path` in `scope`.
    pub fn persisted_count(&self, scope: Scope, path: &Path) -> usize {
        self.persisted_counts
            .get(&(scope, path.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Paths of `scope` with fragments on the backend, with their counts.
    pub fn persisted_paths(&self, scope: Scope) -> HashMap<Path, usize> {
        self.persisted_counts
            .iter()
            .filter(|((s, _), _)| *s == scope)
            .map(|((_, path), count)| (path.clone(), *count))
            .collect()
    }

    /// Replace the persisted counts of `scope` paths under `root`
    /// (every path of the scope when `root` is `None`).
    pub fn replace_persisted_counts(
        &mut self,
        scope: Scope,
        root: Option<&str>,
        counts: HashMap<Path, usize>,
    ) {
        self.persisted_counts.retain(|(s, path), _| {
            *s != scope || root.map_or(false, |r| path.root() != r)
        });
        for (path, count) in counts {
            if count > 0 {
                self.persisted_counts.insert((scope, path), count);
            }
        }
    }
}

fn not_attached(owner: OwnerId) -> RecordError {
    RecordError::OwnerNotLoaded {
        owner,
        reason: "owner is not attached".to_string(),
    }
}
