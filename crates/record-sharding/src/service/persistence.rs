//! Backend load/save of whole records and their fragments.

use super::ShardedRecordService;
use crate::domain::{
    collect_marker_paths, invariant_marker_count, Path, Record, RecordError, Scope, ShardMarker,
    Value,
};
use crate::ports::outbound::{RecordBackend, ValueCodec};
use crate::store::RecordStore;
use std::collections::HashMap;
use tracing::{debug, warn};

/// One record (or global root field) ready to be written.
#[derive(Debug)]
pub(super) struct Snapshot {
    pub scope: Scope,
    pub namespace: String,
    pub key: String,
    /// Payload stored under `key`.
    pub payload: Value,
    /// Markers inside `payload`, by full path.
    pub markers: Vec<(Path, ShardMarker)>,
    /// Fragments the markers point at.
    pub fragments: HashMap<String, Record>,
    /// Counts written by the previous save.
    pub persisted: HashMap<Path, usize>,
}

/// Markers inside global root field `field` holding `value`, by full path.
pub(super) fn markers_under(field: &str, value: &Value) -> Vec<(Path, ShardMarker)> {
    match value {
        Value::Sharded(marker) => vec![(Path::from_segments([field]), *marker)],
        Value::Map(map) => collect_marker_paths(map)
            .into_iter()
            .map(|(path, marker)| {
                let segments = std::iter::once(field.to_string()).chain(path.segments().iter().cloned());
                (Path::from_segments(segments), marker)
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Clone the fragments `markers` point at. Gaps are left for the
/// marker-count invariant to report.
pub(super) fn marker_fragments(
    store: &RecordStore,
    scope: Scope,
    markers: &[(Path, ShardMarker)],
) -> HashMap<String, Record> {
    let mut fragments = HashMap::new();
    for (path, marker) in markers {
        for index in 1..=marker.count {
            let key = scope.fragment_key(path, index);
            if let Some(fragment) = store.fragment(&key) {
                fragments.insert(key, fragment.clone());
            }
        }
    }
    fragments
}

/// Fragment counts by path.
pub(super) fn marker_counts(markers: &[(Path, ShardMarker)]) -> HashMap<Path, usize> {
    markers
        .iter()
        .map(|(path, marker)| (path.clone(), marker.count))
        .collect()
}

impl<B, C> ShardedRecordService<B, C>
where
    B: RecordBackend,
    C: ValueCodec,
{
    /// Get and decode one payload.
    pub(super) async fn fetch(&self, namespace: &str, key: &str) -> Result<Option<Value>, RecordError> {
        match self.backend.get(namespace, key).await? {
            None => Ok(None),
            Some(bytes) => self.codec.decode(&bytes).map(Some),
        }
    }

    /// Fetch every fragment `markers` point at. A missing fragment fails.
    pub(super) async fn fetch_fragments(
        &self,
        scope: Scope,
        markers: &[(Path, ShardMarker)],
    ) -> Result<HashMap<String, Record>, RecordError> {
        let namespace = &self.config.fragment_namespace;
        let mut fragments = HashMap::new();

        for (path, marker) in markers {
            for index in 1..=marker.count {
                let key = scope.fragment_key(path, index);
                match self.fetch(namespace, &key).await? {
                    Some(Value::Map(fragment)) => {
                        fragments.insert(key, fragment);
                    }
                    Some(other) => {
                        return Err(RecordError::Serialization(format!(
                            "fragment {key} is a {}, expected a mapping",
                            other.type_name()
                        )))
                    }
                    None => {
                        warn!("[records] Fragment {} referenced by {}:{} is missing", key, scope, path);
                        return Err(RecordError::ShardFragmentMissing { key });
                    }
                }
            }
        }
        Ok(fragments)
    }

    /// Write a snapshot: fragments first, then the payload, then drop the
    /// fragments a shrinking marker no longer references.
    ///
    /// Returns the fragment counts now on the backend.
    pub(super) async fn write_snapshot(
        &self,
        snapshot: &Snapshot,
    ) -> Result<HashMap<Path, usize>, RecordError> {
        let scope = snapshot.scope;
        for (path, marker) in &snapshot.markers {
            invariant_marker_count(scope, path, *marker, &snapshot.fragments)?;
        }

        let fragment_namespace = &self.config.fragment_namespace;
        for (path, marker) in &snapshot.markers {
            for index in 1..=marker.count {
                let key = scope.fragment_key(path, index);
                let fragment = snapshot
                    .fragments
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| RecordError::ShardFragmentMissing { key: key.clone() })?;
                let bytes = self.codec.encode(&Value::Map(fragment))?;
                self.backend.set(fragment_namespace, &key, bytes).await?;
            }
        }

        let bytes = self.codec.encode(&snapshot.payload)?;
        self.backend
            .set(&snapshot.namespace, &snapshot.key, bytes)
            .await?;

        let counts = marker_counts(&snapshot.markers);
        for (path, &previous) in &snapshot.persisted {
            let current = counts.get(path).copied().unwrap_or(0);
            for index in current + 1..=previous {
                let key = scope.fragment_key(path, index);
                self.backend.remove(fragment_namespace, &key).await?;
                debug!("[records] Removed stale fragment {}", key);
            }
        }

        debug!(
            "[records] Saved {}/{} with {} fragments",
            snapshot.namespace,
            snapshot.key,
            snapshot.fragments.len()
        );
        Ok(counts)
    }
}
