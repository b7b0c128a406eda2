//! # Domain Invariants
//!
//! Rules that must hold between records and the fragment store.

use super::entities::Scope;
use super::errors::RecordError;
use super::path::Path;
use super::value::{Record, ShardMarker, Value};
use std::collections::HashMap;

/// Invariant: fragments never contain shard markers.
///
/// Shards are split from leaf tables, not recursively.
pub fn invariant_no_nested_markers(fragments: &[Record]) -> Result<(), RecordError> {
    for fragment in fragments {
        if fragment.values().any(Value::contains_marker) {
            return Err(RecordError::InvalidPathTarget(
                "shard fragment contains a shard marker".to_string(),
            ));
        }
    }
    Ok(())
}

/// Invariant: a marker with `count = N` has fragments `1..=N` present.
pub fn invariant_marker_count(
    scope: Scope,
    path: &Path,
    marker: ShardMarker,
    fragments: &HashMap<String, Record>,
) -> Result<(), RecordError> {
    for index in 1..=marker.count {
        let key = scope.fragment_key(path, index);
        if !fragments.contains_key(&key) {
            return Err(RecordError::ShardFragmentMissing { key });
        }
    }
    Ok(())
}

/// Collect the path of every marker in `record`, root to leaf.
pub fn collect_marker_paths(record: &Record) -> Vec<(Path, ShardMarker)> {
    let mut out = Vec::new();
    let mut stack: Vec<(Vec<String>, &Record)> = vec![(Vec::new(), record)];

    while let Some((prefix, map)) = stack.pop() {
        for (key, value) in map {
            let mut segments = prefix.clone();
            segments.push(key.clone());
            match value {
                Value::Sharded(marker) => out.push((Path::from_segments(segments), *marker)),
                Value::Map(inner) => stack.push((segments, inner)),
                _ => {}
            }
        }
    }

    out.sort_by(|a, b| a.0.segments().cmp(b.0.segments()));
    out
}
