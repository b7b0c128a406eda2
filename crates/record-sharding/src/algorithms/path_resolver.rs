//! # Path Resolver
//!
//! Evaluate tokenized paths against nested records.
//!
//! A segment addressing a sequence indexes it 1-based. `assign` never
//! creates intermediate containers.

use crate::domain::{Path, Record, RecordError, Value};

/// Resolve `path` against `root`.
///
/// Returns `None` if any segment is missing or an intermediate value is
/// not a container (a shard marker is not a container).
pub fn resolve<'a>(root: &'a Record, path: &Path) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = root.get(first)?;
    for segment in rest {
        current = child(current, segment)?;
    }
    Some(current)
}

/// Mutable variant of [`resolve`].
pub fn resolve_mut<'a>(root: &'a mut Record, path: &Path) -> Option<&'a mut Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = root.get_mut(first)?;
    for segment in rest {
        current = child_mut(current, segment)?;
    }
    Some(current)
}

/// Write `value` at `path`. The parent container must already exist.
pub fn assign(root: &mut Record, path: &Path, value: Value) -> Result<(), RecordError> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(RecordError::PathNotFound(String::new()));
    };

    if parents.is_empty() {
        root.insert(last.clone(), value);
        return Ok(());
    }

    let parent_path = path.prefix(parents.len());
    let parent = resolve_mut(root, &parent_path)
        .ok_or_else(|| RecordError::PathNotFound(parent_path.to_string()))?;

    match parent {
        Value::Map(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::List(items) => {
            let index = sequence_index(last)
                .filter(|i| *i <= items.len() + 1)
                .ok_or_else(|| RecordError::PathNotFound(path.to_string()))?;
            if index == items.len() + 1 {
                items.push(value);
            } else {
                items[index - 1] = value;
            }
            Ok(())
        }
        _ => Err(RecordError::InvalidPathTarget(parent_path.to_string())),
    }
}

fn child<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    match value {
        Value::Map(map) => map.get(segment),
        Value::List(items) => items.get(sequence_index(segment)?.checked_sub(1)?),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Map(map) => map.get_mut(segment),
        Value::List(items) => items.get_mut(sequence_index(segment)?.checked_sub(1)?),
        _ => None,
    }
}

fn sequence_index(segment: &str) -> Option<usize> {
    segment.parse::<usize>().ok().filter(|i| *i >= 1)
}
