//! # Shard Packer
//!
//! Split a flat table into byte-bounded fragments and merge them back.
//!
//! ## Algorithm
//!
//! Entries are visited in key order. An entry that would push the running
//! fragment past the budget closes that fragment first, unless the fragment
//! is still empty. A single oversized entry is never split, so a fragment
//! holding exactly one entry may exceed the budget.

use super::size_estimator::estimate_entry;
use crate::domain::Record;

/// Pack `table` into fragments of at most `byte_limit` estimated bytes.
///
/// An empty table yields no fragments.
pub fn pack(table: &Record, byte_limit: usize) -> Vec<Record> {
    let mut fragments = Vec::new();
    let mut current = Record::new();
    let mut current_size = 0usize;

    for (key, value) in table {
        let entry_size = estimate_entry(key, value);
        if !current.is_empty() && current_size + entry_size > byte_limit {
            fragments.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current.insert(key.clone(), value.clone());
        current_size += entry_size;
    }

    if !current.is_empty() {
        fragments.push(current);
    }
    fragments
}

/// Merge fragments into one table. Later fragments win on key collisions.
pub fn unpack<I>(fragments: I) -> Record
where
    I: IntoIterator<Item = Record>,
{
    let mut table = Record::new();
    for fragment in fragments {
        table.extend(fragment);
    }
    table
}
