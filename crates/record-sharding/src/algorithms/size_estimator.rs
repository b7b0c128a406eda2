//! # Size Estimator
//!
//! Approximate serialized size of a value, used only for packing
//! decisions. Encoding overhead (quotes, braces, separators) is ignored.

use crate::domain::{Record, Value};

/// Fixed cost of a number.
pub const NUMBER_COST: usize = 8;

/// Fixed cost of a boolean.
pub const BOOL_COST: usize = 1;

/// Estimated byte size of `value`.
pub fn estimate(value: &Value) -> usize {
    match value {
        Value::String(s) => s.len(),
        Value::Number(_) => NUMBER_COST,
        Value::Bool(_) => BOOL_COST,
        Value::Map(map) => estimate_record(map),
        // Sequence keys are integers.
        Value::List(items) => items.iter().map(|item| NUMBER_COST + estimate(item)).sum(),
        Value::Sharded(_) => 0,
    }
}

/// Estimated byte size of one `key = value` entry.
pub fn estimate_entry(key: &str, value: &Value) -> usize {
    key.len() + estimate(value)
}

/// Estimated byte size of a whole record.
pub fn estimate_record(record: &Record) -> usize {
    record.iter().map(|(k, v)| estimate_entry(k, v)).sum()
}
