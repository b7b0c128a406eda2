//! # Record Values
//!
//! Nested record values. A sharded sub-table is an explicit variant, so
//! resolution code matches on it instead of sniffing a special key.

use std::collections::BTreeMap;

/// A nested mapping from key to value.
///
/// `BTreeMap` gives the stable iteration order the packer relies on.
pub type Record = BTreeMap<String, Value>;

/// Placeholder for a sub-table whose entries live in `count` external
/// fragments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShardMarker {
    /// Number of fragments last written for the path.
    pub count: usize,
}

impl ShardMarker {
    /// Create a marker for `count` fragments.
    pub fn new(count: usize) -> Self {
        Self { count }
    }
}

/// A record value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar.
    Number(f64),
    /// String scalar.
    String(String),
    /// Ordered sequence.
    List(Vec<Value>),
    /// Nested mapping.
    Map(Record),
    /// Sharded sub-table.
    Sharded(ShardMarker),
}

impl Value {
    /// Empty mapping.
    pub fn empty_map() -> Self {
        Value::Map(Record::new())
    }

    /// Is this value addressable by path segments?
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Map(_) | Value::List(_))
    }

    /// The shard marker, if this value is one.
    pub fn as_marker(&self) -> Option<ShardMarker> {
        match self {
            Value::Sharded(marker) => Some(*marker),
            _ => None,
        }
    }

    /// The mapping, if this value is one.
    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The number, if this value is one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Sharded(_) => "shard marker",
        }
    }

    /// Is every number below (or at) this value finite?
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Number(n) => n.is_finite(),
            Value::Map(map) => map.values().all(Value::is_finite),
            Value::List(items) => items.iter().all(Value::is_finite),
            _ => true,
        }
    }

    /// Does a shard marker appear anywhere below (or at) this value?
    pub fn contains_marker(&self) -> bool {
        match self {
            Value::Sharded(_) => true,
            Value::Map(map) => map.values().any(Value::contains_marker),
            Value::List(items) => items.iter().any(Value::contains_marker),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value as f64)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

/// Build a [`Record`] from key/value pairs.
pub fn record<K, V, I>(entries: I) -> Record
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
