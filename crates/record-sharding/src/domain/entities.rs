//! # Domain Entities
//!
//! Scopes, operations and the schema the engine is initialized with.

use super::errors::{OwnerId, RecordError};
use super::path::Path;
use super::value::{Record, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Which record namespace an operation addresses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// A per-owner record.
    Owner(OwnerId),
    /// The shared global record.
    Global,
}

impl Scope {
    /// Owner scope when an id is given, global scope otherwise.
    pub fn from_owner(owner: Option<OwnerId>) -> Self {
        owner.map_or(Scope::Global, Scope::Owner)
    }

    /// Composite key for fragment `index` of `path` in this scope.
    ///
    /// Owner: `{ownerId}:{path}:shard:{index}`, global: `global:{path}:shard:{index}`.
    pub fn fragment_key(&self, path: &Path, index: usize) -> String {
        format!("{}:shard:{}", self.fragment_prefix(path), index)
    }

    /// Key prefix shared by all fragments of `path` in this scope.
    pub fn fragment_prefix(&self, path: &Path) -> String {
        format!("{self}:{path}")
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Owner(owner) => write!(f, "{owner}"),
            Scope::Global => f.write_str("global"),
        }
    }
}

/// Atomic transforms the operator engine understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorKind {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `SET`
    Set,
    /// `INSERT`
    Insert,
    /// `PUSH`
    Push,
    /// `DELETE`
    Delete,
}

impl OperatorKind {
    /// Wire name of the operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Set => "SET",
            Self::Insert => "INSERT",
            Self::Push => "PUSH",
            Self::Delete => "DELETE",
        }
    }
}

impl FromStr for OperatorKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(Self::Add),
            "-" => Ok(Self::Subtract),
            "*" => Ok(Self::Multiply),
            "/" => Ok(Self::Divide),
            "SET" => Ok(Self::Set),
            "INSERT" => Ok(Self::Insert),
            "PUSH" => Ok(Self::Push),
            "DELETE" => Ok(Self::Delete),
            other => Err(RecordError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single atomic request. Transient, never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// Target path string.
    pub path: String,
    /// Operator name (`+ - * / SET INSERT PUSH DELETE`).
    pub operator: String,
    /// Operand handed to the operator.
    pub operand: Value,
}

impl Operation {
    /// Create an operation.
    pub fn new(path: impl Into<String>, operator: impl Into<String>, operand: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            operator: operator.into(),
            operand: operand.into(),
        }
    }
}

/// Result of an applied operation.
#[derive(Clone, Debug, PartialEq)]
pub struct OperationOutcome {
    /// Value written at the target path.
    pub value: Value,
    /// Whether a sharded ancestor was re-sharded afterwards.
    pub resharded: bool,
    /// Reshard failure; the mutation itself stays applied.
    pub reshard_error: Option<RecordError>,
}

/// What a shutdown managed to persist.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShutdownReport {
    /// Owners saved and evicted.
    pub saved_owners: Vec<OwnerId>,
    /// Global root fields saved.
    pub saved_global_fields: Vec<String>,
    /// Owners or fields that could not be saved, by scope label.
    pub failures: Vec<(String, RecordError)>,
}

impl ShutdownReport {
    /// Did everything persist?
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Layout the engine is initialized with.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    /// Reference record new owners are cloned from and loads reconcile against.
    pub template: Record,
    /// Paths kept in sharded form.
    pub sharded_fields: Vec<Path>,
    /// Root fields living in the global namespace.
    pub global_fields: BTreeSet<String>,
}

impl Schema {
    /// Create a schema from a template record.
    pub fn new(template: Record) -> Self {
        Self {
            template,
            ..Default::default()
        }
    }

    /// Declare sharded paths.
    pub fn with_sharded_fields<I, S>(mut self, paths: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            self.sharded_fields.push(Path::parse(path.as_ref())?);
        }
        Ok(self)
    }

    /// Declare global root fields.
    pub fn with_global_fields<I, S>(mut self, fields: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for field in fields {
            let path = Path::parse(field.as_ref())?;
            self.global_fields.insert(path.root().to_string());
        }
        Ok(self)
    }

    /// Is `field` a declared global root field?
    pub fn is_global(&self, field: &str) -> bool {
        self.global_fields.contains(field)
    }

    /// Template for owner records: the template without global root fields.
    pub fn owner_template(&self) -> Record {
        self.template
            .iter()
            .filter(|(key, _)| !self.is_global(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Declared sharded paths that live in `scope`.
    pub fn sharded_fields_for(&self, scope: Scope) -> impl Iterator<Item = &Path> + '_ {
        self.sharded_fields.iter().filter(move |path| match scope {
            Scope::Global => self.is_global(path.root()),
            Scope::Owner(_) => !self.is_global(path.root()),
        })
    }
}
