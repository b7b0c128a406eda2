//! # Domain Module
//!
//! Core domain types for the record sharding engine.

pub mod config;
pub mod entities;
pub mod errors;
pub mod invariants;
pub mod path;
pub mod reconcile;
pub mod value;

pub use config::*;
pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use path::*;
pub use reconcile::*;
pub use value::*;
