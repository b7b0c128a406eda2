//! # Algorithms Module
//!
//! Synchronous, non-suspending building blocks: path resolution, size
//! estimation, shard packing and operator application.

pub mod operator_engine;
pub mod path_resolver;
pub mod shard_packer;
pub mod size_estimator;

pub use operator_engine::apply as apply_operator;
pub use path_resolver::{assign, resolve, resolve_mut};
pub use shard_packer::{pack, unpack};
pub use size_estimator::{estimate, estimate_entry, estimate_record};
