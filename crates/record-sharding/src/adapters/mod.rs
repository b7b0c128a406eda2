//! # Adapters Layer (Hexagonal Architecture)
//!
//! Implements outbound port traits: an in-memory backend and a JSON codec.

mod json_codec;
mod memory_backend;

pub use json_codec::{from_json, to_json, JsonCodec, MARKER_COUNT, MARKER_TAG};
pub use memory_backend::InMemoryBackend;
