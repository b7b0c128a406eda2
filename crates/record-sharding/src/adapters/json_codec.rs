//! JSON Codec Adapter
//!
//! Implements `ValueCodec` with `serde_json`. A shard marker is written as
//! `{"__sharded": true, "count": N}` and read back as the tagged variant.

use crate::domain::{Record, RecordError, ShardMarker, Value};
use crate::ports::outbound::ValueCodec;
use serde_json::{Map, Number, Value as Json};

/// Key tagging a serialized shard marker.
pub const MARKER_TAG: &str = "__sharded";

/// Key holding a serialized marker's fragment count.
pub const MARKER_COUNT: &str = "count";

/// JSON payload codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a codec.
    pub fn new() -> Self {
        Self
    }
}

impl ValueCodec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, RecordError> {
        let json = to_json(value)?;
        serde_json::to_vec(&json).map_err(|e| RecordError::Serialization(e.to_string()))
    }

    fn decode(&self, payload: &[u8]) -> Result<Value, RecordError> {
        let json: Json =
            serde_json::from_slice(payload).map_err(|e| RecordError::Serialization(e.to_string()))?;
        from_json(json).ok_or_else(|| RecordError::Serialization("null payload".to_string()))
    }
}

/// Convert a value to JSON.
pub fn to_json(value: &Value) -> Result<Json, RecordError> {
    Ok(match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) => Number::from_f64(*n)
            .map(Json::Number)
            .ok_or_else(|| RecordError::Serialization(format!("non-finite number {n}")))?,
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) => Json::Array(items.iter().map(to_json).collect::<Result<_, _>>()?),
        Value::Map(map) => record_to_json(map)?,
        Value::Sharded(marker) => {
            let mut obj = Map::new();
            obj.insert(MARKER_TAG.to_string(), Json::Bool(true));
            obj.insert(MARKER_COUNT.to_string(), Json::from(marker.count));
            Json::Object(obj)
        }
    })
}

/// Convert JSON to a value. `null` has no value representation.
pub fn from_json(json: Json) -> Option<Value> {
    match json {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Bool(b)),
        Json::Number(n) => n.as_f64().map(Value::Number),
        Json::String(s) => Some(Value::String(s)),
        Json::Array(items) => Some(Value::List(items.into_iter().filter_map(from_json).collect())),
        Json::Object(map) => Some(match marker_from_json(&map) {
            Some(marker) => Value::Sharded(marker),
            None => Value::Map(record_from_json(map)),
        }),
    }
}

fn record_to_json(record: &Record) -> Result<Json, RecordError> {
    let mut obj = Map::new();
    for (key, value) in record {
        obj.insert(key.clone(), to_json(value)?);
    }
    Ok(Json::Object(obj))
}

fn record_from_json(map: Map<String, Json>) -> Record {
    map.into_iter()
        .filter_map(|(key, value)| from_json(value).map(|v| (key, v)))
        .collect()
}

fn marker_from_json(map: &Map<String, Json>) -> Option<ShardMarker> {
    if map.len() != 2 || map.get(MARKER_TAG) != Some(&Json::Bool(true)) {
        return None;
    }
    let count = map.get(MARKER_COUNT)?.as_u64()?;
    usize::try_from(count).ok().map(ShardMarker::new)
}
