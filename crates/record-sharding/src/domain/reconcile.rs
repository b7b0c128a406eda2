//! # Reconciliation
//!
//! Merge freshly loaded data with the reference schema: missing keys are
//! filled in recursively, loaded values win, shard markers are kept verbatim.

use super::value::{Record, Value};

/// Reconcile `loaded` against `template`.
pub fn reconcile(mut loaded: Record, template: &Record) -> Record {
    for (key, template_value) in template {
        match loaded.get_mut(key) {
            None => {
                loaded.insert(key.clone(), template_value.clone());
            }
            Some(Value::Sharded(_)) => {}
            Some(Value::Map(existing)) => {
                if let Value::Map(template_map) = template_value {
                    let taken = std::mem::take(existing);
                    *existing = reconcile(taken, template_map);
                }
            }
            Some(_) => {}
        }
    }
    loaded
}
