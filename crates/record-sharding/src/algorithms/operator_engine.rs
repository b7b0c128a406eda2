//! # Operator Engine
//!
//! Pure atomic transforms applied to a resolved value.
//!
//! | operator | current | effect |
//! |----------|---------|--------|
//! | `+ - * /` | number | arithmetic with the operand |
//! | `SET` | any | replaced by the operand |
//! | `INSERT` | mapping | operand entries overwrite current entries |
//! | `PUSH` | sequence | operand appended |
//! | `DELETE` | mapping | entry keyed by the operand removed |
//!
//! Operands and arithmetic results must be finite, so every stored record
//! stays encodable.

use crate::domain::{OperatorKind, RecordError, Value};

/// Apply `operator` to `current` with `operand`, returning the new value.
pub fn apply(operator: OperatorKind, current: Value, operand: &Value) -> Result<Value, RecordError> {
    if operand.contains_marker() {
        return Err(RecordError::mismatch(
            operator.as_str(),
            "an operand without shard markers",
        ));
    }
    if !operand.is_finite() {
        return Err(RecordError::mismatch(operator.as_str(), "finite numbers in the operand"));
    }

    match operator {
        OperatorKind::Add => arithmetic(operator, &current, operand, |a, b| a + b),
        OperatorKind::Subtract => arithmetic(operator, &current, operand, |a, b| a - b),
        OperatorKind::Multiply => arithmetic(operator, &current, operand, |a, b| a * b),
        OperatorKind::Divide => {
            if operand.as_number() == Some(0.0) {
                return Err(RecordError::mismatch("/", "a non-zero divisor"));
            }
            arithmetic(operator, &current, operand, |a, b| a / b)
        }
        OperatorKind::Set => Ok(operand.clone()),
        OperatorKind::Insert => match (current, operand) {
            (Value::Map(mut map), Value::Map(entries)) => {
                for (key, value) in entries {
                    map.insert(key.clone(), value.clone());
                }
                Ok(Value::Map(map))
            }
            _ => Err(RecordError::mismatch("INSERT", "a mapping target and mapping operand")),
        },
        OperatorKind::Push => match current {
            Value::List(mut items) => {
                items.push(operand.clone());
                Ok(Value::List(items))
            }
            _ => Err(RecordError::mismatch("PUSH", "a sequence target")),
        },
        OperatorKind::Delete => match (current, operand) {
            (Value::Map(mut map), Value::String(key)) => {
                map.remove(key);
                Ok(Value::Map(map))
            }
            _ => Err(RecordError::mismatch("DELETE", "a mapping target and string key")),
        },
    }
}

fn arithmetic(
    operator: OperatorKind,
    current: &Value,
    operand: &Value,
    op: impl Fn(f64, f64) -> f64,
) -> Result<Value, RecordError> {
    match (current.as_number(), operand.as_number()) {
        (Some(lhs), Some(rhs)) => {
            let result = op(lhs, rhs);
            if !result.is_finite() {
                return Err(RecordError::mismatch(operator.as_str(), "a finite result"));
            }
            Ok(Value::Number(result))
        }
        _ => Err(RecordError::mismatch(operator.as_str(), "numeric target and operand")),
    }
}
