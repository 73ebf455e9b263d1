//! Kind-directed coercion of raw overlay values.
//!
//! File overlays carry whatever YAML produced, environment overlays carry raw
//! strings, and flag overlays carry already-typed values. All of them pass
//! through [`coerce`] on their way into the merge store, which turns each
//! value into the canonical form for its [`FieldKind`]:
//!
//! | kind          | canonical form                       |
//! |---------------|--------------------------------------|
//! | string        | JSON string                          |
//! | bool          | JSON bool                            |
//! | int / uint    | JSON integer, range-checked by width |
//! | float         | JSON number                          |
//! | duration      | string such as `1m30s`               |
//! | timestamp     | RFC3339 string                       |
//! | lists         | JSON array of the element kind       |
//! | string map    | JSON object of strings               |

use serde_json::{Map, Number, Value};
use std::time::Duration;
use thiserror::Error;

use super::schema::{Field, FieldKind, FloatWidth, IntWidth};
use crate::utils::time::{format_duration, parse_duration, parse_time};

#[derive(Debug, Error, Clone, PartialEq)]
#[error("expected {kind}, got {found}: {reason}")]
pub struct CoerceError {
    pub kind: FieldKind,
    pub found: String,
    pub reason: String,
}

impl CoerceError {
    fn new(kind: FieldKind, found: &Value, reason: impl Into<String>) -> Self {
        let found = match found {
            Value::String(s) => format!("{s:?}"),
            other => other.to_string(),
        };
        Self { kind, found, reason: reason.into() }
    }
}

/// Coerce `raw` to the canonical form of `field`'s kind.
pub fn coerce(field: &Field, raw: &Value) -> Result<Value, CoerceError> {
    coerce_kind(field.kind(), raw)
}

pub fn coerce_kind(kind: FieldKind, raw: &Value) -> Result<Value, CoerceError> {
    match kind {
        FieldKind::String => coerce_string(raw).map(Value::String),
        FieldKind::Bool => coerce_bool(raw),
        FieldKind::Int(width) => coerce_int(raw, width),
        FieldKind::Uint(width) => coerce_uint(raw, width),
        FieldKind::Float(width) => coerce_float(raw, width),
        FieldKind::Duration => coerce_duration(raw),
        FieldKind::Timestamp => coerce_timestamp(raw),
        FieldKind::StringList => coerce_list(kind, raw, FieldKind::String),
        FieldKind::IntList => coerce_list(kind, raw, FieldKind::Int(IntWidth::W64)),
        FieldKind::FloatList => coerce_list(kind, raw, FieldKind::Float(FloatWidth::W64)),
        FieldKind::StringMap => coerce_map(raw),
    }
}

fn coerce_string(raw: &Value) -> Result<String, CoerceError> {
    match raw {
        Value::String(s) => Ok(s.clone()),
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(CoerceError::new(FieldKind::String, other, "not a scalar")),
    }
}

fn coerce_bool(raw: &Value) -> Result<Value, CoerceError> {
    let kind = FieldKind::Bool;
    match raw {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err(CoerceError::new(kind, raw, "only 0 and 1 are booleans")),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(CoerceError::new(kind, raw, "use true or false")),
        },
        other => Err(CoerceError::new(kind, other, "not a boolean")),
    }
}

pub(crate) fn int_bounds(width: IntWidth) -> (i64, i64) {
    match width {
        IntWidth::W8 => (i8::MIN.into(), i8::MAX.into()),
        IntWidth::W16 => (i16::MIN.into(), i16::MAX.into()),
        IntWidth::W32 => (i32::MIN.into(), i32::MAX.into()),
        IntWidth::W64 => (i64::MIN, i64::MAX),
    }
}

pub(crate) fn uint_bound(width: IntWidth) -> u64 {
    match width {
        IntWidth::W8 => u8::MAX.into(),
        IntWidth::W16 => u16::MAX.into(),
        IntWidth::W32 => u32::MAX.into(),
        IntWidth::W64 => u64::MAX,
    }
}

fn coerce_int(raw: &Value, width: IntWidth) -> Result<Value, CoerceError> {
    let kind = FieldKind::Int(width);
    let value = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
    .ok_or_else(|| CoerceError::new(kind, raw, "not an integer"))?;

    let (min, max) = int_bounds(width);
    if value < min || value > max {
        return Err(CoerceError::new(kind, raw, format!("out of range {min}..={max}")));
    }
    Ok(Value::from(value))
}

fn coerce_uint(raw: &Value, width: IntWidth) -> Result<Value, CoerceError> {
    let kind = FieldKind::Uint(width);
    let value = match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
    .ok_or_else(|| CoerceError::new(kind, raw, "not an unsigned integer"))?;

    let max = uint_bound(width);
    if value > max {
        return Err(CoerceError::new(kind, raw, format!("out of range 0..={max}")));
    }
    Ok(Value::from(value))
}

fn coerce_float(raw: &Value, width: FloatWidth) -> Result<Value, CoerceError> {
    let kind = FieldKind::Float(width);
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| CoerceError::new(kind, raw, "not a number"))?;

    if width == FloatWidth::W32 && value.is_finite() && value.abs() > f64::from(f32::MAX) {
        return Err(CoerceError::new(kind, raw, "out of range for f32"));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| CoerceError::new(kind, raw, "not a finite number"))
}

fn coerce_duration(raw: &Value) -> Result<Value, CoerceError> {
    let kind = FieldKind::Duration;
    let duration = match raw {
        Value::String(s) => {
            parse_duration(s).map_err(|err| CoerceError::new(kind, raw, err.to_string()))?
        }
        Value::Number(n) => n
            .as_f64()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .ok_or_else(|| CoerceError::new(kind, raw, "not a non-negative number of seconds"))?,
        other => return Err(CoerceError::new(kind, other, "not a duration")),
    };
    Ok(Value::String(format_duration(duration)))
}

fn coerce_timestamp(raw: &Value) -> Result<Value, CoerceError> {
    let kind = FieldKind::Timestamp;
    let text = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
        other => return Err(CoerceError::new(kind, other, "not a timestamp")),
    };
    match parse_time(&text) {
        Ok(Some(ts)) => Ok(Value::String(ts.to_rfc3339())),
        Ok(None) => Err(CoerceError::new(kind, raw, "empty timestamp")),
        Err(err) => Err(CoerceError::new(kind, raw, err.to_string())),
    }
}

fn coerce_list(kind: FieldKind, raw: &Value, element: FieldKind) -> Result<Value, CoerceError> {
    let items: Vec<Value> = match raw {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        Value::String(s) => split_items(s).map(|item| Value::String(item.to_string())).collect(),
        other => return Err(CoerceError::new(kind, other, "not a list")),
    };
    items
        .iter()
        .map(|item| coerce_kind(element, item))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
        .map_err(|err| CoerceError::new(kind, raw, format!("element {}", err)))
}

fn coerce_map(raw: &Value) -> Result<Value, CoerceError> {
    let kind = FieldKind::StringMap;
    let mut out = Map::new();
    match raw {
        Value::Null => {}
        Value::Object(entries) => {
            for (key, value) in entries {
                let value = coerce_string(value)
                    .map_err(|_| CoerceError::new(kind, raw, format!("value of '{key}' is not a scalar")))?;
                out.insert(key.clone(), Value::String(value));
            }
        }
        Value::String(s) => {
            for pair in split_items(s) {
                let (key, value) = parse_pair(pair)
                    .ok_or_else(|| CoerceError::new(kind, raw, format!("'{pair}' is not key=value")))?;
                out.insert(key.to_string(), Value::String(value.to_string()));
            }
        }
        other => return Err(CoerceError::new(kind, other, "not a mapping")),
    }
    Ok(Value::Object(out))
}

fn split_items(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Split `key=value`; the key must be non-empty, the value may be.
pub(crate) fn parse_pair(pair: &str) -> Option<(&str, &str)> {
    let (key, value) = pair.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}
