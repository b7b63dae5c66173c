//! Structural rendering of Lua values
//!
//! Values are converted to `serde_json` values, then printed as compact JSON.
//! Tables that form a non-empty sequence become arrays, every other table
//! becomes an object with stringified, sorted keys.

use std::ffi::c_void;

use mlua::Value;
use serde_json::{Map, Number, Value as JsonValue};
use thiserror::Error;

use crate::output::OutputFormat;

/// Maximum table nesting rendered before giving up
pub const MAX_DEPTH: usize = 64;

/// Largest integral float that still round-trips through `i64` exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("cannot render a table that contains itself")]
    Cycle,

    #[error("cannot render values nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("failed to read table: {0}")]
    Table(String),
}

/// Render one argument of a diagnostic call
pub fn render_arg(value: &Value, format: OutputFormat) -> Result<String, RenderError> {
    if format == OutputFormat::Display
        && let Value::String(s) = value
    {
        return Ok(String::from_utf8_lossy(s.as_bytes()).into_owned());
    }
    Ok(to_json(value)?.to_string())
}

/// Convert a value to its JSON form. Values with no data representation
/// (functions, threads, userdata) become `null`.
pub fn to_json(value: &Value) -> Result<JsonValue, RenderError> {
    let mut ancestors = Vec::new();
    Ok(convert(value, &mut ancestors)?.unwrap_or(JsonValue::Null))
}

fn convert(
    value: &Value,
    ancestors: &mut Vec<*const c_void>,
) -> Result<Option<JsonValue>, RenderError> {
    let json = match value {
        Value::Nil => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Number(n) => number(*n),
        Value::String(s) => {
            JsonValue::String(String::from_utf8_lossy(s.as_bytes()).into_owned())
        }
        Value::Table(table) => {
            let ptr = value.to_pointer();
            if ancestors.contains(&ptr) {
                return Err(RenderError::Cycle);
            }
            if ancestors.len() >= MAX_DEPTH {
                return Err(RenderError::TooDeep(MAX_DEPTH));
            }

            let mut entries = Vec::new();
            for pair in table.clone().pairs::<Value, Value>() {
                entries.push(pair.map_err(|e| RenderError::Table(e.to_string()))?);
            }

            ancestors.push(ptr);
            let json = if is_sequence(&entries) {
                sequence(entries, ancestors)?
            } else {
                object(entries, ancestors)?
            };
            ancestors.pop();
            json
        }
        Value::Error(e) => JsonValue::String(e.to_string()),
        _ => return Ok(None),
    };
    Ok(Some(json))
}

fn sequence(
    mut entries: Vec<(Value, Value)>,
    ancestors: &mut Vec<*const c_void>,
) -> Result<JsonValue, RenderError> {
    entries.sort_by_key(|(key, _)| match key {
        Value::Integer(i) => *i,
        _ => 0,
    });
    let mut items = Vec::with_capacity(entries.len());
    for (_, value) in &entries {
        items.push(convert(value, ancestors)?.unwrap_or(JsonValue::Null));
    }
    Ok(JsonValue::Array(items))
}

fn object(
    entries: Vec<(Value, Value)>,
    ancestors: &mut Vec<*const c_void>,
) -> Result<JsonValue, RenderError> {
    let mut map = Map::new();
    for (key, value) in &entries {
        let Some(key) = key_string(key) else {
            continue;
        };
        if let Some(json) = convert(value, ancestors)? {
            map.insert(key, json);
        }
    }
    Ok(JsonValue::Object(map))
}

/// A table is a sequence when its keys are exactly `1..=n` for some `n > 0`
fn is_sequence(entries: &[(Value, Value)]) -> bool {
    let n = entries.len() as i64;
    n > 0
        && entries
            .iter()
            .all(|(key, _)| matches!(key, Value::Integer(i) if (1..=n).contains(i)))
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Number(n) => Some(number(*n).to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(n: f64) -> JsonValue {
    if !n.is_finite() {
        return JsonValue::Null;
    }
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        return JsonValue::from(n as i64);
    }
    Number::from_f64(n)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}
