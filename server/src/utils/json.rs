//! JSON utility functions

use serde_json::Value as JsonValue;

/// Converts a JsonValue to Option<String>, returning None for null values.
///
/// This prevents serializing `JsonValue::Null` as the string `"null"`,
/// which would be stored as a VARCHAR instead of a database NULL.
pub fn json_to_opt_string(value: &JsonValue) -> Option<String> {
    if value.is_null() {
        None
    } else {
        serde_json::to_string(value).ok()
    }
}

/// Parse a stored JSON blob back into a value. NULL and invalid text become `Null`.
pub fn opt_string_to_json(raw: Option<&str>) -> JsonValue {
    raw.and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or(JsonValue::Null)
}

/// Render a scalar JSON value as a string (strings unquoted, numbers and bools
/// formatted). Null, empty strings and compound values yield None.
pub fn scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Read a scalar JSON value as i64, accepting integers, integral floats and
/// numeric strings.
pub fn scalar_to_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Read a scalar JSON value as a finite f64, accepting numeric strings.
pub fn scalar_to_f64(value: &JsonValue) -> Option<f64> {
    let v = match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}
