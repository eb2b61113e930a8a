//! Ingestion record and normalized span types
//!
//! `SpanRecord` is the camelCase wire shape accepted by ingestion. Every field
//! deserializes leniently: a value of the wrong type degrades to its default
//! instead of failing the whole record. `NormalizedSpan` is the canonical row
//! written to the store.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::enums::{SpanType, StatusCode};
use crate::utils::json::{scalar_to_f64, scalar_to_i64, scalar_to_string};

/// One incoming span as produced by the instrumentation layer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpanRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub trace_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub span_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub parent_span_id: Option<String>,
    #[serde(alias = "spanName", deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "type", deserialize_with = "lenient_string")]
    pub span_type: Option<String>,

    /// Epoch milliseconds, may be fractional
    #[serde(deserialize_with = "lenient_f64")]
    pub start_time: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub end_time: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub duration_ms: Option<f64>,

    #[serde(deserialize_with = "lenient_string")]
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    pub input_tokens: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub output_tokens: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub total_tokens: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub reasoning_tokens: Option<i64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub cost: Option<f64>,

    pub input: JsonValue,
    pub output: JsonValue,
    pub output_object: JsonValue,
    pub tool_calls: JsonValue,
    #[serde(deserialize_with = "lenient_string")]
    pub finish_reason: Option<String>,
    pub settings: JsonValue,

    #[serde(deserialize_with = "lenient_string")]
    pub session_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub session_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub trace_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub prompt_name: Option<String>,
    pub props: JsonValue,
    #[serde(deserialize_with = "lenient_string")]
    pub dataset_run_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub dataset_run_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub dataset_path: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub dataset_item_name: Option<String>,
    pub dataset_expected_output: JsonValue,

    pub status_code: StatusCode,
    #[serde(deserialize_with = "lenient_string")]
    pub status_message: Option<String>,

    #[serde(deserialize_with = "lenient_map")]
    pub attributes: Map<String, JsonValue>,
    pub events: JsonValue,
    pub links: JsonValue,
    #[serde(deserialize_with = "lenient_map")]
    pub metadata: Map<String, JsonValue>,
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = JsonValue::deserialize(d)?;
    Ok(scalar_to_string(&value))
}

fn lenient_i64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = JsonValue::deserialize(d)?;
    Ok(scalar_to_i64(&value))
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = JsonValue::deserialize(d)?;
    Ok(scalar_to_f64(&value))
}

fn lenient_map<'de, D: Deserializer<'de>>(d: D) -> Result<Map<String, JsonValue>, D::Error> {
    match JsonValue::deserialize(d)? {
        JsonValue::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Canonical stored span row
///
/// Blob fields hold JSON values and are serialized to text at insert time;
/// `JsonValue::Null` becomes SQL NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedSpan {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub span_name: String,
    pub span_type: SpanType,

    /// Start time, nanoseconds since epoch
    pub timestamp: i64,
    /// End time, nanoseconds since epoch
    pub end_time: Option<i64>,
    pub duration_ms: i64,

    pub model: Option<String>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub reasoning_tokens: i64,
    pub cost: f64,

    pub input: Option<String>,
    pub output: Option<String>,
    pub output_object: JsonValue,
    pub tool_calls: JsonValue,
    pub finish_reason: Option<String>,
    pub settings: JsonValue,

    pub session_id: Option<String>,
    pub session_name: Option<String>,
    pub user_id: Option<String>,
    pub trace_name: Option<String>,
    pub prompt_name: Option<String>,
    pub props: JsonValue,
    pub dataset_run_id: Option<String>,
    pub dataset_run_name: Option<String>,
    pub dataset_path: Option<String>,
    pub dataset_item_name: Option<String>,
    pub dataset_expected_output: Option<String>,

    pub status_code: StatusCode,
    pub status_message: Option<String>,

    pub attributes: JsonValue,
    pub events: JsonValue,
    pub links: JsonValue,
    pub metadata: JsonValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_full_shape() {
        let record: SpanRecord = serde_json::from_value(json!({
            "traceId": "t1",
            "spanId": "s1",
            "parentSpanId": null,
            "name": "llm-call",
            "type": "GENERATION",
            "startTime": 1700000000000.5,
            "durationMs": 120,
            "model": "gpt-4o",
            "inputTokens": 100,
            "outputTokens": 50,
            "statusCode": "1",
            "metadata": {"graph.node.id": "n1"}
        }))
        .unwrap();

        assert_eq!(record.trace_id.as_deref(), Some("t1"));
        assert_eq!(record.parent_span_id, None);
        assert_eq!(record.span_type.as_deref(), Some("GENERATION"));
        assert_eq!(record.start_time, Some(1700000000000.5));
        assert_eq!(record.duration_ms, Some(120.0));
        assert_eq!(record.input_tokens, Some(100));
        assert_eq!(record.status_code, StatusCode::Ok);
        assert_eq!(record.metadata.get("graph.node.id"), Some(&json!("n1")));
    }

    #[test]
    fn test_record_malformed_fields_degrade() {
        let record: SpanRecord = serde_json::from_value(json!({
            "traceId": "t1",
            "spanId": 42,
            "inputTokens": "lots",
            "cost": {"bad": true},
            "attributes": [1, 2, 3],
            "metadata": "nope",
            "statusCode": "weird"
        }))
        .unwrap();

        assert_eq!(record.span_id.as_deref(), Some("42"));
        assert_eq!(record.input_tokens, None);
        assert_eq!(record.cost, None);
        assert!(record.attributes.is_empty());
        assert!(record.metadata.is_empty());
        assert_eq!(record.status_code, StatusCode::Unset);
    }

    #[test]
    fn test_record_span_name_alias() {
        let record: SpanRecord =
            serde_json::from_value(json!({"spanName": "alias"})).unwrap();
        assert_eq!(record.name.as_deref(), Some("alias"));
    }

    #[test]
    fn test_record_empty_object() {
        let record: SpanRecord = serde_json::from_value(json!({})).unwrap();
        assert!(record.trace_id.is_none());
        assert!(record.input.is_null());
    }
}
