//! Span normalization and cost attribution
//!
//! Turns one `SpanRecord` into one `NormalizedSpan`. Malformed optional
//! fields have already degraded to defaults during deserialization; the only
//! rejection is a record without a trace id or span id.

use serde_json::{Map, Value as JsonValue};

use crate::data::types::{NormalizedSpan, SpanRecord, SpanType};
use crate::domain::pricing::{PricingTable, SpanCostInput, calculate_cost};
use crate::utils::json::{scalar_to_i64, scalar_to_string};
use crate::utils::time::millis_to_nanos;

// Instrumentation attribute keys read when the typed field is absent
const ATTR_SESSION_ID: &str = "agentmark.session_id";
const ATTR_SESSION_NAME: &str = "agentmark.session_name";
const ATTR_USER_ID: &str = "agentmark.user_id";
const ATTR_TRACE_NAME: &str = "agentmark.trace_name";
const ATTR_PROMPT_NAME: &str = "agentmark.prompt_name";
const ATTR_DATASET_RUN_ID: &str = "agentmark.dataset_run_id";
const ATTR_DATASET_RUN_NAME: &str = "agentmark.dataset_run_name";
const ATTR_DATASET_ITEM_NAME: &str = "agentmark.dataset_item_name";
const ATTR_DATASET_EXPECTED_OUTPUT: &str = "agentmark.dataset_expected_output";
const ATTR_DATASET_PATH: &str = "agentmark.dataset_path";
const ATTR_PROPS: &str = "agentmark.props";
const ATTR_MODEL: &str = "gen_ai.request.model";
const ATTR_RESPONSE_MODEL: &str = "gen_ai.response.model";
const ATTR_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";
const ATTR_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";
const ATTR_METADATA_PREFIX: &str = "agentmark.metadata.";

/// Largest duration whose nanosecond form fits an i64
const MAX_DURATION_MS: i64 = i64::MAX / 1_000_000;

/// Result of normalizing one batch
#[derive(Debug, Default)]
pub struct NormalizedBatch {
    pub spans: Vec<NormalizedSpan>,
    /// Records dropped for missing identity
    pub skipped: usize,
}

pub fn normalize_batch(records: Vec<SpanRecord>, pricing: &PricingTable) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    for record in records {
        match normalize_span(record, pricing) {
            Some(span) => batch.spans.push(span),
            None => batch.skipped += 1,
        }
    }
    batch
}

/// Normalize one record. Returns None when `traceId` or `spanId` is missing.
pub fn normalize_span(record: SpanRecord, pricing: &PricingTable) -> Option<NormalizedSpan> {
    let (Some(trace_id), Some(span_id)) = (record.trace_id.clone(), record.span_id.clone()) else {
        tracing::warn!(
            trace_id = ?record.trace_id,
            span_id = ?record.span_id,
            "Skipping span without trace or span id"
        );
        return None;
    };

    let attrs = &record.attributes;
    let model = record
        .model
        .clone()
        .or_else(|| attr_string(attrs, ATTR_MODEL))
        .or_else(|| attr_string(attrs, ATTR_RESPONSE_MODEL));
    let input_tokens = record
        .input_tokens
        .or_else(|| attrs.get(ATTR_INPUT_TOKENS).and_then(scalar_to_i64))
        .map(token_count);
    let output_tokens = record
        .output_tokens
        .or_else(|| attrs.get(ATTR_OUTPUT_TOKENS).and_then(scalar_to_i64))
        .map(token_count);
    let total_tokens = record.total_tokens.map(token_count).unwrap_or_else(|| {
        input_tokens
            .unwrap_or(0)
            .saturating_add(output_tokens.unwrap_or(0))
    });

    let cost = calculate_cost(
        pricing,
        &SpanCostInput {
            model: model.as_deref(),
            input_tokens,
            output_tokens,
            status: record.status_code,
            explicit_cost: record.cost,
        },
    );

    let start_ms = record.start_time.unwrap_or(0.0);
    let duration_ms = match (record.duration_ms, record.end_time) {
        (Some(d), _) => d.round() as i64,
        (None, Some(end)) => (end - start_ms).round() as i64,
        (None, None) => 0,
    }
    .clamp(0, MAX_DURATION_MS);

    let metadata = lift_metadata(record.metadata, attrs);

    Some(NormalizedSpan {
        trace_id,
        span_id,
        parent_span_id: record.parent_span_id,
        span_name: record.name.unwrap_or_default(),
        span_type: SpanType::from_lenient(record.span_type.as_deref()),

        timestamp: millis_to_nanos(start_ms),
        end_time: record.end_time.map(millis_to_nanos),
        duration_ms,

        model,
        input_tokens: input_tokens.unwrap_or(0),
        output_tokens: output_tokens.unwrap_or(0),
        total_tokens,
        reasoning_tokens: record.reasoning_tokens.map(token_count).unwrap_or(0),
        cost,

        input: value_to_text(record.input),
        output: value_to_text(record.output),
        output_object: record.output_object,
        tool_calls: record.tool_calls,
        finish_reason: record.finish_reason,
        settings: record.settings,

        session_id: record
            .session_id
            .or_else(|| attr_string(attrs, ATTR_SESSION_ID)),
        session_name: record
            .session_name
            .or_else(|| attr_string(attrs, ATTR_SESSION_NAME)),
        user_id: record.user_id.or_else(|| attr_string(attrs, ATTR_USER_ID)),
        trace_name: record
            .trace_name
            .or_else(|| attr_string(attrs, ATTR_TRACE_NAME)),
        prompt_name: record
            .prompt_name
            .or_else(|| attr_string(attrs, ATTR_PROMPT_NAME)),
        props: match record.props {
            JsonValue::Null => attr_json(attrs, ATTR_PROPS),
            props => props,
        },
        dataset_run_id: record
            .dataset_run_id
            .or_else(|| attr_string(attrs, ATTR_DATASET_RUN_ID)),
        dataset_run_name: record
            .dataset_run_name
            .or_else(|| attr_string(attrs, ATTR_DATASET_RUN_NAME)),
        dataset_path: record
            .dataset_path
            .or_else(|| attr_string(attrs, ATTR_DATASET_PATH)),
        dataset_item_name: record
            .dataset_item_name
            .or_else(|| attr_string(attrs, ATTR_DATASET_ITEM_NAME)),
        dataset_expected_output: value_to_text(record.dataset_expected_output)
            .or_else(|| attrs.get(ATTR_DATASET_EXPECTED_OUTPUT).and_then(|v| value_to_text(v.clone()))),

        status_code: record.status_code,
        status_message: record.status_message,

        attributes: map_to_value(record.attributes),
        events: record.events,
        links: record.links,
        metadata,
    })
}

fn attr_string(attrs: &Map<String, JsonValue>, key: &str) -> Option<String> {
    attrs.get(key).and_then(scalar_to_string)
}

/// Attribute holding JSON, either inline or serialized into a string
fn attr_json(attrs: &Map<String, JsonValue>, key: &str) -> JsonValue {
    match attrs.get(key) {
        Some(JsonValue::String(s)) => {
            serde_json::from_str(s).unwrap_or_else(|_| JsonValue::String(s.clone()))
        }
        Some(other) => other.clone(),
        None => JsonValue::Null,
    }
}

/// Token counts are non-negative
fn token_count(tokens: i64) -> i64 {
    tokens.max(0)
}

/// Strings are kept verbatim, other non-null values are serialized.
fn value_to_text(value: JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s),
        other => serde_json::to_string(&other).ok(),
    }
}

fn map_to_value(map: Map<String, JsonValue>) -> JsonValue {
    if map.is_empty() {
        JsonValue::Null
    } else {
        JsonValue::Object(map)
    }
}

/// Copy `agentmark.metadata.<key>` attributes into metadata unless the key is set
fn lift_metadata(
    mut metadata: Map<String, JsonValue>,
    attrs: &Map<String, JsonValue>,
) -> JsonValue {
    for (key, value) in attrs {
        if let Some(name) = key.strip_prefix(ATTR_METADATA_PREFIX)
            && !name.is_empty()
            && !metadata.contains_key(name)
        {
            metadata.insert(name.to_string(), value.clone());
        }
    }
    map_to_value(metadata)
}
