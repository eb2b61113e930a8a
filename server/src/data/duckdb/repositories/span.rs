//! DuckDB span repository using Appender API
//!
//! Batch writes for normalized spans. A batch is all-or-nothing: a duplicate
//! `(trace_id, span_id)` or any other storage failure rolls back every row.

use duckdb::Connection;
use duckdb::params;

use crate::data::duckdb::{DuckdbError, in_transaction};
use crate::data::types::NormalizedSpan;
use crate::utils::json::json_to_opt_string;

pub fn insert_batch(conn: &Connection, spans: &[NormalizedSpan]) -> Result<(), DuckdbError> {
    if spans.is_empty() {
        return Ok(());
    }

    in_transaction(conn, |conn| insert_spans(conn, spans))
}

fn insert_spans(conn: &Connection, spans: &[NormalizedSpan]) -> Result<(), DuckdbError> {
    let mut appender = conn.appender("spans")?;

    for span in spans {
        let output_object = json_to_opt_string(&span.output_object);
        let tool_calls = json_to_opt_string(&span.tool_calls);
        let settings = json_to_opt_string(&span.settings);
        let props = json_to_opt_string(&span.props);
        let attributes = json_to_opt_string(&span.attributes);
        let events = json_to_opt_string(&span.events);
        let links = json_to_opt_string(&span.links);
        let metadata = json_to_opt_string(&span.metadata);

        // Column order must match schema.rs CREATE TABLE definition
        appender.append_row(params![
            // IDENTITY
            span.trace_id.as_str(),
            span.span_id.as_str(),
            span.parent_span_id.as_deref(),
            span.span_name.as_str(),
            span.span_type.as_str(),
            // TIMING
            span.timestamp,
            span.end_time,
            span.duration_ms,
            // LLM
            span.model.as_deref(),
            span.input_tokens,
            span.output_tokens,
            span.total_tokens,
            span.reasoning_tokens,
            span.cost,
            // CONTENT
            span.input.as_deref(),
            span.output.as_deref(),
            output_object.as_deref(),
            tool_calls.as_deref(),
            span.finish_reason.as_deref(),
            settings.as_deref(),
            // CONTEXT
            span.session_id.as_deref(),
            span.session_name.as_deref(),
            span.user_id.as_deref(),
            span.trace_name.as_deref(),
            span.prompt_name.as_deref(),
            props.as_deref(),
            span.dataset_run_id.as_deref(),
            span.dataset_run_name.as_deref(),
            span.dataset_path.as_deref(),
            span.dataset_item_name.as_deref(),
            span.dataset_expected_output.as_deref(),
            // STATUS
            span.status_code.as_str(),
            span.status_message.as_deref(),
            // OPAQUE PAYLOAD
            attributes.as_deref(),
            events.as_deref(),
            links.as_deref(),
            metadata.as_deref(),
        ])?;
    }

    appender.flush()?;
    drop(appender);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::duckdb::DuckdbService;
    use crate::data::types::{SpanType, StatusCode};
    use serde_json::json;

    fn span(trace_id: &str, span_id: &str) -> NormalizedSpan {
        NormalizedSpan {
            trace_id: trace_id.to_string(),
            span_id: span_id.to_string(),
            span_name: "test-span".to_string(),
            timestamp: 1_000_000,
            ..Default::default()
        }
    }

    fn count(service: &DuckdbService) -> i64 {
        service
            .reader()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM spans", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_empty_batch() {
        let service = DuckdbService::open_in_memory().unwrap();
        let conn = service.writer().unwrap();
        assert!(insert_batch(&conn, &[]).is_ok());
    }

    #[test]
    fn test_insert_span_columns() {
        let service = DuckdbService::open_in_memory().unwrap();
        let full = NormalizedSpan {
            span_type: SpanType::Generation,
            model: Some("gpt-4o".to_string()),
            input_tokens: 10,
            output_tokens: 5,
            cost: 0.5,
            status_code: StatusCode::Error,
            metadata: json!({"k": "v"}),
            ..span("t1", "s1")
        };
        insert_batch(&service.writer().unwrap(), &[full]).unwrap();

        let conn = service.reader().unwrap();
        let (span_type, model, cost, status, metadata, events): (
            String,
            Option<String>,
            f64,
            String,
            Option<String>,
            Option<String>,
        ) = conn
            .query_row(
                "SELECT span_type, model, cost, status_code, metadata, events FROM spans WHERE span_id = 's1'",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .unwrap();

        assert_eq!(span_type, "GENERATION");
        assert_eq!(model.as_deref(), Some("gpt-4o"));
        assert_eq!(cost, 0.5);
        assert_eq!(status, "2");
        assert_eq!(metadata.as_deref(), Some(r#"{"k":"v"}"#));
        assert_eq!(events, None, "absent blobs are stored as NULL");
    }

    #[test]
    fn test_duplicate_key_rolls_back_whole_batch() {
        let service = DuckdbService::open_in_memory().unwrap();
        insert_batch(&service.writer().unwrap(), &[span("t1", "s1")]).unwrap();

        let result = insert_batch(
            &service.writer().unwrap(),
            &[span("t1", "s2"), span("t1", "s1")],
        );
        assert!(result.is_err(), "duplicate (trace_id, span_id) must fail");
        assert_eq!(count(&service), 1, "no row from the failed batch is kept");

        insert_batch(&service.writer().unwrap(), &[span("t1", "s3")]).unwrap();
        assert_eq!(count(&service), 2, "writer stays usable after a failed batch");
    }

    #[test]
    fn test_same_span_id_in_different_traces() {
        let service = DuckdbService::open_in_memory().unwrap();
        insert_batch(
            &service.writer().unwrap(),
            &[span("t1", "s1"), span("t2", "s1")],
        )
        .unwrap();
        assert_eq!(count(&service), 2);
    }
}
