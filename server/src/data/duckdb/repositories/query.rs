//! Query repository for traces, spans, sessions, requests and dataset runs
//!
//! Traces are never stored. Every trace row is aggregated from `spans` at
//! query time: the root span is the earliest span whose parent is NULL or
//! matches no stored `span_id` anywhere in the table.

use duckdb::types::Value;
use duckdb::{Connection, Row, params_from_iter};
use serde_json::Value as JsonValue;

use crate::data::duckdb::DuckdbError;
use crate::data::types::{
    DatasetRunRow, GraphSpanRow, Pagination, RequestRow, SessionRow, SpanData, SpanRow,
    SpanSearchFilter, SpanType, StatusCode, TraceQuery, TraceRow,
};
use crate::utils::json::opt_string_to_json;
use crate::utils::time::nanos_to_datetime;

const SPAN_COLUMNS: &str = "trace_id, span_id, parent_span_id, span_name, span_type, \
    timestamp_ns, end_time_ns, duration_ms, \
    model, input_tokens, output_tokens, total_tokens, reasoning_tokens, cost, \
    input, output, output_object, tool_calls, finish_reason, settings, \
    session_id, session_name, user_id, trace_name, prompt_name, props, \
    dataset_run_id, dataset_run_name, dataset_path, dataset_item_name, dataset_expected_output, \
    status_code, status_message, attributes, events, links, metadata";

/// Accumulates SQL conditions and their bind values in placeholder order
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    values: Vec<Value>,
}

impl Conditions {
    fn push(&mut self, clause: impl Into<String>, value: Value) {
        self.clauses.push(clause.into());
        self.values.push(value);
    }

    /// `" AND a AND b"`, or empty when no conditions are present
    fn and_clause(&self) -> String {
        self.clauses
            .iter()
            .map(|c| format!(" AND {}", c))
            .collect()
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

// --- Traces ---

/// Build the trace scope restricting which traces are aggregated.
fn trace_scope(query: &TraceQuery, trace_id: Option<&str>) -> Conditions {
    let mut scope = Conditions::default();
    if let Some(tid) = trace_id {
        scope.push("trace_id = ?", text(tid));
    }
    if let Some(ref sid) = query.session_id {
        scope.push(
            "trace_id IN (SELECT trace_id FROM spans WHERE session_id = ?)",
            text(sid),
        );
    }
    if let Some(ref rid) = query.dataset_run_id {
        scope.push(
            "trace_id IN (SELECT trace_id FROM spans WHERE dataset_run_id = ?)",
            text(rid),
        );
    }
    scope
}

/// Build post-aggregation filters over the derived trace columns.
fn trace_filters(query: &TraceQuery) -> Conditions {
    let filter = &query.filter;
    let mut conditions = Conditions::default();
    if let Some(status) = filter.status {
        conditions.push("status = ?", text(status.as_str()));
    }
    if let Some(ref name) = filter.name_contains {
        conditions.push("contains(lower(name), lower(CAST(? AS VARCHAR)))", text(name));
    }
    if let Some(gt) = filter.latency_gt {
        conditions.push("CAST(latency AS DOUBLE) > ?", Value::Double(gt));
    }
    if let Some(lt) = filter.latency_lt {
        conditions.push("CAST(latency AS DOUBLE) < ?", Value::Double(lt));
    }
    conditions
}

fn query_traces(
    conn: &Connection,
    query: &TraceQuery,
    trace_id: Option<&str>,
) -> Result<Vec<TraceRow>, DuckdbError> {
    let scope = trace_scope(query, trace_id);
    let filters = trace_filters(query);
    let scope_sql = scope.and_clause();

    let sql = format!(
        r#"
        WITH roots AS (
            SELECT
                s.trace_id,
                s.span_name,
                s.trace_name,
                ROW_NUMBER() OVER (PARTITION BY s.trace_id ORDER BY s.timestamp_ns, s.span_id) AS rn
            FROM spans s
            WHERE (s.parent_span_id IS NULL
                   OR NOT EXISTS (SELECT 1 FROM spans p WHERE p.span_id = s.parent_span_id))
              {scope_roots}
        ),
        agg AS (
            SELECT
                trace_id,
                MAX(status_code) AS status,
                MAX(duration_ms) AS latency,
                COALESCE(SUM(cost) FILTER (WHERE span_type = 'GENERATION'), 0)::DOUBLE AS cost,
                LEAST(
                    COALESCE(SUM(input_tokens::HUGEINT + output_tokens::HUGEINT) FILTER (WHERE span_type = 'GENERATION'), 0),
                    {i64_max}
                )::BIGINT AS tokens,
                MIN(timestamp_ns) AS start_ns,
                MAX(COALESCE(
                    end_time_ns,
                    LEAST(timestamp_ns::HUGEINT + GREATEST(duration_ms, 0)::HUGEINT * 1000000, {i64_max})::BIGINT
                )) AS end_ns,
                COUNT(*) AS span_count,
                FIRST(span_name ORDER BY timestamp_ns, span_id) AS first_name
            FROM spans
            WHERE TRUE {scope_agg}
            GROUP BY trace_id
        ),
        traces AS (
            SELECT
                a.trace_id,
                COALESCE(NULLIF(r.trace_name, ''), r.span_name, a.first_name) AS name,
                a.status,
                a.latency,
                a.cost,
                a.tokens,
                a.start_ns,
                a.end_ns,
                a.span_count
            FROM agg a
            LEFT JOIN roots r ON r.trace_id = a.trace_id AND r.rn = 1
        )
        SELECT trace_id, name, status, latency, cost, tokens, start_ns, end_ns, span_count
        FROM traces
        WHERE TRUE {filters}
        ORDER BY start_ns DESC, trace_id{pagination}
        "#,
        scope_roots = scope_sql,
        scope_agg = scope_sql,
        filters = filters.and_clause(),
        pagination = query.pagination.to_sql(),
        i64_max = i64::MAX,
    );

    let mut bind_values = scope.values.clone();
    bind_values.extend(scope.values);
    bind_values.extend(filters.values);

    execute_rows(conn, &sql, &bind_values, row_to_trace)
}

/// List traces, newest first, with optional filters and pagination
pub fn list_traces(conn: &Connection, query: &TraceQuery) -> Result<Vec<TraceRow>, DuckdbError> {
    query_traces(conn, query, None)
}

/// Derived root metadata for one trace, or None when it has no spans
pub fn get_trace(conn: &Connection, trace_id: &str) -> Result<Option<TraceRow>, DuckdbError> {
    let rows = query_traces(conn, &TraceQuery::default(), Some(trace_id))?;
    Ok(rows.into_iter().next())
}

fn row_to_trace(row: &Row<'_>) -> Result<TraceRow, DuckdbError> {
    let status: Option<String> = row.get(2)?;
    Ok(TraceRow {
        id: row.get(0)?,
        name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        status: status
            .as_deref()
            .and_then(StatusCode::parse)
            .unwrap_or_default(),
        latency: row.get::<_, Option<i64>>(3)?.unwrap_or(0),
        cost: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
        tokens: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        start: nanos_to_datetime(row.get(6)?),
        end: nanos_to_datetime(row.get::<_, Option<i64>>(7)?.unwrap_or(0)),
        span_count: row.get(8)?,
    })
}

// --- Spans ---

/// All spans of one trace, ascending by start time
pub fn list_spans(conn: &Connection, trace_id: &str) -> Result<Vec<SpanRow>, DuckdbError> {
    let sql = format!(
        "SELECT {} FROM spans WHERE trace_id = ? ORDER BY timestamp_ns ASC, span_id",
        SPAN_COLUMNS
    );
    execute_rows(conn, &sql, &[text(trace_id)], row_to_span)
}

pub fn get_span(
    conn: &Connection,
    trace_id: &str,
    span_id: &str,
) -> Result<Option<SpanRow>, DuckdbError> {
    let sql = format!(
        "SELECT {} FROM spans WHERE trace_id = ? AND span_id = ?",
        SPAN_COLUMNS
    );
    let rows = execute_rows(conn, &sql, &[text(trace_id), text(span_id)], row_to_span)?;
    Ok(rows.into_iter().next())
}

/// Free-form span search, newest first
pub fn search_spans(
    conn: &Connection,
    filter: &SpanSearchFilter,
    pagination: &Pagination,
) -> Result<Vec<SpanRow>, DuckdbError> {
    let mut conditions = Conditions::default();
    if let Some(ref tid) = filter.trace_id {
        conditions.push("trace_id = ?", text(tid));
    }
    if let Some(span_type) = filter.span_type {
        conditions.push("span_type = ?", text(span_type.as_str()));
    }
    if let Some(status) = filter.status {
        conditions.push("status_code = ?", text(status.as_str()));
    }
    if let Some(ref name) = filter.name_contains {
        conditions.push("contains(lower(span_name), lower(CAST(? AS VARCHAR)))", text(name));
    }
    if let Some(ref model) = filter.model {
        conditions.push("model = ?", text(model));
    }
    if let Some(min) = filter.min_duration {
        conditions.push("duration_ms >= ?", Value::BigInt(min));
    }
    if let Some(max) = filter.max_duration {
        conditions.push("duration_ms <= ?", Value::BigInt(max));
    }

    let sql = format!(
        "SELECT {} FROM spans WHERE TRUE{} ORDER BY timestamp_ns DESC, span_id{}",
        SPAN_COLUMNS,
        conditions.and_clause(),
        pagination.to_sql()
    );
    execute_rows(conn, &sql, &conditions.values, row_to_span)
}

/// Stored text that may or may not hold JSON
fn text_or_json(raw: Option<String>) -> JsonValue {
    match raw {
        Some(s) => serde_json::from_str(&s).unwrap_or(JsonValue::String(s)),
        None => JsonValue::Null,
    }
}

fn row_to_span(row: &Row<'_>) -> Result<SpanRow, DuckdbError> {
    let span_type: String = row.get(4)?;
    let status: String = row.get(31)?;
    let end_time_ns: Option<i64> = row.get(6)?;

    let data = SpanData {
        model: row.get(8)?,
        input_tokens: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
        output_tokens: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
        total_tokens: row.get::<_, Option<i64>>(11)?.unwrap_or(0),
        reasoning_tokens: row.get::<_, Option<i64>>(12)?.unwrap_or(0),
        cost: row.get::<_, Option<f64>>(13)?.unwrap_or(0.0),
        input: text_or_json(row.get(14)?),
        output: row.get(15)?,
        output_object: opt_string_to_json(row.get::<_, Option<String>>(16)?.as_deref()),
        tool_calls: opt_string_to_json(row.get::<_, Option<String>>(17)?.as_deref()),
        finish_reason: row.get(18)?,
        settings: opt_string_to_json(row.get::<_, Option<String>>(19)?.as_deref()),
        session_id: row.get(20)?,
        session_name: row.get(21)?,
        user_id: row.get(22)?,
        trace_name: row.get(23)?,
        prompt_name: row.get(24)?,
        props: opt_string_to_json(row.get::<_, Option<String>>(25)?.as_deref()),
        dataset_run_id: row.get(26)?,
        dataset_run_name: row.get(27)?,
        dataset_path: row.get(28)?,
        dataset_item_name: row.get(29)?,
        dataset_expected_output: text_or_json(row.get(30)?),
        metadata: opt_string_to_json(row.get::<_, Option<String>>(36)?.as_deref()),
    };

    Ok(SpanRow {
        trace_id: row.get(0)?,
        id: row.get(1)?,
        parent_id: row.get(2)?,
        name: row.get(3)?,
        span_type: SpanType::from_lenient(Some(&span_type)),
        timestamp: nanos_to_datetime(row.get(5)?),
        end_time: end_time_ns.map(nanos_to_datetime),
        duration: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        status: StatusCode::parse(&status).unwrap_or_default(),
        status_message: row.get(32)?,
        attributes: opt_string_to_json(row.get::<_, Option<String>>(33)?.as_deref()),
        events: opt_string_to_json(row.get::<_, Option<String>>(34)?.as_deref()),
        links: opt_string_to_json(row.get::<_, Option<String>>(35)?.as_deref()),
        data,
    })
}

// --- Requests ---

/// GENERATION spans, newest first
///
/// `output` prefers plain text, then the structured object, then tool calls.
pub fn list_requests(
    conn: &Connection,
    pagination: &Pagination,
) -> Result<Vec<RequestRow>, DuckdbError> {
    let sql = format!(
        r#"
        SELECT
            span_id, trace_id, span_name, model, prompt_name, user_id, status_code, input,
            COALESCE(NULLIF(output, ''), output_object, tool_calls) AS output,
            input_tokens, output_tokens, total_tokens, reasoning_tokens, cost,
            timestamp_ns, duration_ms
        FROM spans
        WHERE span_type = 'GENERATION'
        ORDER BY timestamp_ns DESC, span_id{}
        "#,
        pagination.to_sql()
    );
    execute_rows(conn, &sql, &[], row_to_request)
}

fn row_to_request(row: &Row<'_>) -> Result<RequestRow, DuckdbError> {
    let status: String = row.get(6)?;
    Ok(RequestRow {
        id: row.get(0)?,
        trace_id: row.get(1)?,
        span_name: row.get(2)?,
        model: row.get(3)?,
        prompt_name: row.get(4)?,
        user_id: row.get(5)?,
        status: StatusCode::parse(&status).unwrap_or_default(),
        input: row.get(7)?,
        output: row.get(8)?,
        input_tokens: row.get::<_, Option<i64>>(9)?.unwrap_or(0),
        output_tokens: row.get::<_, Option<i64>>(10)?.unwrap_or(0),
        total_tokens: row.get::<_, Option<i64>>(11)?.unwrap_or(0),
        reasoning_tokens: row.get::<_, Option<i64>>(12)?.unwrap_or(0),
        cost: row.get::<_, Option<f64>>(13)?.unwrap_or(0.0),
        timestamp: nanos_to_datetime(row.get(14)?),
        latency: row.get::<_, Option<i64>>(15)?.unwrap_or(0),
    })
}

// --- Sessions & dataset runs ---

/// One row per non-empty session id, newest first
pub fn list_sessions(conn: &Connection) -> Result<Vec<SessionRow>, DuckdbError> {
    let sql = r#"
        SELECT
            session_id,
            FIRST(session_name ORDER BY timestamp_ns) FILTER (WHERE session_name IS NOT NULL AND session_name <> '') AS name,
            MIN(timestamp_ns) AS start_ns,
            MAX(timestamp_ns) AS end_ns,
            COUNT(DISTINCT trace_id) AS trace_count
        FROM spans
        WHERE session_id IS NOT NULL AND session_id <> ''
        GROUP BY session_id
        ORDER BY start_ns DESC, session_id
    "#;
    execute_rows(conn, sql, &[], |row| {
        Ok(SessionRow {
            id: row.get(0)?,
            name: row.get(1)?,
            start: nanos_to_datetime(row.get(2)?),
            end: nanos_to_datetime(row.get(3)?),
            trace_count: row.get(4)?,
        })
    })
}

/// One row per non-empty dataset run id, newest first
pub fn list_dataset_runs(conn: &Connection) -> Result<Vec<DatasetRunRow>, DuckdbError> {
    let sql = r#"
        SELECT
            dataset_run_id,
            FIRST(dataset_run_name ORDER BY timestamp_ns) FILTER (WHERE dataset_run_name IS NOT NULL AND dataset_run_name <> '') AS name,
            COUNT(DISTINCT trace_id) AS trace_count,
            MIN(timestamp_ns) AS start_ns,
            MAX(timestamp_ns) AS end_ns
        FROM spans
        WHERE dataset_run_id IS NOT NULL AND dataset_run_id <> ''
        GROUP BY dataset_run_id
        ORDER BY start_ns DESC, dataset_run_id
    "#;
    execute_rows(conn, sql, &[], |row| {
        Ok(DatasetRunRow {
            id: row.get(0)?,
            name: row.get(1)?,
            trace_count: row.get(2)?,
            start: nanos_to_datetime(row.get(3)?),
            end: nanos_to_datetime(row.get(4)?),
        })
    })
}

// --- Graph ---

/// Span id, name and raw metadata of one trace in start order
pub fn list_graph_spans(
    conn: &Connection,
    trace_id: &str,
) -> Result<Vec<GraphSpanRow>, DuckdbError> {
    execute_rows(
        conn,
        "SELECT span_id, span_name, metadata FROM spans WHERE trace_id = ? ORDER BY timestamp_ns ASC, span_id",
        &[text(trace_id)],
        |row| {
            Ok(GraphSpanRow {
                span_id: row.get(0)?,
                span_name: row.get(1)?,
                metadata: row.get(2)?,
            })
        },
    )
}

// --- Helper functions ---

fn execute_rows<T, F>(
    conn: &Connection,
    sql: &str,
    bind_values: &[Value],
    map: F,
) -> Result<Vec<T>, DuckdbError>
where
    F: Fn(&Row<'_>) -> Result<T, DuckdbError>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut query_rows = stmt.query(params_from_iter(bind_values.iter()))?;
    let mut rows = vec![];

    while let Some(row) = query_rows.next()? {
        rows.push(map(row)?);
    }

    Ok(rows)
}
