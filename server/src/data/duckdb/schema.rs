//! DuckDB schema definitions
//!
//! A single `spans` table keyed by `(trace_id, span_id)`. Traces, sessions and
//! dataset runs are derived at query time. Timestamps are nanoseconds since
//! epoch; JSON blobs are VARCHAR and absent values are NULL.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at BIGINT NOT NULL,
    description VARCHAR
);

CREATE TABLE IF NOT EXISTS spans (
    -- IDENTITY
    trace_id                VARCHAR NOT NULL,
    span_id                 VARCHAR NOT NULL,
    parent_span_id          VARCHAR,            -- NULL or dangling = root candidate
    span_name               VARCHAR NOT NULL,
    span_type               VARCHAR NOT NULL,   -- SPAN, GENERATION, EVENT

    -- TIMING
    timestamp_ns            BIGINT NOT NULL,
    end_time_ns             BIGINT,
    duration_ms             BIGINT NOT NULL DEFAULT 0,

    -- LLM
    model                   VARCHAR,
    input_tokens            BIGINT NOT NULL DEFAULT 0,
    output_tokens           BIGINT NOT NULL DEFAULT 0,
    total_tokens            BIGINT NOT NULL DEFAULT 0,
    reasoning_tokens        BIGINT NOT NULL DEFAULT 0,
    cost                    DOUBLE NOT NULL DEFAULT 0,

    -- CONTENT
    input                   VARCHAR,
    output                  VARCHAR,
    output_object           VARCHAR,            -- JSON
    tool_calls              VARCHAR,            -- JSON
    finish_reason           VARCHAR,
    settings                VARCHAR,            -- JSON

    -- CONTEXT
    session_id              VARCHAR,
    session_name            VARCHAR,
    user_id                 VARCHAR,
    trace_name              VARCHAR,
    prompt_name             VARCHAR,
    props                   VARCHAR,            -- JSON
    dataset_run_id          VARCHAR,
    dataset_run_name        VARCHAR,
    dataset_path            VARCHAR,
    dataset_item_name       VARCHAR,
    dataset_expected_output VARCHAR,

    -- STATUS
    status_code             VARCHAR NOT NULL DEFAULT '0',  -- 0 unset, 1 ok, 2 error
    status_message          VARCHAR,

    -- OPAQUE PAYLOAD
    attributes              VARCHAR,            -- JSON object
    events                  VARCHAR,            -- JSON array
    links                   VARCHAR,            -- JSON array
    metadata                VARCHAR,            -- JSON object

    PRIMARY KEY (trace_id, span_id)
);

CREATE INDEX IF NOT EXISTS idx_spans_trace ON spans(trace_id);
CREATE INDEX IF NOT EXISTS idx_spans_session ON spans(session_id);
CREATE INDEX IF NOT EXISTS idx_spans_type_ts ON spans(span_type, timestamp_ns DESC);
CREATE INDEX IF NOT EXISTS idx_spans_dataset_run ON spans(dataset_run_id);
"#;
