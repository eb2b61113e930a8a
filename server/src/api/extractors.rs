//! Path and validation extractors for API routes

use std::ops::Deref;

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::core::constants::MAX_ID_LENGTH;

/// Validate generic ID length (trace_id, span_id, session_id, run_id)
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LENGTH
}

#[derive(Debug, Deserialize)]
struct TracePathRaw {
    trace_id: String,
}

/// Validated `{trace_id}` path extractor
#[derive(Debug)]
pub struct TracePath {
    pub trace_id: String,
}

impl<S> FromRequestParts<S> for TracePath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<TracePathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_id(&raw.trace_id) {
            return Err(ValidationRejection::InvalidId("trace_id"));
        }

        Ok(Self {
            trace_id: raw.trace_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SpanPathRaw {
    trace_id: String,
    span_id: String,
}

/// Validated `{trace_id}/spans/{span_id}` path extractor
#[derive(Debug)]
pub struct SpanPath {
    pub trace_id: String,
    pub span_id: String,
}

impl<S> FromRequestParts<S> for SpanPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<SpanPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_id(&raw.trace_id) {
            return Err(ValidationRejection::InvalidId("trace_id"));
        }
        if !is_valid_id(&raw.span_id) {
            return Err(ValidationRejection::InvalidId("span_id"));
        }

        Ok(Self {
            trace_id: raw.trace_id,
            span_id: raw.span_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SessionPathRaw {
    session_id: String,
}

/// Validated `{session_id}` path extractor
#[derive(Debug)]
pub struct SessionPath {
    pub session_id: String,
}

impl<S> FromRequestParts<S> for SessionPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<SessionPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_id(&raw.session_id) {
            return Err(ValidationRejection::InvalidId("session_id"));
        }

        Ok(Self {
            session_id: raw.session_id,
        })
    }
}

#[derive(Debug, Deserialize)]
struct DatasetRunPathRaw {
    run_id: String,
}

/// Validated `{run_id}` path extractor
#[derive(Debug)]
pub struct DatasetRunPath {
    pub run_id: String,
}

impl<S> FromRequestParts<S> for DatasetRunPath
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<DatasetRunPathRaw>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_id(&raw.run_id) {
            return Err(ValidationRejection::InvalidId("run_id"));
        }

        Ok(Self { run_id: raw.run_id })
    }
}

/// Validation rejection with structured error response
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Empty or over-long id path segment
    InvalidId(&'static str),
    /// Failed to parse query string
    Query(QueryRejection),
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        let (code, message) = match self {
            Self::Path(rejection) => ("PATH_PARSE_ERROR".to_string(), rejection.body_text()),
            Self::InvalidId(name) => (
                format!("INVALID_{}", name.to_ascii_uppercase()),
                format!("Invalid {}: must be 1-{} characters", name, MAX_ID_LENGTH),
            ),
            Self::Query(rejection) => ("QUERY_PARSE_ERROR".to_string(), rejection.body_text()),
            Self::Validation(errors) => (
                "VALIDATION_ERROR".to_string(),
                format_validation_errors(&errors),
            ),
        };
        (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "bad_request",
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Query extractor with automatic validation.
///
/// Deserializes query parameters and validates them using the `validator` crate.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T> Deref for ValidatedQuery<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Query)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}
