//! Shared API types
//!
//! Error mapping and the lenient query-string parsers used by list endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::data::DataError;
use crate::data::types::Pagination;
use crate::domain::traces::IngestError;

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_data(e: DataError) -> Self {
        tracing::error!(error = %e, "Data error");
        Self::internal("Database operation failed")
    }

    pub fn from_ingest(e: IngestError) -> Self {
        match e {
            IngestError::Pricing(e) => {
                tracing::error!(error = %e, "Pricing snapshot failed");
                Self::internal("Pricing table unavailable")
            }
            IngestError::Data(e) => Self::from_data(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Pagination from raw `limit`/`offset` strings.
///
/// Anything that is not a non-negative integer is ignored.
pub fn lenient_pagination(limit: Option<&str>, offset: Option<&str>) -> Pagination {
    let parse = |s: Option<&str>| s.and_then(|v| v.trim().parse::<u64>().ok());
    Pagination::new(parse(limit), parse(offset))
}

/// Parse an optional numeric filter, rejecting malformed values
pub fn parse_number_param<T: std::str::FromStr>(
    name: &str,
    value: Option<&str>,
) -> Result<Option<T>, ApiError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
            ApiError::bad_request(
                "INVALID_PARAMETER",
                format!("Invalid value for {}: {}", name, raw),
            )
        }),
    }
}

/// Empty strings are treated as absent filters
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lenient_pagination() {
        assert_eq!(
            lenient_pagination(Some("2"), Some("4")),
            Pagination::new(Some(2), Some(4))
        );
        assert_eq!(
            lenient_pagination(Some("-1"), Some("abc")),
            Pagination::default()
        );
        assert_eq!(
            lenient_pagination(Some("1.5"), Some(" 3 ")),
            Pagination::new(None, Some(3))
        );
        assert_eq!(lenient_pagination(None, None), Pagination::default());
    }

    #[test]
    fn test_parse_number_param() {
        assert_eq!(parse_number_param::<f64>("latencyGt", Some("12.5")).unwrap(), Some(12.5));
        assert_eq!(parse_number_param::<i64>("minDuration", Some("")).unwrap(), None);
        assert_eq!(parse_number_param::<i64>("minDuration", None).unwrap(), None);
        assert!(matches!(
            parse_number_param::<f64>("latencyGt", Some("fast")),
            Err(ApiError::BadRequest { .. })
        ));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some("x".to_string())), Some("x".to_string()));
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::bad_request("X", "y").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::not_found("X", "y").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from_data(DataError::Closed).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
