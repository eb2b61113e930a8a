//! Classification enums for stored spans

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Span classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanType {
    #[default]
    Span,
    Generation,
    Event,
}

impl SpanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Span => "SPAN",
            Self::Generation => "GENERATION",
            Self::Event => "EVENT",
        }
    }

    /// Case-insensitive parse. Returns None for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SPAN" => Some(Self::Span),
            "GENERATION" => Some(Self::Generation),
            "EVENT" => Some(Self::Event),
            _ => None,
        }
    }

    /// Lenient conversion used at ingestion: unknown or missing types become `Span`.
    pub fn from_lenient(s: Option<&str>) -> Self {
        s.and_then(Self::parse).unwrap_or_default()
    }
}

/// Normalized span status, stored as "0", "1" or "2".
///
/// Ordering follows severity so a trace rollup is the maximum code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unset => "0",
            Self::Ok => "1",
            Self::Error => "2",
        }
    }

    /// Parse "0"/"1"/"2" or the OTel names UNSET/OK/ERROR (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        match s {
            "0" => return Some(Self::Unset),
            "1" => return Some(Self::Ok),
            "2" => return Some(Self::Error),
            _ => {}
        }
        if s.eq_ignore_ascii_case("unset") || s.eq_ignore_ascii_case("status_code_unset") {
            Some(Self::Unset)
        } else if s.eq_ignore_ascii_case("ok") || s.eq_ignore_ascii_case("status_code_ok") {
            Some(Self::Ok)
        } else if s.eq_ignore_ascii_case("error") || s.eq_ignore_ascii_case("status_code_error")
        {
            Some(Self::Error)
        } else {
            None
        }
    }

    /// Lenient conversion from an arbitrary JSON value; anything unrecognized is `Unset`.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::String(s) => Self::parse(s).unwrap_or_default(),
            JsonValue::Number(n) => match n.as_i64() {
                Some(1) => Self::Ok,
                Some(2) => Self::Error,
                _ => Self::Unset,
            },
            _ => Self::Unset,
        }
    }
}

impl Serialize for StatusCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = JsonValue::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_span_type_parse() {
        assert_eq!(SpanType::parse("generation"), Some(SpanType::Generation));
        assert_eq!(SpanType::parse(" EVENT "), Some(SpanType::Event));
        assert_eq!(SpanType::parse("tool"), None);
        assert_eq!(SpanType::from_lenient(Some("tool")), SpanType::Span);
        assert_eq!(SpanType::from_lenient(None), SpanType::Span);
    }

    #[test]
    fn test_span_type_serde() {
        assert_eq!(
            serde_json::to_value(SpanType::Generation).unwrap(),
            json!("GENERATION")
        );
    }

    #[test]
    fn test_status_code_from_json() {
        assert_eq!(StatusCode::from_json(&json!("2")), StatusCode::Error);
        assert_eq!(StatusCode::from_json(&json!(1)), StatusCode::Ok);
        assert_eq!(StatusCode::from_json(&json!("ERROR")), StatusCode::Error);
        assert_eq!(StatusCode::from_json(&json!("ok")), StatusCode::Ok);
        assert_eq!(StatusCode::from_json(&json!("bogus")), StatusCode::Unset);
        assert_eq!(StatusCode::from_json(&json!(7)), StatusCode::Unset);
        assert_eq!(StatusCode::from_json(&JsonValue::Null), StatusCode::Unset);
    }

    #[test]
    fn test_status_code_ordering() {
        let codes = [StatusCode::Ok, StatusCode::Unset, StatusCode::Error];
        assert_eq!(codes.iter().max(), Some(&StatusCode::Error));
        assert!(StatusCode::Ok > StatusCode::Unset);
    }

    #[test]
    fn test_status_code_serializes_as_digit() {
        assert_eq!(serde_json::to_value(StatusCode::Error).unwrap(), json!("2"));
    }
}
