//! Datagram decoding.
//!
//! A datagram payload is one JSON object: a `table` field naming the target
//! plus arbitrary additional scalar fields for the column values. Anything
//! else — non-object payloads, a missing or non-string `table`, nested
//! arrays or objects — is a malformed payload and goes to the error-row
//! path with the raw text preserved for postmortem.

use serde_json::Value as JsonValue;

use crate::error::{Result, SiphonError};

/// The reserved key naming the target table inside a payload.
pub const TABLE_KEY: &str = "table";

/// A scalar column value decoded from a datagram.
///
/// Values pass through to the persistence layer as-is; no coercion happens
/// at decode time.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// JSON integer.
    Integer(i64),
    /// JSON float.
    Real(f64),
    /// JSON string.
    Text(String),
    /// JSON boolean.
    Bool(bool),
    /// JSON null.
    Null,
}

impl FieldValue {
    fn from_json(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => Some(Self::Null),
            JsonValue::Bool(b) => Some(Self::Bool(b)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Integer(i))
                } else {
                    n.as_f64().map(Self::Real)
                }
            }
            JsonValue::String(s) => Some(Self::Text(s)),
            JsonValue::Array(_) | JsonValue::Object(_) => None,
        }
    }
}

/// One decoded unit of input work, derived from a single datagram.
///
/// Transient: created per datagram, discarded after processing. Field order
/// follows the payload's own key order as parsed.
#[derive(Debug, Clone)]
pub struct Record {
    /// Declared target table name, exactly as sent.
    pub table: String,
    /// Column name/value pairs (everything except the `table` key).
    pub fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Decode a raw datagram payload into a [`Record`].
    ///
    /// # Errors
    /// Returns [`SiphonError::Malformed`] if the payload is not a flat JSON
    /// object with a string `table` field and scalar values.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let value: JsonValue = serde_json::from_slice(payload)
            .map_err(|e| SiphonError::Malformed(format!("invalid JSON: {e}")))?;

        let JsonValue::Object(map) = value else {
            return Err(SiphonError::Malformed(
                "payload is not a JSON object".to_string(),
            ));
        };

        let mut table = None;
        let mut fields = Vec::with_capacity(map.len().saturating_sub(1));
        for (key, value) in map {
            if key == TABLE_KEY {
                match value {
                    JsonValue::String(name) => table = Some(name),
                    other => {
                        return Err(SiphonError::Malformed(format!(
                            "'{TABLE_KEY}' field must be a string, got {other}"
                        )));
                    }
                }
            } else {
                let Some(scalar) = FieldValue::from_json(value) else {
                    return Err(SiphonError::Malformed(format!(
                        "field '{key}' is not a scalar value"
                    )));
                };
                fields.push((key, scalar));
            }
        }

        let Some(table) = table else {
            return Err(SiphonError::Malformed(format!(
                "payload has no '{TABLE_KEY}' field"
            )));
        };
        if table.is_empty() {
            return Err(SiphonError::Malformed(format!(
                "'{TABLE_KEY}' field is empty"
            )));
        }

        Ok(Self { table, fields })
    }
}

/// Raw payload bytes rendered as text for the error-row `payload` column.
///
/// Invalid UTF-8 is replaced rather than rejected; the error row must be
/// writable for any input.
#[must_use]
pub fn payload_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_object() {
        let record = Record::parse(br#"{"table": "widgets", "name": "foo", "count": 3}"#)
            .expect("parse");
        assert_eq!(record.table, "widgets");
        assert_eq!(record.fields.len(), 2);
        assert!(record
            .fields
            .contains(&("name".to_string(), FieldValue::Text("foo".to_string()))));
        assert!(record
            .fields
            .contains(&("count".to_string(), FieldValue::Integer(3))));
    }

    #[test]
    fn preserves_scalar_kinds() {
        let record = Record::parse(
            br#"{"table": "t", "f": 1.5, "b": true, "n": null, "i": -7}"#,
        )
        .expect("parse");
        let lookup = |name: &str| {
            record
                .fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .expect("field present")
        };
        assert_eq!(lookup("f"), FieldValue::Real(1.5));
        assert_eq!(lookup("b"), FieldValue::Bool(true));
        assert_eq!(lookup("n"), FieldValue::Null);
        assert_eq!(lookup("i"), FieldValue::Integer(-7));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = Record::parse(b"not json at all").expect_err("reject");
        assert_eq!(err.class(), "malformed_payload");
    }

    #[test]
    fn rejects_non_object() {
        assert!(Record::parse(b"[1, 2, 3]").is_err());
        assert!(Record::parse(b"42").is_err());
        assert!(Record::parse(br#""just a string""#).is_err());
    }

    #[test]
    fn rejects_missing_table() {
        let err = Record::parse(br#"{"name": "foo"}"#).expect_err("reject");
        assert!(err.to_string().contains("table"));
    }

    #[test]
    fn rejects_non_string_table() {
        assert!(Record::parse(br#"{"table": 7, "x": 1}"#).is_err());
        assert!(Record::parse(br#"{"table": null}"#).is_err());
    }

    #[test]
    fn rejects_nested_values() {
        assert!(Record::parse(br#"{"table": "t", "x": [1]}"#).is_err());
        assert!(Record::parse(br#"{"table": "t", "x": {"y": 1}}"#).is_err());
    }

    #[test]
    fn payload_text_survives_invalid_utf8() {
        let text = payload_text(&[0xff, 0xfe, b'{']);
        assert!(text.contains('{'));
    }
}
