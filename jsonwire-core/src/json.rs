//! JSON field binding.
//!
//! [`JsonUnmarshaller`] is the generic entry point result and error builders
//! use to bind a parsed body onto a shape. Shapes are plain `serde` types; the
//! [`epoch_seconds`] and [`blob`] modules adapt the two wire encodings serde
//! does not cover out of the box:
//!
//! ```
//! use bytes::Bytes;
//! use chrono::{DateTime, Utc};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! #[serde(rename_all = "PascalCase")]
//! struct Upload {
//!     #[serde(with = "jsonwire_core::json::epoch_seconds")]
//!     timestamp_member: DateTime<Utc>,
//!     #[serde(with = "jsonwire_core::json::blob")]
//!     blob_member: Bytes,
//! }
//!
//! let upload: Upload =
//!     serde_json::from_str(r#"{"TimestampMember":1398796238.123,"BlobMember":"dGhlcmUh"}"#).unwrap();
//! assert_eq!(upload.timestamp_member.timestamp_millis(), 1398796238123);
//! assert_eq!(upload.blob_member, Bytes::from_static(b"there!"));
//! ```

pub mod blob;
pub mod epoch_seconds;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::UnmarshallError;

/// A JSON object body.
pub type JsonObject = serde_json::Map<String, Value>;

/// Name of a JSON value's type, for error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Generic JSON unmarshaller handed to result and error builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonUnmarshaller;

impl JsonUnmarshaller {
    /// Parse a body. An empty or whitespace-only body yields `None`.
    pub fn parse(&self, body: &[u8]) -> Result<Option<Value>, UnmarshallError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(body)?))
    }

    /// Parse a body that must be a JSON object. An empty body yields `None`.
    pub fn parse_object(&self, body: &[u8]) -> Result<Option<JsonObject>, UnmarshallError> {
        match self.parse(body)? {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map)),
            Some(other) => Err(UnmarshallError::NonObjectBody(value_kind(&other))),
        }
    }

    /// Bind a parsed value onto shape `S`.
    pub fn unmarshall<S: DeserializeOwned>(&self, value: &Value) -> Result<S, UnmarshallError> {
        Ok(S::deserialize(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "PascalCase")]
    struct Simple {
        string_member: String,
        #[serde(default)]
        integer_member: Option<i32>,
    }

    #[test]
    fn test_parse_empty_body() {
        let u = JsonUnmarshaller;
        assert_eq!(u.parse(b"").unwrap(), None);
        assert_eq!(u.parse(b"  \n").unwrap(), None);
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = JsonUnmarshaller.parse(b"THIS ISN'T JSON").unwrap_err();
        assert!(matches!(err, UnmarshallError::Json(_)));
    }

    #[test]
    fn test_parse_object_rejects_array() {
        let err = JsonUnmarshaller.parse_object(b"[1,2]").unwrap_err();
        assert!(matches!(err, UnmarshallError::NonObjectBody("array")));
    }

    #[test]
    fn test_unmarshall_shape() {
        let value = JsonUnmarshaller
            .parse(br#"{"StringMember":"foo","IntegerMember":42,"Unknown":true}"#)
            .unwrap()
            .unwrap();
        let shape: Simple = JsonUnmarshaller.unmarshall(&value).unwrap();
        assert_eq!(
            shape,
            Simple {
                string_member: "foo".into(),
                integer_member: Some(42),
            }
        );
    }

    #[test]
    fn test_unmarshall_type_mismatch() {
        let value = serde_json::json!({ "StringMember": 5 });
        let err = JsonUnmarshaller.unmarshall::<Simple>(&value).unwrap_err();
        assert!(matches!(err, UnmarshallError::Json(_)));
    }
}
