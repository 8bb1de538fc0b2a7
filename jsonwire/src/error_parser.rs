//! Error code and message extraction.
//!
//! The error dispatcher asks an [`ErrorCodeParser`] for the discriminator code
//! and an [`ErrorMessageParser`] for the human-readable message. Both are
//! strategies chosen when the codec is built.

use std::borrow::Cow;

use http::HeaderMap;
use serde_json::Value;

use jsonwire_core::JsonObject;

/// Header carrying the error type on JSON protocols.
pub const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// Body field carrying the error type unless overridden.
pub const DEFAULT_ERROR_CODE_FIELD: &str = "__type";

/// Request id headers, tried in order.
pub const REQUEST_ID_HEADERS: [&str; 2] = ["x-amzn-requestid", "x-amz-request-id"];

/// Extracts the raw discriminator code from an error response.
///
/// Returned codes are not yet normalized; see [`normalize_error_code`].
pub trait ErrorCodeParser: Send + Sync + 'static {
    fn parse_error_code(&self, headers: &HeaderMap, body: Option<&JsonObject>) -> Option<String>;
}

/// Reads the error type header first and falls back to a body field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonErrorCodeParser {
    field: Cow<'static, str>,
}

impl JsonErrorCodeParser {
    /// Parser reading the body field `field` instead of `__type`.
    pub fn with_field<S: Into<Cow<'static, str>>>(field: S) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }
}

impl Default for JsonErrorCodeParser {
    fn default() -> Self {
        Self::with_field(DEFAULT_ERROR_CODE_FIELD)
    }
}

impl ErrorCodeParser for JsonErrorCodeParser {
    fn parse_error_code(&self, headers: &HeaderMap, body: Option<&JsonObject>) -> Option<String> {
        let from_header = headers
            .get(ERROR_TYPE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(':').next().unwrap_or(v).trim())
            .filter(|v| !v.is_empty());
        if let Some(code) = from_header {
            return Some(code.to_string());
        }

        match body?.get(self.field.as_ref())? {
            Value::String(code) if !code.is_empty() => Some(code.clone()),
            _ => None,
        }
    }
}

/// Strip a namespace prefix: only the part after the last `#` is matched
/// against registered codes.
///
/// ```
/// use jsonwire::normalize_error_code;
///
/// assert_eq!(normalize_error_code("com.example#FooException"), "FooException");
/// assert_eq!(normalize_error_code("FooException"), "FooException");
/// ```
pub fn normalize_error_code(raw: &str) -> &str {
    match raw.rfind('#') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    }
}

/// Extracts the human-readable message from a parsed error body.
///
/// Any closure of the form `Fn(&JsonObject) -> Option<String>` is a parser.
pub trait ErrorMessageParser: Send + Sync + 'static {
    fn parse_error_message(&self, body: &JsonObject) -> Option<String>;
}

impl<F> ErrorMessageParser for F
where
    F: Fn(&JsonObject) -> Option<String> + Send + Sync + 'static,
{
    fn parse_error_message(&self, body: &JsonObject) -> Option<String> {
        self(body)
    }
}

/// Tries an ordered list of field names and returns the first string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMessageParser {
    fields: Vec<Cow<'static, str>>,
}

impl FieldMessageParser {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.as_ref())
    }
}

impl Default for FieldMessageParser {
    /// `message`, then `Message`, then `errorMessage`.
    fn default() -> Self {
        Self::new(["message", "Message", "errorMessage"])
    }
}

impl ErrorMessageParser for FieldMessageParser {
    fn parse_error_message(&self, body: &JsonObject) -> Option<String> {
        self.fields
            .iter()
            .find_map(|field| body.get(field.as_ref()).and_then(Value::as_str))
            .map(str::to_string)
    }
}

/// First request id header present on the response.
pub fn parse_request_id(headers: &HeaderMap) -> Option<String> {
    REQUEST_ID_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}
