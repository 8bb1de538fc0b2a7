//! Error types for binding, marshalling and unmarshalling, plus the service
//! error family produced by error dispatch.

use std::fmt;
use std::ops::Deref;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// Rejected [`OperationBinding`](crate::OperationBinding) flags.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    #[error("explicit payload member declared without payload members")]
    ExplicitPayloadWithoutMembers,

    #[error("streaming input requires an explicit payload member")]
    StreamingInputWithoutPayload,

    #[error("request path must start with '/': {0:?}")]
    InvalidRequestPath(String),

    #[error("unbalanced label braces in request path: {0:?}")]
    UnbalancedLabel(String),
}

/// Failure while turning a request value into an HTTP request.
#[derive(Clone, Debug, thiserror::Error)]
pub enum MarshallError {
    #[error("json encode error: {0}")]
    Json(String),

    #[error("implicit payload must serialize to a JSON object, got {0}")]
    NonObjectPayload(&'static str),

    #[error("no value bound for path label {0:?}")]
    MissingLabel(String),

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("operation has streaming input but no request body was supplied")]
    StreamingBodyRequired,

    #[error("request body supplied for an operation without streaming input")]
    UnexpectedStreamingBody,

    #[error("http request error: {0}")]
    Http(String),
}

impl From<serde_json::Error> for MarshallError {
    fn from(err: serde_json::Error) -> Self {
        MarshallError::Json(err.to_string())
    }
}

impl From<http::Error> for MarshallError {
    fn from(err: http::Error) -> Self {
        MarshallError::Http(err.to_string())
    }
}

/// Failure while reading a response into a result or error value.
#[derive(Clone, Debug, thiserror::Error)]
pub enum UnmarshallError {
    #[error("json decode error: {0}")]
    Json(String),

    #[error("response body must be a JSON object, got {0}")]
    NonObjectBody(&'static str),

    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("response body is a stream but the operation expects a buffered payload")]
    UnbufferedBody,

    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),
}

impl From<serde_json::Error> for UnmarshallError {
    fn from(err: serde_json::Error) -> Self {
        UnmarshallError::Json(err.to_string())
    }
}

/// Failure while reading a body stream.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("body error: {0}")]
pub struct BodyError(String);

impl BodyError {
    pub fn new<S: Into<String>>(message: S) -> Self {
        BodyError(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Common fields populated on every dispatched service error.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorDetails {
    status: StatusCode,
    headers: HeaderMap,
    raw_body: Bytes,
    error_code: Option<String>,
    error_message: Option<String>,
    request_id: Option<String>,
    service_name: Option<String>,
}

impl ErrorDetails {
    /// Details for a response with the given status and nothing else known.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_raw_body(mut self, body: Bytes) -> Self {
        self.raw_body = body;
        self
    }

    pub fn with_error_code<S: Into<String>>(mut self, code: S) -> Self {
        self.error_code = Some(code.into());
        self
    }

    pub fn with_error_message<S: Into<String>>(mut self, message: S) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_request_id<S: Into<String>>(mut self, request_id: S) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_service_name<S: Into<String>>(mut self, service_name: S) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// HTTP status of the failed response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers, untouched.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body bytes, untouched. Empty when the response had no body.
    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }

    /// Discriminator that selected a modeled error. `None` for the default error.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (service: {}, status code: {}, error code: {}, request id: {})",
            self.error_message.as_deref().unwrap_or("service error"),
            self.service_name.as_deref().unwrap_or("unknown"),
            self.status.as_u16(),
            self.error_code.as_deref().unwrap_or("none"),
            self.request_id.as_deref().unwrap_or("none"),
        )
    }
}

/// A service-originated error.
///
/// Every error produced by a codec's error dispatcher implements this trait,
/// so callers can read the common fields without knowing the concrete error.
pub trait ServiceException: std::error::Error {
    fn details(&self) -> &ErrorDetails;

    fn status(&self) -> StatusCode {
        self.details().status()
    }

    fn error_code(&self) -> Option<&str> {
        self.details().error_code()
    }

    fn error_message(&self) -> Option<&str> {
        self.details().error_message()
    }

    fn request_id(&self) -> Option<&str> {
        self.details().request_id()
    }

    fn service_name(&self) -> Option<&str> {
        self.details().service_name()
    }
}

/// The service's base error, used when no modeled error matches.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceError {
    details: ErrorDetails,
}

impl ServiceError {
    pub fn new(details: ErrorDetails) -> Self {
        Self { details }
    }

    pub fn into_details(self) -> ErrorDetails {
        self.details
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.details.fmt(f)
    }
}

impl std::error::Error for ServiceError {}

impl ServiceException for ServiceError {
    fn details(&self) -> &ErrorDetails {
        &self.details
    }
}

/// A modeled error: its member shape `S` plus the common error details.
///
/// Dereferences to the shape so modeled members read like plain fields.
#[derive(Clone, Debug, PartialEq)]
pub struct ModeledError<S> {
    shape: S,
    details: ErrorDetails,
}

impl<S> ModeledError<S> {
    pub fn new(shape: S, details: ErrorDetails) -> Self {
        Self { shape, details }
    }

    pub fn shape(&self) -> &S {
        &self.shape
    }

    pub fn into_parts(self) -> (S, ErrorDetails) {
        (self.shape, self.details)
    }
}

impl<S> Deref for ModeledError<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.shape
    }
}

impl<S> fmt::Display for ModeledError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.details.fmt(f)
    }
}

impl<S: fmt::Debug> std::error::Error for ModeledError<S> {}

impl<S: fmt::Debug> ServiceException for ModeledError<S> {
    fn details(&self) -> &ErrorDetails {
        &self.details
    }
}
