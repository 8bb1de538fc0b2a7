//! Response handling.
//!
//! Successful responses go through a [`ResponseHandler`], which binds them
//! into a result built by a [`ResultBuilder`]. Error responses go through an
//! [`ErrorDispatcher`], which selects a modeled error by discriminator code.

mod error_dispatcher;
mod handler;

use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use jsonwire_core::{JsonUnmarshaller, UnmarshallError, WireBody};

use crate::error_parser::parse_request_id;

pub use error_dispatcher::{ErrorDispatcher, ErrorEnvelope};
pub use handler::ResponseHandler;

/// A result under construction for one successful response.
///
/// The handler calls `bind_head` first, then exactly one of `bind_fields`
/// (structured body) or `bind_payload` (raw body), and finally `build`.
/// Streaming responses only see `bind_head`.
pub trait ResultBuilder<T>: Send {
    /// Bind status and header members.
    fn bind_head(&mut self, head: &http::response::Parts) -> Result<(), UnmarshallError> {
        let _ = head;
        Ok(())
    }

    /// Bind a parsed JSON body. Not called for an empty body.
    fn bind_fields(
        &mut self,
        body: &Value,
        unmarshaller: &JsonUnmarshaller,
    ) -> Result<(), UnmarshallError> {
        let _ = (body, unmarshaller);
        Ok(())
    }

    /// Bind a non-JSON body to the result's payload member.
    fn bind_payload(&mut self, payload: Bytes) -> Result<(), UnmarshallError> {
        Err(UnmarshallError::UnsupportedPayload(format!(
            "{} byte raw payload for a shape without a payload member",
            payload.len()
        )))
    }

    fn build(self: Box<Self>) -> T;
}

/// Creates an empty [`ResultBuilder`] for a response.
///
/// The factory receives the response head before the body is read, so it can
/// choose between result shapes from the status or a header.
pub type ResultFactory<T> =
    Arc<dyn Fn(&http::response::Parts) -> Box<dyn ResultBuilder<T>> + Send + Sync>;

/// [`ResultBuilder`] for a plain `Deserialize + Default` shape.
///
/// Fields absent from the body keep their default values.
pub struct ShapeResult<S> {
    shape: S,
}

impl<S> ShapeResult<S>
where
    S: DeserializeOwned + Default + Send + 'static,
{
    /// Factory producing a fresh `ShapeResult<S>` for every response.
    pub fn factory() -> ResultFactory<S> {
        Arc::new(|_: &http::response::Parts| {
            Box::new(ShapeResult {
                shape: S::default(),
            }) as Box<dyn ResultBuilder<S>>
        })
    }
}

impl<S> ResultBuilder<S> for ShapeResult<S>
where
    S: DeserializeOwned + Send,
{
    fn bind_fields(
        &mut self,
        body: &Value,
        unmarshaller: &JsonUnmarshaller,
    ) -> Result<(), UnmarshallError> {
        self.shape = unmarshaller.unmarshall(body)?;
        Ok(())
    }

    fn build(self: Box<Self>) -> S {
        self.shape
    }
}

/// [`ResultBuilder`] that discards the body and produces `()`.
pub struct EmptyResult;

impl EmptyResult {
    pub fn factory() -> ResultFactory<()> {
        Arc::new(|_: &http::response::Parts| Box::new(EmptyResult) as Box<dyn ResultBuilder<()>>)
    }
}

impl ResultBuilder<()> for EmptyResult {
    fn bind_payload(&mut self, _payload: Bytes) -> Result<(), UnmarshallError> {
        Ok(())
    }

    fn build(self: Box<Self>) {}
}

/// Result of a successful call.
///
/// Contains the unmarshalled result, the response [`Metadata`], and for
/// operations with streaming output the unread response body, which the
/// caller now owns.
#[derive(Debug)]
pub struct WireResponse<T> {
    inner: T,
    metadata: Metadata,
    body: Option<WireBody>,
}

impl<T> WireResponse<T> {
    pub fn new(inner: T, metadata: Metadata) -> Self {
        Self {
            inner,
            metadata,
            body: None,
        }
    }

    pub(crate) fn with_body(mut self, body: WireBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Extract the result, discarding metadata and any body.
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// The streaming output body. `None` for buffered operations.
    pub fn body(&self) -> Option<&WireBody> {
        self.body.as_ref()
    }

    /// Take ownership of the streaming output body.
    pub fn take_body(&mut self) -> Option<WireBody> {
        self.body.take()
    }

    /// Transform the result, preserving metadata and body.
    pub fn map<U, F>(self, f: F) -> WireResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        WireResponse {
            inner: f(self.inner),
            metadata: self.metadata,
            body: self.body,
        }
    }

    /// Split into the result, the metadata and any streaming output body.
    pub fn into_parts(self) -> (T, Metadata, Option<WireBody>) {
        (self.inner, self.metadata, self.body)
    }
}

impl<T> Deref for WireResponse<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Status and headers of a successful response.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    status: StatusCode,
    headers: HeaderMap,
}

impl Metadata {
    pub fn new(status: StatusCode, headers: HeaderMap) -> Self {
        Self { status, headers }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Get a header value by name.
    ///
    /// Returns `None` if the header is not present or is not valid text.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.headers.contains_key(key)
    }

    /// Service-assigned request id, if the response carries one.
    pub fn request_id(&self) -> Option<String> {
        parse_request_id(&self.headers)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}
