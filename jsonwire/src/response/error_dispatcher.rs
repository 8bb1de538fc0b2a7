//! Error response dispatch.
//!
//! Every failed response becomes exactly one error value. Parse failures in
//! the error body are absorbed here: they degrade the result to the default
//! error instead of surfacing as a separate failure.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde_json::Value;

use jsonwire_core::{ErrorDetails, JsonObject, JsonUnmarshaller};

use crate::error_parser::{
    ErrorCodeParser, ErrorMessageParser, normalize_error_code, parse_request_id,
};
use crate::registry::ErrorRegistry;

/// What is known about one failed response.
///
/// Built and discarded within a single dispatch.
#[derive(Debug, Clone)]
pub struct ErrorEnvelope {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    document: Option<Value>,
    error_code: Option<String>,
    error_message: Option<String>,
    request_id: Option<String>,
}

impl ErrorEnvelope {
    /// Parse a buffered error response.
    ///
    /// A body that is empty, not JSON, or not a JSON object yields an envelope
    /// with no discriminator code and no message, even when an
    /// `x-amzn-ErrorType` header is present.
    pub fn parse(
        response: http::Response<Bytes>,
        code_parser: &dyn ErrorCodeParser,
        message_parser: &dyn ErrorMessageParser,
    ) -> Self {
        let (head, body) = response.into_parts();
        let request_id = parse_request_id(&head.headers);

        let document = match JsonUnmarshaller.parse(&body) {
            Ok(Some(value @ Value::Object(_))) => Some(value),
            Ok(Some(_)) => {
                tracing::debug!(status = head.status.as_u16(), "error body is not a JSON object");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(
                    status = head.status.as_u16(),
                    error = %e,
                    "unparseable error body"
                );
                None
            }
        };

        let (error_code, error_message) = match document.as_ref().and_then(Value::as_object) {
            Some(object) => (
                code_parser
                    .parse_error_code(&head.headers, Some(object))
                    .map(|code| normalize_error_code(&code).to_string()),
                message_parser.parse_error_message(object),
            ),
            None => (None, None),
        };

        Self {
            status: head.status,
            headers: head.headers,
            body,
            document,
            error_code,
            error_message,
            request_id,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The parsed body, when it was a JSON object.
    pub fn object(&self) -> Option<&JsonObject> {
        self.document.as_ref().and_then(Value::as_object)
    }

    /// The normalized discriminator code.
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Common details, without the error code.
    fn details(&self, service_name: Option<&str>) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.status)
            .with_headers(self.headers.clone())
            .with_raw_body(self.body.clone());
        if let Some(message) = &self.error_message {
            details = details.with_error_message(message.as_str());
        }
        if let Some(request_id) = &self.request_id {
            details = details.with_request_id(request_id.as_str());
        }
        if let Some(service_name) = service_name {
            details = details.with_service_name(service_name);
        }
        details
    }
}

/// Turns failed responses into service errors of type `E`.
///
/// Created by [`ProtocolCodec::create_error_handler`](crate::ProtocolCodec::create_error_handler)
/// and bound to the codec's frozen registry.
pub struct ErrorDispatcher<E> {
    registry: Arc<ErrorRegistry<E>>,
    code_parser: Arc<dyn ErrorCodeParser>,
    message_parser: Arc<dyn ErrorMessageParser>,
    service_name: Option<String>,
}

impl<E> ErrorDispatcher<E> {
    pub(crate) fn new(
        registry: Arc<ErrorRegistry<E>>,
        code_parser: Arc<dyn ErrorCodeParser>,
        message_parser: Arc<dyn ErrorMessageParser>,
    ) -> Self {
        Self {
            registry,
            code_parser,
            message_parser,
            service_name: None,
        }
    }

    /// Label every dispatched error with `service_name`.
    pub fn with_service_name<S: Into<String>>(mut self, service_name: S) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    /// Dispatch a buffered error response. Never fails.
    pub fn dispatch(&self, response: http::Response<Bytes>) -> E {
        let envelope =
            ErrorEnvelope::parse(response, &*self.code_parser, &*self.message_parser);
        self.dispatch_envelope(&envelope)
    }

    /// Dispatch an already parsed envelope.
    ///
    /// A registered code produces the modeled error with every body field
    /// bound. Anything else produces the default error, which carries no
    /// error code.
    pub fn dispatch_envelope(&self, envelope: &ErrorEnvelope) -> E {
        let service_name = self.service_name.as_deref();

        if let Some(code) = envelope.error_code() {
            match self.registry.get(code) {
                Some(factory) => {
                    let mut builder = factory();
                    let bound = match &envelope.document {
                        Some(document) => builder.bind_fields(document, &JsonUnmarshaller),
                        None => Ok(()),
                    };
                    match bound {
                        Ok(()) => {
                            let details = envelope.details(service_name).with_error_code(code);
                            return builder.build(details);
                        }
                        Err(e) => {
                            tracing::debug!(
                                error_code = code,
                                error = %e,
                                "modeled error shape failed to bind, using default error"
                            );
                        }
                    }
                }
                None => {
                    tracing::debug!(
                        error_code = code,
                        status = envelope.status().as_u16(),
                        "unregistered error code, using default error"
                    );
                }
            }
        }

        let builder = (self.registry.default_factory())();
        builder.build(envelope.details(service_name))
    }
}

impl<E> Clone for ErrorDispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            code_parser: self.code_parser.clone(),
            message_parser: self.message_parser.clone(),
            service_name: self.service_name.clone(),
        }
    }
}

impl<E> fmt::Debug for ErrorDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorDispatcher")
            .field("registry", &self.registry)
            .field("service_name", &self.service_name)
            .finish_non_exhaustive()
    }
}
