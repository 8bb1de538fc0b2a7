//! Operation binding metadata.
//!
//! An [`OperationBinding`] is the static description of one operation's wire
//! shape: where the request goes, which HTTP method it uses, and whether the
//! request and response bodies are structured or opaque byte streams.
//!
//! Bindings are created once at process start and are read-only afterwards.
//! They can only be obtained through [`OperationBindingBuilder::build`], which
//! rejects conflicting flags, so every binding a codec sees is valid.

use std::borrow::Cow;

pub use http::Method;

use crate::error::BindingError;

/// Immutable descriptor of one operation's wire shape.
///
/// # Example
///
/// ```
/// use jsonwire_core::{Method, OperationBinding};
///
/// let binding = OperationBinding::builder("/2016-03-11/streamingInputOperation")
///     .http_method(Method::POST)
///     .has_explicit_payload_member(true)
///     .has_payload_members(true)
///     .service_name("JsonProtocolTests")
///     .has_streaming_input(true)
///     .build()
///     .unwrap();
///
/// assert!(binding.has_streaming_input());
/// assert_eq!(binding.service_name(), "JsonProtocolTests");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationBinding {
    request_path: Cow<'static, str>,
    http_method: Method,
    has_explicit_payload_member: bool,
    has_payload_members: bool,
    service_name: Cow<'static, str>,
    operation_identifier: Option<Cow<'static, str>>,
    has_streaming_input: bool,
    has_streaming_output: bool,
    is_payload_json: bool,
}

impl OperationBinding {
    /// Start describing an operation whose requests go to `request_path`.
    ///
    /// The path may contain `{Label}` and greedy `{Label+}` placeholders and
    /// an initial query string (e.g. `/?Action=Describe`).
    pub fn builder<P: Into<Cow<'static, str>>>(request_path: P) -> OperationBindingBuilder {
        OperationBindingBuilder::new(request_path)
    }

    /// The request path template.
    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    /// The HTTP method.
    pub fn http_method(&self) -> &Method {
        &self.http_method
    }

    /// True when exactly one member is the full body.
    pub fn has_explicit_payload_member(&self) -> bool {
        self.has_explicit_payload_member
    }

    /// False means the body is empty regardless of the payload member flag.
    pub fn has_payload_members(&self) -> bool {
        self.has_payload_members
    }

    /// Name used to label errors raised by this operation.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// `Service.Operation` target sent by RPC-style protocols.
    pub fn operation_identifier(&self) -> Option<&str> {
        self.operation_identifier.as_deref()
    }

    /// The request body is an opaque byte stream.
    pub fn has_streaming_input(&self) -> bool {
        self.has_streaming_input
    }

    /// The response body is an opaque byte stream.
    pub fn has_streaming_output(&self) -> bool {
        self.has_streaming_output
    }

    /// Whether a successful response body is a JSON document rather than a
    /// raw payload.
    pub fn is_payload_json(&self) -> bool {
        self.is_payload_json
    }
}

/// Builder for [`OperationBinding`].
#[derive(Debug, Clone)]
pub struct OperationBindingBuilder {
    request_path: Cow<'static, str>,
    http_method: Method,
    has_explicit_payload_member: bool,
    has_payload_members: bool,
    service_name: Cow<'static, str>,
    operation_identifier: Option<Cow<'static, str>>,
    has_streaming_input: bool,
    has_streaming_output: bool,
    is_payload_json: bool,
}

impl OperationBindingBuilder {
    fn new<P: Into<Cow<'static, str>>>(request_path: P) -> Self {
        Self {
            request_path: request_path.into(),
            http_method: Method::POST,
            has_explicit_payload_member: false,
            has_payload_members: false,
            service_name: Cow::Borrowed(""),
            operation_identifier: None,
            has_streaming_input: false,
            has_streaming_output: false,
            is_payload_json: true,
        }
    }

    /// Set the HTTP method. Defaults to `POST`.
    pub fn http_method(mut self, method: Method) -> Self {
        self.http_method = method;
        self
    }

    /// Mark a single member as the full request body.
    pub fn has_explicit_payload_member(mut self, value: bool) -> Self {
        self.has_explicit_payload_member = value;
        self
    }

    /// Declare that the request has members bound to the body.
    pub fn has_payload_members(mut self, value: bool) -> Self {
        self.has_payload_members = value;
        self
    }

    /// Set the service name used to label errors.
    pub fn service_name<S: Into<Cow<'static, str>>>(mut self, name: S) -> Self {
        self.service_name = name.into();
        self
    }

    /// Set the `Service.Operation` target for RPC-style protocols.
    pub fn operation_identifier<S: Into<Cow<'static, str>>>(mut self, identifier: S) -> Self {
        self.operation_identifier = Some(identifier.into());
        self
    }

    /// Declare a streaming request body.
    pub fn has_streaming_input(mut self, value: bool) -> Self {
        self.has_streaming_input = value;
        self
    }

    /// Declare a streaming response body.
    pub fn has_streaming_output(mut self, value: bool) -> Self {
        self.has_streaming_output = value;
        self
    }

    /// Declare whether the success body is JSON. Defaults to `true`; set to
    /// `false` when the response payload is a raw blob.
    pub fn is_payload_json(mut self, value: bool) -> Self {
        self.is_payload_json = value;
        self
    }

    /// Validate the flags and freeze the binding.
    ///
    /// # Errors
    ///
    /// Returns a [`BindingError`] when:
    /// - an explicit payload member is declared without payload members
    /// - a streaming input is declared without an explicit payload member
    /// - the request path does not start with `/` or has unbalanced braces
    pub fn build(self) -> Result<OperationBinding, BindingError> {
        if self.has_explicit_payload_member && !self.has_payload_members {
            return Err(BindingError::ExplicitPayloadWithoutMembers);
        }
        if self.has_streaming_input && !self.has_explicit_payload_member {
            return Err(BindingError::StreamingInputWithoutPayload);
        }
        validate_request_path(&self.request_path)?;

        Ok(OperationBinding {
            request_path: self.request_path,
            http_method: self.http_method,
            has_explicit_payload_member: self.has_explicit_payload_member,
            has_payload_members: self.has_payload_members,
            service_name: self.service_name,
            operation_identifier: self.operation_identifier,
            has_streaming_input: self.has_streaming_input,
            has_streaming_output: self.has_streaming_output,
            is_payload_json: self.is_payload_json,
        })
    }
}

fn validate_request_path(path: &str) -> Result<(), BindingError> {
    if !path.starts_with('/') {
        return Err(BindingError::InvalidRequestPath(path.to_string()));
    }

    let mut open = false;
    for c in path.chars() {
        match c {
            '{' if open => return Err(BindingError::UnbalancedLabel(path.to_string())),
            '{' => open = true,
            '}' if !open => return Err(BindingError::UnbalancedLabel(path.to_string())),
            '}' => open = false,
            _ => {}
        }
    }
    if open {
        return Err(BindingError::UnbalancedLabel(path.to_string()));
    }

    Ok(())
}
