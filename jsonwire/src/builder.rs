//! Codec configuration.
//!
//! Provides a fluent API for configuring and building a [`ProtocolCodec`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use serde::de::DeserializeOwned;

use jsonwire_core::{
    ContentTypeResolver, JsonProtocol, ModeledError, PrefixContentTypeResolver, ProtocolMetadata,
    ServiceError,
};

use crate::codec::ProtocolCodec;
use crate::error_parser::{
    DEFAULT_ERROR_CODE_FIELD, ErrorCodeParser, ErrorMessageParser, FieldMessageParser,
    JsonErrorCodeParser,
};
use crate::registry::{ErrorFactory, ErrorRegistry, service_error_factory, shape_factory};

/// Protocol version used when none is configured.
pub const DEFAULT_PROTOCOL_VERSION: &str = "1.0";

/// Errors that can occur when building a [`ProtocolCodec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecBuildError {
    /// No default error factory was configured.
    #[error("a default error factory is required")]
    MissingDefaultErrorFactory,

    /// The custom error code field name is empty.
    #[error("custom error code field name must not be empty")]
    EmptyErrorCodeField,

    /// The protocol version is empty.
    #[error("protocol version must not be empty")]
    EmptyProtocolVersion,

    /// The error status threshold is not a client or server error status.
    #[error("error status threshold must be at least 300, got {0}")]
    InvalidErrorThreshold(u16),
}

/// Builder for a [`ProtocolCodec`] producing service errors of type `E`.
///
/// # Example
///
/// ```
/// use jsonwire::{CodecBuilder, ModeledError, ServiceError};
/// use serde::Deserialize;
///
/// #[derive(Debug, Default, Deserialize)]
/// #[serde(default)]
/// struct ThrottledShape {
///     #[serde(rename = "RetryAfterSeconds")]
///     retry_after_seconds: Option<u32>,
/// }
///
/// #[derive(Debug)]
/// enum ThingsError {
///     Throttled(ModeledError<ThrottledShape>),
///     Service(ServiceError),
/// }
///
/// let codec = CodecBuilder::new()
///     .protocol_version("1.1")
///     .register_modeled("ThrottlingException", ThingsError::Throttled)
///     .default_error(ThingsError::Service)
///     .build()
///     .unwrap();
///
/// assert_eq!(codec.content_type(), "application/x-amz-json-1.1");
/// ```
pub struct CodecBuilder<E> {
    protocol: JsonProtocol,
    protocol_version: Cow<'static, str>,
    content_type_resolver: Arc<dyn ContentTypeResolver>,
    modeled: HashMap<String, ErrorFactory<E>>,
    default_factory: Option<ErrorFactory<E>>,
    custom_error_code_field: Option<String>,
    message_parser: Arc<dyn ErrorMessageParser>,
    error_status_threshold: u16,
}

impl<E: 'static> CodecBuilder<E> {
    /// Create a builder with the defaults: RPC-style JSON, version `1.0`,
    /// `application/x-amz-json-` content type prefix, errors from status 300.
    pub fn new() -> Self {
        Self {
            protocol: JsonProtocol::default(),
            protocol_version: Cow::Borrowed(DEFAULT_PROTOCOL_VERSION),
            content_type_resolver: Arc::new(PrefixContentTypeResolver::AWS_JSON),
            modeled: HashMap::new(),
            default_factory: None,
            custom_error_code_field: None,
            message_parser: Arc::new(FieldMessageParser::default()),
            error_status_threshold: 300,
        }
    }

    pub fn protocol(mut self, protocol: JsonProtocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn protocol_version<V: Into<Cow<'static, str>>>(mut self, version: V) -> Self {
        self.protocol_version = version.into();
        self
    }

    /// Replace the content-type resolution strategy.
    pub fn content_type_resolver<R: ContentTypeResolver>(mut self, resolver: R) -> Self {
        self.content_type_resolver = Arc::new(resolver);
        self
    }

    /// Register an error builder factory for a discriminator code.
    ///
    /// Codes are matched case-sensitively. Registering the same code again
    /// replaces the earlier registration.
    pub fn register_error<F>(mut self, code: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn crate::ErrorBuilder<E>> + Send + Sync + 'static,
    {
        self.modeled.insert(code.into(), Arc::new(factory));
        self
    }

    /// Register a modeled shape `S` for a discriminator code.
    ///
    /// `wrap` lifts the bound [`ModeledError<S>`] into `E`, typically an enum
    /// variant constructor. Shape fields absent from the body keep their
    /// `Default` values, so shapes are usually `#[serde(default)]`.
    pub fn register_modeled<S, F>(mut self, code: impl Into<String>, wrap: F) -> Self
    where
        S: DeserializeOwned + Default + Send + 'static,
        F: Fn(ModeledError<S>) -> E + Send + Sync + 'static,
    {
        self.modeled.insert(code.into(), shape_factory(wrap));
        self
    }

    /// Set the factory for the default error, used when no code matches.
    pub fn default_error_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn crate::ErrorBuilder<E>> + Send + Sync + 'static,
    {
        self.default_factory = Some(Arc::new(factory));
        self
    }

    /// Use the base [`ServiceError`], lifted into `E` by `wrap`, as the default error.
    pub fn default_error<F>(mut self, wrap: F) -> Self
    where
        F: Fn(ServiceError) -> E + Send + Sync + 'static,
    {
        self.default_factory = Some(service_error_factory(wrap));
        self
    }

    /// Read the discriminator from `field` instead of `__type`.
    pub fn custom_error_code_field(mut self, field: impl Into<String>) -> Self {
        self.custom_error_code_field = Some(field.into());
        self
    }

    /// Replace the error message strategy.
    pub fn message_parser<P: ErrorMessageParser>(mut self, parser: P) -> Self {
        self.message_parser = Arc::new(parser);
        self
    }

    /// Lowest status treated as an error. Defaults to 300.
    pub fn error_status_threshold(mut self, status: u16) -> Self {
        self.error_status_threshold = status;
        self
    }

    /// Number of modeled registrations so far.
    pub fn registered_error_count(&self) -> usize {
        self.modeled.len()
    }

    /// Validate the configuration and freeze it into a codec.
    pub fn build(self) -> Result<ProtocolCodec<E>, CodecBuildError> {
        let default_factory = self
            .default_factory
            .ok_or(CodecBuildError::MissingDefaultErrorFactory)?;

        if self.protocol_version.trim().is_empty() {
            return Err(CodecBuildError::EmptyProtocolVersion);
        }

        let code_parser: Arc<dyn ErrorCodeParser> = match self.custom_error_code_field {
            Some(field) if field.trim().is_empty() => {
                return Err(CodecBuildError::EmptyErrorCodeField);
            }
            Some(field) => Arc::new(JsonErrorCodeParser::with_field(field)),
            None => Arc::new(JsonErrorCodeParser::with_field(DEFAULT_ERROR_CODE_FIELD)),
        };

        let error_threshold = StatusCode::from_u16(self.error_status_threshold)
            .ok()
            .filter(|s| s.as_u16() >= 300)
            .ok_or(CodecBuildError::InvalidErrorThreshold(
                self.error_status_threshold,
            ))?;

        let metadata = ProtocolMetadata::new(self.protocol, self.protocol_version);
        let content_type = self.content_type_resolver.resolve_content_type(&metadata);

        Ok(ProtocolCodec::new(
            metadata,
            content_type,
            ErrorRegistry::new(self.modeled, default_factory),
            code_parser,
            self.message_parser,
            error_threshold,
        ))
    }
}

impl<E: 'static> Default for CodecBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for CodecBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecBuilder")
            .field("protocol", &self.protocol)
            .field("protocol_version", &self.protocol_version)
            .field("modeled_count", &self.modeled.len())
            .field("default_factory", &self.default_factory.is_some())
            .field("custom_error_code_field", &self.custom_error_code_field)
            .field("error_status_threshold", &self.error_status_threshold)
            .finish()
    }
}
