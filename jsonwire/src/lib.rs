//! Metadata-driven JSON wire-protocol codec.
//!
//! A [`ProtocolCodec`] turns request values into HTTP requests according to
//! per-operation [`OperationBinding`] metadata, and turns responses back into
//! results or into one of many modeled service errors selected by a
//! discriminator code observed at runtime.
//!
//! ## Lifecycle
//!
//! A [`CodecBuilder`] collects configuration (protocol, content type, modeled
//! error registrations) and is consumed by [`CodecBuilder::build`]. The
//! resulting codec is immutable, cheap to clone and safe to share between
//! any number of in-flight calls.
//!
//! ## Example
//!
//! ```ignore
//! use jsonwire::{CodecBuilder, ModeledError, OperationBinding, ServiceError};
//!
//! #[derive(Debug)]
//! enum ThingsError {
//!     NotFound(ModeledError<NotFoundShape>),
//!     Service(ServiceError),
//! }
//!
//! let codec = CodecBuilder::new()
//!     .protocol_version("1.1")
//!     .register_modeled("ResourceNotFoundException", ThingsError::NotFound)
//!     .default_error(ThingsError::Service)
//!     .build()?;
//!
//! let binding = OperationBinding::builder("/")
//!     .operation_identifier("Things.GetThing")
//!     .has_payload_members(true)
//!     .service_name("Things")
//!     .build()?;
//!
//! let response = codec
//!     .execute(&transport, &binding, &request, ShapeResult::<GetThingOutput>::factory())
//!     .await?;
//! ```
//!
//! ## Modules
//!
//! - [`builder`]: Mutable codec configuration
//! - [`codec`]: Frozen codec and call glue
//! - [`request`]: Request shape contract and marshaller
//! - [`response`]: Result handling and error dispatch
//! - [`registry`]: Modeled error registry
//! - [`error_parser`]: Error code and message extraction strategies

pub mod builder;
pub mod codec;
pub mod error;
pub mod error_parser;
pub mod registry;
pub mod request;
pub mod response;
pub mod transport;

pub use builder::{CodecBuildError, CodecBuilder};
pub use codec::ProtocolCodec;
pub use error::CallError;
pub use error_parser::{
    ErrorCodeParser, ErrorMessageParser, FieldMessageParser, JsonErrorCodeParser,
    normalize_error_code,
};
pub use registry::{ErrorBuilder, ErrorFactory, ErrorRegistry};
pub use request::{
    BodyGenerator, ExplicitPayload, Marshaller, OperationRequest, RequestLocations,
};
pub use response::{
    EmptyResult, ErrorDispatcher, ErrorEnvelope, Metadata, ResponseHandler, ResultBuilder,
    ResultFactory, ShapeResult, WireResponse,
};
pub use transport::Transport;

// Re-export core types
pub use jsonwire_core::{
    BindingError, BodyError, ContentTypeResolver, ErrorDetails, JsonObject, JsonProtocol,
    JsonUnmarshaller, MarshallError, Method, ModeledError, OperationBinding,
    OperationBindingBuilder, PrefixContentTypeResolver, ProtocolMetadata, ServiceError,
    ServiceException, UnmarshallError, WireBody, json,
};
