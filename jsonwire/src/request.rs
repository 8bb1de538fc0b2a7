//! Request shape contract and marshalling.
//!
//! A request value describes itself to the codec through [`OperationRequest`]:
//! its `Serialize` impl provides the body members, [`bind_locations`] places
//! members in the URI and headers, and [`explicit_payload`] names the single
//! member sent as the whole body when the binding declares one.
//!
//! [`bind_locations`]: OperationRequest::bind_locations
//! [`explicit_payload`]: OperationRequest::explicit_payload

mod marshaller;

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use jsonwire_core::MarshallError;

pub use marshaller::Marshaller;

/// Body produced for an operation with an explicit payload member.
#[derive(Debug, Clone, PartialEq)]
pub enum ExplicitPayload {
    /// A structure member, written as JSON.
    Json(Value),
    /// A blob member, written as raw bytes.
    Blob(Bytes),
}

/// A request value the codec can marshall.
///
/// Members bound to the URI or headers should be `#[serde(skip)]` so they do
/// not also appear in an implicit JSON body.
///
/// ```
/// use jsonwire::{OperationRequest, RequestLocations, MarshallError};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// #[serde(rename_all = "PascalCase")]
/// struct GetThing {
///     #[serde(skip)]
///     thing_id: String,
///     verbose: bool,
/// }
///
/// impl OperationRequest for GetThing {
///     fn bind_locations(&self, locations: &mut RequestLocations) -> Result<(), MarshallError> {
///         locations.label("ThingId", &self.thing_id);
///         Ok(())
///     }
/// }
/// ```
pub trait OperationRequest: Serialize {
    /// Place URI-label, query and header members.
    fn bind_locations(&self, locations: &mut RequestLocations) -> Result<(), MarshallError> {
        let _ = locations;
        Ok(())
    }

    /// The explicit payload member, if present.
    ///
    /// Only consulted when the binding has an explicit payload member. `None`
    /// means the member is absent and the body is left empty.
    fn explicit_payload(&self) -> Result<Option<ExplicitPayload>, MarshallError> {
        Ok(None)
    }
}

/// Non-body request members, collected by [`OperationRequest::bind_locations`].
#[derive(Debug, Clone, Default)]
pub struct RequestLocations {
    labels: HashMap<String, String>,
    query: Vec<(String, String)>,
    headers: HeaderMap,
}

impl RequestLocations {
    /// Bind a `{name}` or `{name+}` path label.
    pub fn label(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.labels.insert(name.into(), value.into());
        self
    }

    /// Append a query parameter. Repeated names are kept in order.
    pub fn query(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a header, replacing any previous value.
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self, MarshallError> {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| MarshallError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| MarshallError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn get_label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// How the request body is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyGenerator {
    /// No body is written.
    NoOp,
    /// A structured JSON writer.
    Json,
}
