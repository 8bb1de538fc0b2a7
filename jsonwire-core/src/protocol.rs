//! Protocol family, version and content-type resolution.

use std::borrow::Cow;

/// Wire protocol family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum JsonProtocol {
    /// RPC-style JSON. Every request carries a JSON body, even an empty `{}`.
    #[default]
    AwsJson,
    /// REST-style JSON. Members are bound to the path, query, headers and body.
    RestJson,
}

impl JsonProtocol {
    /// Whether a JSON body is written even when the operation has no payload members.
    pub fn always_sends_body(self) -> bool {
        matches!(self, JsonProtocol::AwsJson)
    }
}

/// The protocol parameters a content type is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMetadata {
    protocol: JsonProtocol,
    protocol_version: Cow<'static, str>,
}

impl ProtocolMetadata {
    pub fn new<V: Into<Cow<'static, str>>>(protocol: JsonProtocol, protocol_version: V) -> Self {
        Self {
            protocol,
            protocol_version: protocol_version.into(),
        }
    }

    pub fn protocol(&self) -> JsonProtocol {
        self.protocol
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }
}

/// Produces the request `Content-Type` for a protocol and version.
///
/// A codec resolves its content type once, at build time. Any closure of the
/// form `Fn(&ProtocolMetadata) -> String` can be used as a resolver.
pub trait ContentTypeResolver: Send + Sync + 'static {
    fn resolve_content_type(&self, metadata: &ProtocolMetadata) -> String;
}

impl<F> ContentTypeResolver for F
where
    F: Fn(&ProtocolMetadata) -> String + Send + Sync + 'static,
{
    fn resolve_content_type(&self, metadata: &ProtocolMetadata) -> String {
        self(metadata)
    }
}

/// Resolver that appends the protocol version to a fixed prefix.
///
/// ```
/// use jsonwire_core::{ContentTypeResolver, JsonProtocol, PrefixContentTypeResolver, ProtocolMetadata};
///
/// let metadata = ProtocolMetadata::new(JsonProtocol::AwsJson, "1.1");
/// assert_eq!(
///     PrefixContentTypeResolver::AWS_JSON.resolve_content_type(&metadata),
///     "application/x-amz-json-1.1"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixContentTypeResolver {
    prefix: Cow<'static, str>,
}

impl PrefixContentTypeResolver {
    /// `application/x-amz-json-<version>`
    pub const AWS_JSON: Self = Self::from_static("application/x-amz-json-");
    /// `application/x-amz-cbor-<version>`
    pub const AWS_CBOR: Self = Self::from_static("application/x-amz-cbor-");

    pub const fn from_static(prefix: &'static str) -> Self {
        Self {
            prefix: Cow::Borrowed(prefix),
        }
    }

    pub fn new<P: Into<Cow<'static, str>>>(prefix: P) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixContentTypeResolver {
    fn default() -> Self {
        Self::AWS_JSON
    }
}

impl ContentTypeResolver for PrefixContentTypeResolver {
    fn resolve_content_type(&self, metadata: &ProtocolMetadata) -> String {
        format!("{}{}", self.prefix, metadata.protocol_version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_json_resolver() {
        let metadata = ProtocolMetadata::new(JsonProtocol::AwsJson, "1.0");
        assert_eq!(
            PrefixContentTypeResolver::AWS_JSON.resolve_content_type(&metadata),
            "application/x-amz-json-1.0"
        );
    }

    #[test]
    fn test_cbor_resolver() {
        let metadata = ProtocolMetadata::new(JsonProtocol::AwsJson, "1.1");
        assert_eq!(
            PrefixContentTypeResolver::AWS_CBOR.resolve_content_type(&metadata),
            "application/x-amz-cbor-1.1"
        );
    }

    #[test]
    fn test_closure_resolver() {
        let resolver = |m: &ProtocolMetadata| match m.protocol() {
            JsonProtocol::RestJson => "application/json".to_string(),
            JsonProtocol::AwsJson => format!("application/x-amz-json-{}", m.protocol_version()),
        };
        let metadata = ProtocolMetadata::new(JsonProtocol::RestJson, "1.1");
        assert_eq!(resolver.resolve_content_type(&metadata), "application/json");
    }

    #[test]
    fn test_always_sends_body() {
        assert!(JsonProtocol::AwsJson.always_sends_body());
        assert!(!JsonProtocol::RestJson.always_sends_body());
        assert_eq!(JsonProtocol::default(), JsonProtocol::AwsJson);
    }
}
