//! Turns a request value into an `http::Request<WireBody>`.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use url::form_urlencoded;

use jsonwire_core::{JsonProtocol, MarshallError, OperationBinding, WireBody, json};

use super::{BodyGenerator, ExplicitPayload, OperationRequest, RequestLocations};

/// Header carrying the `Service.Operation` target on RPC-style requests.
pub const TARGET_HEADER: HeaderName = HeaderName::from_static("x-amz-target");

const OCTET_STREAM: &str = "binary/octet-stream";

/// Per-call marshaller created by
/// [`ProtocolCodec::create_marshaller`](crate::ProtocolCodec::create_marshaller).
///
/// Borrows the binding and the request; marshalling never mutates either.
#[derive(Debug)]
pub struct Marshaller<'a, T> {
    binding: &'a OperationBinding,
    request: &'a T,
    generator: BodyGenerator,
    protocol: JsonProtocol,
    content_type: &'a str,
}

impl<'a, T: OperationRequest> Marshaller<'a, T> {
    pub(crate) fn new(
        binding: &'a OperationBinding,
        request: &'a T,
        protocol: JsonProtocol,
        content_type: &'a str,
    ) -> Self {
        let generator = if binding.has_payload_members() || protocol.always_sends_body() {
            BodyGenerator::Json
        } else {
            BodyGenerator::NoOp
        };
        Self {
            binding,
            request,
            generator,
            protocol,
            content_type,
        }
    }

    /// The body generator selected for this call.
    pub fn generator(&self) -> BodyGenerator {
        self.generator
    }

    /// Marshall a request whose body comes from the request value.
    ///
    /// # Errors
    ///
    /// Fails with [`MarshallError::StreamingBodyRequired`] for operations with
    /// streaming input; use [`marshall_with_body`](Self::marshall_with_body).
    pub fn marshall(self) -> Result<http::Request<WireBody>, MarshallError> {
        if self.binding.has_streaming_input() {
            return Err(MarshallError::StreamingBodyRequired);
        }
        let (mut headers, uri) = self.head()?;
        let body = self.generate_body(&mut headers)?;
        self.finish(headers, uri, body)
    }

    /// Marshall a streaming-input request, sending `body` untouched.
    pub fn marshall_with_body(
        self,
        body: WireBody,
    ) -> Result<http::Request<WireBody>, MarshallError> {
        if !self.binding.has_streaming_input() {
            return Err(MarshallError::UnexpectedStreamingBody);
        }
        let (mut headers, uri) = self.head()?;
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
        }
        self.finish(headers, uri, body)
    }

    fn head(&self) -> Result<(HeaderMap, String), MarshallError> {
        let mut locations = RequestLocations::default();
        self.request.bind_locations(&mut locations)?;

        let uri = build_uri(self.binding.request_path(), &locations)?;
        let mut headers = locations.headers;

        if self.protocol == JsonProtocol::AwsJson {
            if let Some(target) = self.binding.operation_identifier() {
                let value =
                    HeaderValue::from_str(target).map_err(|e| MarshallError::InvalidHeader {
                        name: TARGET_HEADER.to_string(),
                        reason: e.to_string(),
                    })?;
                headers.insert(TARGET_HEADER, value);
            }
        }

        Ok((headers, uri))
    }

    fn generate_body(&self, headers: &mut HeaderMap) -> Result<WireBody, MarshallError> {
        let (bytes, content_type) = match self.generator {
            BodyGenerator::NoOp => return Ok(WireBody::empty()),
            BodyGenerator::Json if self.binding.has_explicit_payload_member() => {
                match self.request.explicit_payload()? {
                    None => return Ok(WireBody::empty()),
                    Some(ExplicitPayload::Json(value)) => {
                        (Bytes::from(serde_json::to_vec(&value)?), self.content_type)
                    }
                    Some(ExplicitPayload::Blob(data)) => (data, OCTET_STREAM),
                }
            }
            BodyGenerator::Json if self.binding.has_payload_members() => {
                (implicit_payload(self.request)?, self.content_type)
            }
            // Protocols that always send a body get an empty object.
            BodyGenerator::Json => (Bytes::from_static(b"{}"), self.content_type),
        };

        if !headers.contains_key(CONTENT_TYPE) {
            let value = HeaderValue::from_str(content_type).map_err(|e| {
                MarshallError::InvalidHeader {
                    name: CONTENT_TYPE.to_string(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(CONTENT_TYPE, value);
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        Ok(WireBody::full(bytes))
    }

    fn finish(
        &self,
        headers: HeaderMap,
        uri: String,
        body: WireBody,
    ) -> Result<http::Request<WireBody>, MarshallError> {
        let mut request = http::Request::builder()
            .method(self.binding.http_method().clone())
            .uri(uri)
            .body(body)?;
        request.headers_mut().extend(headers);
        Ok(request)
    }
}

fn implicit_payload<T: OperationRequest>(request: &T) -> Result<Bytes, MarshallError> {
    match serde_json::to_value(request)? {
        value @ Value::Object(_) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
        Value::Null => Ok(Bytes::from_static(b"{}")),
        other => Err(MarshallError::NonObjectPayload(json::value_kind(&other))),
    }
}

/// Expand `{Label}` / `{Label+}` placeholders and append query parameters.
fn build_uri(template: &str, locations: &RequestLocations) -> Result<String, MarshallError> {
    let mut uri = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        uri.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after
            .find('}')
            .ok_or_else(|| MarshallError::MissingLabel(after.to_string()))?;
        let placeholder = &after[..end];
        let (name, greedy) = match placeholder.strip_suffix('+') {
            Some(name) => (name, true),
            None => (placeholder, false),
        };

        let value = locations
            .get_label(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MarshallError::MissingLabel(name.to_string()))?;
        if greedy {
            let encoded: Vec<String> = value.split('/').map(percent_encode).collect();
            uri.push_str(&encoded.join("/"));
        } else {
            uri.push_str(&percent_encode(value));
        }

        rest = &after[end + 1..];
    }
    uri.push_str(rest);

    let params = locations.query_params();
    if !params.is_empty() {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        if !uri.contains('?') {
            uri.push('?');
        } else if !uri.ends_with('?') && !uri.ends_with('&') {
            uri.push('&');
        }
        uri.push_str(&query);
    }

    Ok(uri)
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn percent_encode(value: &str) -> String {
    // form encoding leaves '*' bare, escapes '~', and writes spaces as '+'
    // (a literal '+' is already %2B)
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace('*', "%2A")
        .replace("%7E", "~")
}
