//! The frozen codec and the call glue.

use std::fmt;
use std::sync::Arc;

use http::StatusCode;
use http_body_util::BodyExt;
use tracing::{Instrument, info_span};

use jsonwire_core::{OperationBinding, ProtocolMetadata, WireBody};

use crate::builder::CodecBuilder;
use crate::error::CallError;
use crate::error_parser::{ErrorCodeParser, ErrorMessageParser};
use crate::registry::ErrorRegistry;
use crate::request::{Marshaller, OperationRequest};
use crate::response::{ErrorDispatcher, ResponseHandler, ResultFactory, WireResponse};
use crate::transport::Transport;

/// An immutable, shareable codec for one service.
///
/// Cloning is cheap; all clones share the same frozen configuration and
/// error registry. Every call creates its own marshaller, handler and
/// dispatcher, so no state is shared between in-flight calls.
pub struct ProtocolCodec<E> {
    inner: Arc<CodecInner<E>>,
}

struct CodecInner<E> {
    metadata: ProtocolMetadata,
    content_type: String,
    registry: Arc<ErrorRegistry<E>>,
    code_parser: Arc<dyn ErrorCodeParser>,
    message_parser: Arc<dyn ErrorMessageParser>,
    error_threshold: StatusCode,
}

impl<E: 'static> ProtocolCodec<E> {
    /// Start configuring a codec.
    pub fn builder() -> CodecBuilder<E> {
        CodecBuilder::new()
    }
}

impl<E> ProtocolCodec<E> {
    pub(crate) fn new(
        metadata: ProtocolMetadata,
        content_type: String,
        registry: ErrorRegistry<E>,
        code_parser: Arc<dyn ErrorCodeParser>,
        message_parser: Arc<dyn ErrorMessageParser>,
        error_threshold: StatusCode,
    ) -> Self {
        Self {
            inner: Arc::new(CodecInner {
                metadata,
                content_type,
                registry: Arc::new(registry),
                code_parser,
                message_parser,
                error_threshold,
            }),
        }
    }

    /// Request content type, resolved once at build time.
    pub fn content_type(&self) -> &str {
        &self.inner.content_type
    }

    pub fn protocol_metadata(&self) -> &ProtocolMetadata {
        &self.inner.metadata
    }

    pub fn registry(&self) -> &ErrorRegistry<E> {
        &self.inner.registry
    }

    /// Whether a response with `status` goes to the error dispatcher.
    pub fn is_error_status(&self, status: StatusCode) -> bool {
        status >= self.inner.error_threshold
    }

    /// Create a marshaller for one request.
    ///
    /// Operations without payload members get a no-op body generator unless
    /// the protocol always sends a body.
    pub fn create_marshaller<'a, T: OperationRequest>(
        &'a self,
        binding: &'a OperationBinding,
        request: &'a T,
    ) -> Marshaller<'a, T> {
        Marshaller::new(
            binding,
            request,
            self.inner.metadata.protocol(),
            &self.inner.content_type,
        )
    }

    /// Create a handler for successful responses.
    ///
    /// With `has_streaming_output` the body is passed through unread. Otherwise
    /// it is parsed as JSON (`is_payload_json`) or handed over as raw bytes.
    pub fn create_response_handler<T>(
        &self,
        has_streaming_output: bool,
        is_payload_json: bool,
        factory: ResultFactory<T>,
    ) -> ResponseHandler<T> {
        ResponseHandler::new(has_streaming_output, is_payload_json, factory)
    }

    /// Create an error dispatcher bound to the frozen registry.
    pub fn create_error_handler(&self) -> ErrorDispatcher<E> {
        ErrorDispatcher::new(
            self.inner.registry.clone(),
            self.inner.code_parser.clone(),
            self.inner.message_parser.clone(),
        )
    }

    /// Marshall `request`, send it, and unmarshall the response.
    ///
    /// Error responses are dispatched to a service error `E`. Success bodies
    /// are read fully unless the binding has streaming output, in which case
    /// the body is returned unread in the [`WireResponse`]. A buffered body is
    /// parsed as JSON or handed over raw according to
    /// [`OperationBinding::is_payload_json`].
    pub async fn execute<Tr, Req, Res>(
        &self,
        transport: &Tr,
        binding: &OperationBinding,
        request: &Req,
        factory: ResultFactory<Res>,
    ) -> Result<WireResponse<Res>, CallError<E>>
    where
        Tr: Transport,
        Req: OperationRequest,
    {
        async {
            let http_request = self
                .create_marshaller(binding, request)
                .marshall()
                .inspect_err(|e| tracing::debug!(error = %e, "request marshalling failed"))?;
            self.send(transport, binding, http_request, factory).await
        }
        .instrument(call_span(binding))
        .await
    }

    /// Like [`execute`](Self::execute), for operations with streaming input.
    pub async fn execute_with_body<Tr, Req, Res>(
        &self,
        transport: &Tr,
        binding: &OperationBinding,
        request: &Req,
        body: WireBody,
        factory: ResultFactory<Res>,
    ) -> Result<WireResponse<Res>, CallError<E>>
    where
        Tr: Transport,
        Req: OperationRequest,
    {
        async {
            let http_request = self
                .create_marshaller(binding, request)
                .marshall_with_body(body)
                .inspect_err(|e| tracing::debug!(error = %e, "request marshalling failed"))?;
            self.send(transport, binding, http_request, factory).await
        }
        .instrument(call_span(binding))
        .await
    }

    async fn send<Tr, Res>(
        &self,
        transport: &Tr,
        binding: &OperationBinding,
        request: http::Request<WireBody>,
        factory: ResultFactory<Res>,
    ) -> Result<WireResponse<Res>, CallError<E>>
    where
        Tr: Transport,
    {
        let response = transport
            .send(request)
            .await
            .map_err(CallError::transport)?;

        if self.is_error_status(response.status()) {
            let (head, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();
            tracing::debug!(
                status = head.status.as_u16(),
                body_len = body.len(),
                "error response"
            );

            let mut dispatcher = self.create_error_handler();
            if !binding.service_name().is_empty() {
                dispatcher = dispatcher.with_service_name(binding.service_name());
            }
            let error = dispatcher.dispatch(http::Response::from_parts(head, body));
            return Err(CallError::Service(error));
        }

        let streaming = binding.has_streaming_output();
        let response = if streaming {
            response
        } else {
            let (head, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();
            http::Response::from_parts(head, WireBody::full(body))
        };

        let handler =
            self.create_response_handler(streaming, binding.is_payload_json(), factory);
        Ok(handler.handle(response)?)
    }
}

fn call_span(binding: &OperationBinding) -> tracing::Span {
    info_span!(
        "jsonwire.call",
        rpc.service = %binding.service_name(),
        rpc.operation = binding.operation_identifier().unwrap_or_default(),
        http.method = %binding.http_method(),
        http.path = %binding.request_path(),
        otel.kind = "client",
    )
}

impl<E> Clone for ProtocolCodec<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E> fmt::Debug for ProtocolCodec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolCodec")
            .field("metadata", &self.inner.metadata)
            .field("content_type", &self.inner.content_type)
            .field("registry", &self.inner.registry)
            .field("error_threshold", &self.inner.error_threshold)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use jsonwire_core::{
        JsonProtocol, MarshallError, ModeledError, ServiceError, ServiceException, UnmarshallError,
    };
    use serde::{Deserialize, Serialize};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::registry::LookupSpan;

    use super::*;
    use crate::response::{ResultBuilder, ShapeResult};

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, rename_all = "PascalCase")]
    struct LimitShape {
        limit: Option<u32>,
    }

    #[derive(Debug)]
    enum TestError {
        Limit(ModeledError<LimitShape>),
        Service(ServiceError),
    }

    #[derive(Serialize)]
    #[serde(rename_all = "PascalCase")]
    struct GetThing {
        id: String,
    }

    impl OperationRequest for GetThing {}

    #[derive(Serialize)]
    struct Empty {}

    impl OperationRequest for Empty {}

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default, rename_all = "PascalCase")]
    struct Thing {
        id: String,
        size: u64,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    /// Replies with a canned response and records the request it saw.
    struct Canned {
        status: u16,
        body: &'static str,
        seen: Mutex<Option<(http::request::Parts, Bytes)>>,
    }

    impl Canned {
        fn new(status: u16, body: &'static str) -> Self {
            Self {
                status,
                body,
                seen: Mutex::new(None),
            }
        }
    }

    impl Transport for Canned {
        type Error = Refused;

        async fn send(
            &self,
            request: http::Request<WireBody>,
        ) -> Result<http::Response<WireBody>, Refused> {
            let (parts, body) = request.into_parts();
            let body = body.collect().await.unwrap().to_bytes();
            *self.seen.lock().unwrap() = Some((parts, body));
            Ok(http::Response::builder()
                .status(self.status)
                .header("x-amzn-requestid", "req-9")
                .body(WireBody::full(self.body))
                .unwrap())
        }
    }

    struct Down;

    impl Transport for Down {
        type Error = Refused;

        async fn send(
            &self,
            _request: http::Request<WireBody>,
        ) -> Result<http::Response<WireBody>, Refused> {
            Err(Refused)
        }
    }

    fn codec() -> ProtocolCodec<TestError> {
        ProtocolCodec::builder()
            .protocol_version("1.1")
            .register_modeled("LimitExceededException", TestError::Limit)
            .default_error(TestError::Service)
            .build()
            .unwrap()
    }

    fn binding() -> OperationBinding {
        OperationBinding::builder("/")
            .operation_identifier("Things.GetThing")
            .has_payload_members(true)
            .service_name("Things")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_execute_success() {
        let transport = Canned::new(200, r#"{"Id":"t-1","Size":7}"#);
        let response = codec()
            .execute(
                &transport,
                &binding(),
                &GetThing { id: "t-1".into() },
                ShapeResult::<Thing>::factory(),
            )
            .await
            .unwrap();

        assert_eq!(response.id, "t-1");
        assert_eq!(response.size, 7);
        assert_eq!(response.metadata().request_id().as_deref(), Some("req-9"));

        let (parts, body) = transport.seen.lock().unwrap().take().unwrap();
        assert_eq!(parts.method, http::Method::POST);
        assert_eq!(parts.headers["x-amz-target"], "Things.GetThing");
        assert_eq!(parts.headers["content-type"], "application/x-amz-json-1.1");
        assert_eq!(body, Bytes::from_static(br#"{"Id":"t-1"}"#));
    }

    #[tokio::test]
    async fn test_execute_modeled_error() {
        let transport = Canned::new(
            400,
            r#"{"__type":"LimitExceededException","Limit":10,"message":"too many"}"#,
        );
        let err = codec()
            .execute(
                &transport,
                &binding(),
                &GetThing { id: "t-1".into() },
                ShapeResult::<Thing>::factory(),
            )
            .await
            .unwrap_err();

        let Some(TestError::Limit(limit)) = err.into_service_error() else {
            panic!("expected LimitExceededException");
        };
        assert_eq!(limit.limit, Some(10));
        assert_eq!(limit.error_message(), Some("too many"));
        assert_eq!(limit.request_id(), Some("req-9"));
        assert_eq!(limit.service_name(), Some("Things"));
    }

    #[tokio::test]
    async fn test_execute_transport_error() {
        let err = codec()
            .execute(
                &Down,
                &binding(),
                &GetThing { id: "t-1".into() },
                ShapeResult::<Thing>::factory(),
            )
            .await
            .unwrap_err();
        let CallError::Transport(source) = err else {
            panic!("expected transport error");
        };
        assert_eq!(source.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_execute_marshall_error_skips_transport() {
        let streaming = OperationBinding::builder("/upload")
            .has_payload_members(true)
            .has_explicit_payload_member(true)
            .has_streaming_input(true)
            .build()
            .unwrap();
        let transport = Canned::new(200, "{}");
        let err = codec()
            .execute(
                &transport,
                &streaming,
                &GetThing { id: "t-1".into() },
                ShapeResult::<Thing>::factory(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CallError::Marshall(MarshallError::StreamingBodyRequired)
        ));
        assert!(transport.seen.lock().unwrap().is_none());
    }

    /// Result holding the raw response payload.
    #[derive(Default)]
    struct RawPayload {
        status: u16,
        data: Bytes,
    }

    impl ResultBuilder<(u16, Bytes)> for RawPayload {
        fn bind_head(&mut self, head: &http::response::Parts) -> Result<(), UnmarshallError> {
            self.status = head.status.as_u16();
            Ok(())
        }

        fn bind_payload(&mut self, payload: Bytes) -> Result<(), UnmarshallError> {
            self.data = payload;
            Ok(())
        }

        fn build(self: Box<Self>) -> (u16, Bytes) {
            (self.status, self.data)
        }
    }

    #[tokio::test]
    async fn test_execute_raw_payload() {
        let codec = ProtocolCodec::<TestError>::builder()
            .protocol(JsonProtocol::RestJson)
            .default_error(TestError::Service)
            .build()
            .unwrap();
        let binding = OperationBinding::builder("/blob")
            .http_method(http::Method::GET)
            .is_payload_json(false)
            .build()
            .unwrap();
        let factory: ResultFactory<(u16, Bytes)> = Arc::new(|_: &http::response::Parts| {
            Box::new(RawPayload::default()) as Box<dyn ResultBuilder<(u16, Bytes)>>
        });

        let transport = Canned::new(200, "raw bytes");
        let response = codec
            .execute(&transport, &binding, &Empty {}, factory)
            .await
            .unwrap();

        assert_eq!(
            response.into_inner(),
            (200, Bytes::from_static(b"raw bytes"))
        );
        let (parts, body) = transport.seen.lock().unwrap().take().unwrap();
        assert_eq!(parts.method, http::Method::GET);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_json_payload_rejects_raw_body() {
        let transport = Canned::new(200, "raw bytes");
        let err = codec()
            .execute(
                &transport,
                &binding(),
                &GetThing { id: "t-1".into() },
                ShapeResult::<Thing>::factory(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Unmarshall(UnmarshallError::Json(_))));
    }

    /// Records the name of the span each event was emitted in.
    #[derive(Clone, Default)]
    struct EventSpans(Arc<Mutex<Vec<(String, Option<String>)>>>);

    impl<S> Layer<S> for EventSpans
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
            let span = ctx.event_span(event).map(|s| s.name().to_string());
            let target = event.metadata().target().to_string();
            self.0.lock().unwrap().push((target, span));
        }
    }

    #[tokio::test]
    async fn test_marshall_failure_logged_inside_call_span() {
        let spans = EventSpans::default();
        let _guard = tracing::subscriber::set_default(
            tracing_subscriber::registry().with(spans.clone()),
        );

        let streaming = OperationBinding::builder("/upload")
            .has_payload_members(true)
            .has_explicit_payload_member(true)
            .has_streaming_input(true)
            .build()
            .unwrap();
        let err = codec()
            .execute(
                &Canned::new(200, "{}"),
                &streaming,
                &GetThing { id: "t-1".into() },
                ShapeResult::<Thing>::factory(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::Marshall(_)));

        let events = spans.0.lock().unwrap();
        let ours: Vec<_> = events
            .iter()
            .filter(|(target, _)| target.starts_with("jsonwire"))
            .collect();
        assert!(!ours.is_empty());
        assert!(
            ours.iter()
                .all(|(_, span)| span.as_deref() == Some("jsonwire.call"))
        );
    }

    #[test]
    fn test_codec_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<ProtocolCodec<TestError>>();
    }
}
