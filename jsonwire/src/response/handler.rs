use std::fmt;

use jsonwire_core::{JsonUnmarshaller, UnmarshallError, WireBody};

use super::{Metadata, ResultFactory, WireResponse};

/// Per-call handler for successful responses.
///
/// Created by [`ProtocolCodec::create_response_handler`](crate::ProtocolCodec::create_response_handler).
pub struct ResponseHandler<T> {
    streaming_output: bool,
    payload_json: bool,
    factory: ResultFactory<T>,
    unmarshaller: JsonUnmarshaller,
}

impl<T> ResponseHandler<T> {
    pub(crate) fn new(
        streaming_output: bool,
        payload_json: bool,
        factory: ResultFactory<T>,
    ) -> Self {
        Self {
            streaming_output,
            payload_json,
            factory,
            unmarshaller: JsonUnmarshaller,
        }
    }

    pub fn is_streaming_output(&self) -> bool {
        self.streaming_output
    }

    pub fn is_payload_json(&self) -> bool {
        self.payload_json
    }

    /// Unmarshall a successful response.
    ///
    /// With streaming output the body is never polled: it is returned in the
    /// [`WireResponse`] for the caller to consume. Otherwise the body must
    /// already be buffered ([`WireBody::Full`] or [`WireBody::Empty`]).
    pub fn handle(
        &self,
        response: http::Response<WireBody>,
    ) -> Result<WireResponse<T>, UnmarshallError> {
        let (head, body) = response.into_parts();
        let mut builder = (self.factory)(&head);
        builder.bind_head(&head)?;

        if self.streaming_output {
            let metadata = Metadata::new(head.status, head.headers);
            return Ok(WireResponse::new(builder.build(), metadata).with_body(body));
        }

        let bytes = body
            .try_into_bytes()
            .map_err(|_| UnmarshallError::UnbufferedBody)?;

        if self.payload_json {
            if let Some(value) = self.unmarshaller.parse(&bytes)? {
                builder.bind_fields(&value, &self.unmarshaller)?;
            }
        } else if !bytes.is_empty() {
            builder.bind_payload(bytes)?;
        }

        Ok(WireResponse::new(
            builder.build(),
            Metadata::new(head.status, head.headers),
        ))
    }
}

impl<T> Clone for ResponseHandler<T> {
    fn clone(&self) -> Self {
        Self {
            streaming_output: self.streaming_output,
            payload_json: self.payload_json,
            factory: self.factory.clone(),
            unmarshaller: self.unmarshaller,
        }
    }
}

impl<T> fmt::Debug for ResponseHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("streaming_output", &self.streaming_output)
            .field("payload_json", &self.payload_json)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use futures::StreamExt;
    use http::StatusCode;
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use serde_json::Value;

    use super::*;
    use crate::response::{EmptyResult, ResultBuilder, ShapeResult};

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default, rename_all = "PascalCase")]
    struct Output {
        name: String,
        size: u64,
    }

    fn response(body: WireBody) -> http::Response<WireBody> {
        http::Response::builder()
            .status(StatusCode::OK)
            .header("x-amzn-requestid", "req-1")
            .body(body)
            .unwrap()
    }

    #[test]
    fn test_structured_body() {
        let handler = ResponseHandler::new(false, true, ShapeResult::<Output>::factory());
        let result = handler
            .handle(response(WireBody::full(r#"{"Name":"lamp","Size":3}"#)))
            .unwrap();

        assert_eq!(result.name, "lamp");
        assert_eq!(result.size, 3);
        assert_eq!(result.metadata().request_id().as_deref(), Some("req-1"));
        assert!(result.body().is_none());
    }

    #[test]
    fn test_empty_body_keeps_defaults() {
        let handler = ResponseHandler::new(false, true, ShapeResult::<Output>::factory());
        let result = handler.handle(response(WireBody::empty())).unwrap();
        assert_eq!(result.into_inner(), Output::default());
    }

    #[test]
    fn test_malformed_success_body() {
        let handler = ResponseHandler::new(false, true, ShapeResult::<Output>::factory());
        let err = handler
            .handle(response(WireBody::full("THIS ISN'T JSON")))
            .unwrap_err();
        assert!(matches!(err, UnmarshallError::Json(_)));
    }

    #[tokio::test]
    async fn test_streaming_output_is_not_read() {
        let polled = Arc::new(AtomicUsize::new(0));
        let counter = polled.clone();
        let stream = futures::stream::iter(vec![Bytes::from_static(b"there!")]).map(move |b| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(b)
        });

        let handler = ResponseHandler::new(true, false, EmptyResult::factory());
        let mut result = handler
            .handle(response(WireBody::streaming(stream)))
            .unwrap();
        assert_eq!(polled.load(Ordering::SeqCst), 0);

        let body = result.take_body().unwrap();
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected, Bytes::from_static(b"there!"));
        assert_eq!(polled.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unbuffered_body_rejected() {
        let handler = ResponseHandler::new(false, true, ShapeResult::<Output>::factory());
        let err = handler
            .handle(response(WireBody::streaming(futures::stream::empty())))
            .unwrap_err();
        assert!(matches!(err, UnmarshallError::UnbufferedBody));
    }

    struct Blob(Bytes);

    impl ResultBuilder<Bytes> for Blob {
        fn bind_payload(&mut self, payload: Bytes) -> Result<(), UnmarshallError> {
            self.0 = payload;
            Ok(())
        }

        fn build(self: Box<Self>) -> Bytes {
            self.0
        }
    }

    #[test]
    fn test_raw_payload() {
        let factory: crate::ResultFactory<Bytes> = Arc::new(|_: &http::response::Parts| {
            Box::new(Blob(Bytes::new())) as Box<dyn ResultBuilder<Bytes>>
        });
        let handler = ResponseHandler::new(false, false, factory);
        let result = handler.handle(response(WireBody::full("raw bytes"))).unwrap();
        assert_eq!(result.into_inner(), Bytes::from_static(b"raw bytes"));
    }

    #[derive(Debug, PartialEq)]
    enum Event {
        Created(Value),
        Deleted,
    }

    struct EventBuilder {
        kind: String,
        body: Value,
    }

    impl ResultBuilder<Event> for EventBuilder {
        fn bind_fields(
            &mut self,
            body: &Value,
            _unmarshaller: &JsonUnmarshaller,
        ) -> Result<(), UnmarshallError> {
            self.body = body.clone();
            Ok(())
        }

        fn build(self: Box<Self>) -> Event {
            match self.kind.as_str() {
                "created" => Event::Created(self.body),
                _ => Event::Deleted,
            }
        }
    }

    #[test]
    fn test_factory_selects_shape_from_header() {
        let factory: crate::ResultFactory<Event> = Arc::new(|head: &http::response::Parts| {
            let kind = head
                .headers
                .get("x-event-type")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Box::new(EventBuilder {
                kind,
                body: Value::Null,
            }) as Box<dyn ResultBuilder<Event>>
        });
        let handler = ResponseHandler::new(false, true, factory);

        let created = http::Response::builder()
            .header("x-event-type", "created")
            .body(WireBody::full(r#"{"Id":1}"#))
            .unwrap();
        assert_eq!(
            handler.handle(created).unwrap().into_inner(),
            Event::Created(serde_json::json!({ "Id": 1 }))
        );

        let deleted = http::Response::builder()
            .header("x-event-type", "deleted")
            .body(WireBody::empty())
            .unwrap();
        assert_eq!(handler.handle(deleted).unwrap().into_inner(), Event::Deleted);
    }
}
