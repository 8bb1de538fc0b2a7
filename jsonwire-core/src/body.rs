//! Body type shared by marshalled requests and transport responses.
//!
//! [`WireBody`] is either empty, a single buffered chunk, or an opaque byte
//! stream supplied by the caller (streaming upload) or by the transport
//! (streaming download).

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

use crate::error::BodyError;

pin_project! {
    /// An HTTP body for requests and responses.
    #[project = WireBodyProj]
    pub enum WireBody {
        /// No content.
        Empty,
        /// Fully buffered content.
        Full {
            data: Option<Bytes>,
        },
        /// Opaque byte stream.
        Streaming {
            #[pin]
            stream: Pin<Box<dyn Stream<Item = Result<Bytes, BodyError>> + Send>>,
        },
    }
}

impl WireBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        WireBody::Empty
    }

    /// Create a buffered body.
    pub fn full(data: impl Into<Bytes>) -> Self {
        WireBody::Full {
            data: Some(data.into()),
        }
    }

    /// Create a streaming body from the given stream.
    pub fn streaming<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, BodyError>> + Send + 'static,
    {
        WireBody::Streaming {
            stream: Box::pin(stream),
        }
    }

    /// True for [`WireBody::Streaming`].
    pub fn is_streaming(&self) -> bool {
        matches!(self, WireBody::Streaming { .. })
    }

    /// Take the buffered bytes without polling.
    ///
    /// Streaming bodies are handed back unchanged in the `Err` variant.
    pub fn try_into_bytes(self) -> Result<Bytes, WireBody> {
        match self {
            WireBody::Empty => Ok(Bytes::new()),
            WireBody::Full { data } => Ok(data.unwrap_or_default()),
            streaming @ WireBody::Streaming { .. } => Err(streaming),
        }
    }
}

impl Body for WireBody {
    type Data = Bytes;
    type Error = BodyError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.project() {
            WireBodyProj::Empty => Poll::Ready(None),
            WireBodyProj::Full { data } => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
            WireBodyProj::Streaming { stream } => match stream.poll_next(cx) {
                Poll::Ready(Some(Ok(data))) => Poll::Ready(Some(Ok(Frame::data(data)))),
                Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => Poll::Ready(None),
                Poll::Pending => Poll::Pending,
            },
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            WireBody::Empty => true,
            WireBody::Full { data } => data.is_none(),
            WireBody::Streaming { .. } => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            WireBody::Empty => SizeHint::with_exact(0),
            WireBody::Full { data } => {
                SizeHint::with_exact(data.as_ref().map_or(0, |d| d.len() as u64))
            }
            WireBody::Streaming { .. } => SizeHint::default(),
        }
    }
}

impl Default for WireBody {
    fn default() -> Self {
        WireBody::Empty
    }
}

impl From<Bytes> for WireBody {
    fn from(data: Bytes) -> Self {
        WireBody::full(data)
    }
}

impl std::fmt::Debug for WireBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireBody::Empty => write!(f, "WireBody::Empty"),
            WireBody::Full { data } => f
                .debug_struct("WireBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
            WireBody::Streaming { .. } => write!(f, "WireBody::Streaming"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_empty_body() {
        let body = WireBody::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));

        let collected = body.collect().await.unwrap();
        assert!(collected.to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_full_body() {
        let data = Bytes::from_static(b"{\"Name\":\"x\"}");
        let body = WireBody::full(data.clone());
        assert_eq!(body.size_hint().exact(), Some(data.len() as u64));

        let collected = body.collect().await.unwrap();
        assert_eq!(collected.to_bytes(), data);
    }

    #[tokio::test]
    async fn test_streaming_body() {
        let chunks = vec![
            Ok(Bytes::from_static(b"there")),
            Ok(Bytes::from_static(b"!")),
        ];
        let body = WireBody::streaming(futures::stream::iter(chunks));
        assert!(body.is_streaming());
        assert!(!body.is_end_stream());

        let collected = body.collect().await.unwrap();
        assert_eq!(collected.to_bytes(), Bytes::from_static(b"there!"));
    }

    #[tokio::test]
    async fn test_streaming_body_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(BodyError::new("connection reset")),
        ];
        let body = WireBody::streaming(futures::stream::iter(chunks));

        let err = body.collect().await.unwrap_err();
        assert_eq!(err.to_string(), "body error: connection reset");
    }

    #[test]
    fn test_try_into_bytes() {
        assert_eq!(
            WireBody::full("abc").try_into_bytes().unwrap(),
            Bytes::from_static(b"abc")
        );
        assert!(WireBody::empty().try_into_bytes().unwrap().is_empty());

        let streaming = WireBody::streaming(futures::stream::empty());
        assert!(streaming.try_into_bytes().unwrap_err().is_streaming());
    }
}
