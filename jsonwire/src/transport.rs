//! Transport collaborator.
//!
//! The codec never opens connections. Callers supply a [`Transport`] that
//! sends a marshalled request and returns the raw response; connection
//! management, signing, retries and timeouts all live behind it.

use std::future::Future;
use std::sync::Arc;

use jsonwire_core::WireBody;

/// Sends one HTTP request and returns the raw response.
///
/// The response body may be a stream. The codec buffers it only for
/// operations without streaming output.
pub trait Transport: Send + Sync {
    /// Failure to obtain a response. Passed to callers opaquely.
    type Error: std::error::Error + Send + Sync + 'static;

    fn send(
        &self,
        request: http::Request<WireBody>,
    ) -> impl Future<Output = Result<http::Response<WireBody>, Self::Error>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    type Error = T::Error;

    fn send(
        &self,
        request: http::Request<WireBody>,
    ) -> impl Future<Output = Result<http::Response<WireBody>, Self::Error>> + Send {
        (**self).send(request)
    }
}

impl<T: Transport> Transport for &T {
    type Error = T::Error;

    fn send(
        &self,
        request: http::Request<WireBody>,
    ) -> impl Future<Output = Result<http::Response<WireBody>, Self::Error>> + Send {
        (**self).send(request)
    }
}
