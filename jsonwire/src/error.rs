//! Errors returned by a complete call.

use jsonwire_core::{BodyError, MarshallError, UnmarshallError};

/// Outcome of a failed [`ProtocolCodec::execute`](crate::ProtocolCodec::execute).
///
/// `E` is the service's error type chosen at codec build time: every error
/// response is dispatched to exactly one `E` value.
#[derive(Debug, thiserror::Error)]
pub enum CallError<E> {
    /// The service answered with an error response.
    #[error("service error: {0}")]
    Service(E),

    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The request could not be marshalled.
    #[error(transparent)]
    Marshall(#[from] MarshallError),

    /// A successful response could not be unmarshalled.
    #[error(transparent)]
    Unmarshall(#[from] UnmarshallError),

    /// The response body could not be read.
    #[error(transparent)]
    Body(#[from] BodyError),
}

impl<E> CallError<E> {
    /// Wrap an opaque transport failure.
    pub fn transport<T>(err: T) -> Self
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        CallError::Transport(Box::new(err))
    }

    /// The service error, if the call reached the service and it failed.
    pub fn service_error(&self) -> Option<&E> {
        match self {
            CallError::Service(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_service_error(self) -> Option<E> {
        match self {
            CallError::Service(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwire_core::{ErrorDetails, ServiceError};

    #[test]
    fn test_service_error_accessors() {
        let err: CallError<ServiceError> = CallError::Service(ServiceError::new(
            ErrorDetails::new(http::StatusCode::NOT_FOUND),
        ));
        assert!(err.service_error().is_some());
        assert_eq!(
            err.into_service_error().unwrap().into_details().status(),
            http::StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_transport_error_display() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: CallError<ServiceError> = CallError::transport(io);
        assert_eq!(err.to_string(), "transport error: refused");
        assert!(err.service_error().is_none());
    }

    #[test]
    fn test_marshall_error_conversion() {
        let err: CallError<ServiceError> = MarshallError::StreamingBodyRequired.into();
        assert!(matches!(err, CallError::Marshall(_)));
    }
}
