//! Modeled error registry.
//!
//! Maps discriminator codes to factories that produce empty error builders.
//! The registry is assembled by [`CodecBuilder`](crate::CodecBuilder) and
//! frozen inside the built codec; lookups never mutate it.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use jsonwire_core::{
    ErrorDetails, JsonUnmarshaller, ModeledError, ServiceError, UnmarshallError,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// A mutable error value under construction.
///
/// One builder is created per failed call. The dispatcher binds the body's
/// fields into it (modeled errors only) and then finishes it with the common
/// [`ErrorDetails`].
pub trait ErrorBuilder<E>: Send {
    /// Bind structured body fields. The default implementation binds nothing.
    fn bind_fields(
        &mut self,
        body: &Value,
        unmarshaller: &JsonUnmarshaller,
    ) -> Result<(), UnmarshallError> {
        let _ = (body, unmarshaller);
        Ok(())
    }

    /// Finish the error.
    fn build(self: Box<Self>, details: ErrorDetails) -> E;
}

/// Zero-argument factory producing an empty [`ErrorBuilder`].
pub type ErrorFactory<E> = Arc<dyn Fn() -> Box<dyn ErrorBuilder<E>> + Send + Sync>;

/// Builder for a modeled error shape `S`, wrapped into `E` by `wrap`.
///
/// Shapes whose fields are absent from the body keep their `Default` values.
pub struct ShapeErrorBuilder<S, E> {
    shape: S,
    wrap: Arc<dyn Fn(ModeledError<S>) -> E + Send + Sync>,
}

impl<S, E> ErrorBuilder<E> for ShapeErrorBuilder<S, E>
where
    S: DeserializeOwned + Send,
{
    fn bind_fields(
        &mut self,
        body: &Value,
        unmarshaller: &JsonUnmarshaller,
    ) -> Result<(), UnmarshallError> {
        self.shape = unmarshaller.unmarshall(body)?;
        Ok(())
    }

    fn build(self: Box<Self>, details: ErrorDetails) -> E {
        (self.wrap)(ModeledError::new(self.shape, details))
    }
}

/// Builder for the service's base error.
pub struct ServiceErrorBuilder<E> {
    wrap: Arc<dyn Fn(ServiceError) -> E + Send + Sync>,
}

impl<E> ErrorBuilder<E> for ServiceErrorBuilder<E> {
    fn build(self: Box<Self>, details: ErrorDetails) -> E {
        (self.wrap)(ServiceError::new(details))
    }
}

/// Factory for a modeled shape `S`.
pub fn shape_factory<S, E, F>(wrap: F) -> ErrorFactory<E>
where
    S: DeserializeOwned + Default + Send + 'static,
    E: 'static,
    F: Fn(ModeledError<S>) -> E + Send + Sync + 'static,
{
    let wrap: Arc<dyn Fn(ModeledError<S>) -> E + Send + Sync> = Arc::new(wrap);
    Arc::new(move || {
        Box::new(ShapeErrorBuilder {
            shape: S::default(),
            wrap: Arc::clone(&wrap),
        }) as Box<dyn ErrorBuilder<E>>
    })
}

/// Factory for the base [`ServiceError`].
pub fn service_error_factory<E, F>(wrap: F) -> ErrorFactory<E>
where
    E: 'static,
    F: Fn(ServiceError) -> E + Send + Sync + 'static,
{
    let wrap: Arc<dyn Fn(ServiceError) -> E + Send + Sync> = Arc::new(wrap);
    Arc::new(move || {
        Box::new(ServiceErrorBuilder {
            wrap: Arc::clone(&wrap),
        }) as Box<dyn ErrorBuilder<E>>
    })
}

/// Frozen mapping from discriminator code to error factory, plus the fallback.
pub struct ErrorRegistry<E> {
    modeled: HashMap<String, ErrorFactory<E>>,
    default: ErrorFactory<E>,
    _error: PhantomData<fn() -> E>,
}

impl<E> ErrorRegistry<E> {
    pub(crate) fn new(modeled: HashMap<String, ErrorFactory<E>>, default: ErrorFactory<E>) -> Self {
        Self {
            modeled,
            default,
            _error: PhantomData,
        }
    }

    /// Factory registered for `code`. Codes are case-sensitive.
    pub fn get(&self, code: &str) -> Option<&ErrorFactory<E>> {
        self.modeled.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.modeled.contains_key(code)
    }

    /// Fallback factory for unregistered codes.
    pub fn default_factory(&self) -> &ErrorFactory<E> {
        &self.default
    }

    /// Number of modeled registrations.
    pub fn len(&self) -> usize {
        self.modeled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modeled.is_empty()
    }

    /// Registered codes, in no particular order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.modeled.keys().map(String::as_str)
    }
}

impl<E> fmt::Debug for ErrorRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<&str> = self.codes().collect();
        codes.sort_unstable();
        f.debug_struct("ErrorRegistry")
            .field("codes", &codes)
            .finish_non_exhaustive()
    }
}
