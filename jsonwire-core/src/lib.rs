//! Core binding metadata and error types for jsonwire.
//!
//! This crate provides the immutable descriptors and shared types used by the
//! codec crate (`jsonwire`) and by generated operation call sites.
//!
//! ## Modules
//!
//! - [`binding`]: Per-operation wire shape ([`OperationBinding`])
//! - [`protocol`]: Protocol family, version and content-type resolution
//! - [`body`]: Request/response body type ([`WireBody`])
//! - [`error`]: Codec error types and the service error family
//! - [`json`]: Generic field binding entry point and wire field binders

mod binding;
mod body;
mod error;
pub mod json;
mod protocol;

pub use binding::*;
pub use body::*;
pub use error::*;
pub use json::{JsonObject, JsonUnmarshaller};
pub use protocol::*;
