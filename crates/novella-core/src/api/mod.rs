//! REST API client module for the novel analysis service.
//!
//! This module provides the `ApiClient` request pipeline and the typed
//! operations built on it (auth, profile, works, analysis, characters,
//! worlds). Every call carries the stored bearer token and every failure is
//! reported as an `ApiError` holding only a readable message.

pub mod client;
pub mod error;
pub mod resources;

pub use client::{unwrap_envelope, ApiClient, RequestBody, RequestEnvelope};
pub use error::{normalize, ApiError, RawFailure};
