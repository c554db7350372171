//! novella-core - client library for the novel analysis service.
//!
//! This crate provides:
//! - `auth`: the credential token store and the session manager
//! - `api`: the authenticated request pipeline and typed remote operations
//! - `models`: request and response data structures
//! - `config`: configuration loading with environment overrides
//!
//! A typical caller builds one `CredentialStore`, shares it with an
//! `ApiClient`, wraps that in a `SessionManager`, and calls `bootstrap()`
//! once at startup.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, SessionManager, SessionState};
pub use config::{Config, TokenStorage};
