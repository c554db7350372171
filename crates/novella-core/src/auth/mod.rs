//! Authentication module for managing the credential token and the session.
//!
//! This module provides:
//! - `CredentialStore`: the single durable token slot (keyring, file or memory)
//! - `SessionManager`: login, registration, logout and startup bootstrap
//!
//! The request pipeline reads the token straight from the store, so a token
//! set here is attached to every later request.

pub mod credentials;
pub mod session;

pub use credentials::{
    CredentialStore, FileBackend, KeyringBackend, MemoryBackend, TokenBackend, TOKEN_KEY,
};
pub use session::{resolve_token, SessionManager, SessionState, TokenCandidate, TOKEN_CANDIDATES};
