//! Data models for the novel analysis service.
//!
//! This module contains the data structures exchanged with the server:
//!
//! - `Profile`, `ProfileUpdate`: identity snapshot returned by `/users/me` and its edits
//! - `LoginRequest`, `RegisterRequest`: authentication payloads
//! - `Work`, `WorkQuery`, `WorkUpload`: manuscripts and their uploads
//! - `Character`, `World`: setting records, saved with create-or-update semantics
//! - `AnalysisReport`, `TextSource`: text analysis input and output
//!
//! Fields the client does not know about are kept in `extra` so that records
//! survive a fetch/update cycle unchanged.

pub mod analysis;
pub mod auth;
pub mod library;
pub mod profile;
pub mod work;

pub use analysis::{
    AnalysisReport, CharacterInsight, Keyword, Sentiment, TextSource, TimelineEntry, Upload,
};
pub use auth::{LoginRequest, RegisterRequest};
pub use library::{Character, Resource, World};
pub use profile::{Profile, ProfileUpdate};
pub use work::{Work, WorkQuery, WorkUpdate, WorkUpload};
