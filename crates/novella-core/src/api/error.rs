use serde_json::Value;
use thiserror::Error;

/// Message used when neither the response body nor the transport says anything useful.
pub const FALLBACK_MESSAGE: &str = "Request failed";

/// Message reported when a login response carries no usable token.
pub const MISSING_CREDENTIAL_MESSAGE: &str = "Login response did not include a token";

/// Maximum length for error response bodies in log lines
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Normalized failure returned by every pipeline and session operation.
///
/// Each variant carries only a human-readable message; raw transport errors
/// and response bodies never cross this boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// No response was received (connection failure, timeout).
    #[error("{message}")]
    Transport { message: String },

    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// Login succeeded at the transport level but no token field was usable.
    #[error("{}", MISSING_CREDENTIAL_MESSAGE)]
    MissingCredential,

    /// Profile retrieval failed after a token was established.
    #[error("{message}")]
    ProfileFetch { message: String },

    /// The durable credential slot could not be read or written.
    #[error("{message}")]
    Storage { message: String },

    /// A successful response could not be decoded into the expected shape.
    #[error("{message}")]
    InvalidResponse { message: String },

    /// The request itself could not be encoded.
    #[error("{message}")]
    InvalidRequest { message: String },
}

impl ApiError {
    /// The human-readable message, suitable for display to the user.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Transport { message }
            | ApiError::Server { message, .. }
            | ApiError::ProfileFetch { message }
            | ApiError::Storage { message }
            | ApiError::InvalidResponse { message }
            | ApiError::InvalidRequest { message } => message,
            ApiError::MissingCredential => MISSING_CREDENTIAL_MESSAGE,
        }
    }

    /// HTTP status for server failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub(crate) fn storage(err: anyhow::Error) -> Self {
        ApiError::Storage {
            message: format!("Credential storage unavailable: {:#}", err),
        }
    }

    /// Re-tag any failure during profile retrieval, keeping its message.
    pub(crate) fn into_profile_fetch(self) -> Self {
        match self {
            ApiError::ProfileFetch { .. } => self,
            other => ApiError::ProfileFetch {
                message: other.message().to_string(),
            },
        }
    }

    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }
}

/// A failed call described independently of the HTTP client that produced it.
#[derive(Debug, Clone, Default)]
pub struct RawFailure {
    /// Status code, when a response was received at all.
    pub status: Option<u16>,
    /// Decoded response body, if any.
    pub body: Option<Value>,
    /// Transport-level description of what went wrong.
    pub transport: Option<String>,
}

impl RawFailure {
    pub fn transport(description: impl Into<String>) -> Self {
        Self {
            transport: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn status(status: u16, body: Option<Value>) -> Self {
        Self {
            status: Some(status),
            body,
            transport: Some(format!("Request failed with status code {}", status)),
        }
    }
}

/// Convert any failure into an [`ApiError`].
///
/// The message comes from, in order: the body's `message` field, the
/// transport description, then [`FALLBACK_MESSAGE`].
pub fn normalize(failure: RawFailure) -> ApiError {
    let message = failure
        .body
        .as_ref()
        .and_then(structured_message)
        .or_else(|| {
            failure
                .transport
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());

    match failure.status {
        Some(status) => ApiError::Server { status, message },
        None => ApiError::Transport { message },
    }
}

fn structured_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_prefers_body_message() {
        let err = normalize(RawFailure::status(
            400,
            Some(json!({"code": 1, "message": "Username already taken"})),
        ));
        assert_eq!(err.message(), "Username already taken");
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "Username already taken");
    }

    #[test]
    fn test_normalize_falls_back_to_status_description() {
        let err = normalize(RawFailure::status(404, Some(json!({"error": "nope"}))));
        assert_eq!(err.message(), "Request failed with status code 404");

        // Blank message fields are ignored
        let err = normalize(RawFailure::status(500, Some(json!({"message": "   "}))));
        assert_eq!(err.message(), "Request failed with status code 500");

        // Non-string message fields are ignored
        let err = normalize(RawFailure::status(500, Some(json!({"message": 42}))));
        assert_eq!(err.message(), "Request failed with status code 500");
    }

    #[test]
    fn test_normalize_transport_failure() {
        let err = normalize(RawFailure::transport("Request timed out after 15000 ms"));
        assert!(matches!(err, ApiError::Transport { .. }));
        assert_eq!(err.message(), "Request timed out after 15000 ms");
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_normalize_generic_fallback() {
        let err = normalize(RawFailure::default());
        assert_eq!(err, ApiError::Transport { message: FALLBACK_MESSAGE.to_string() });

        let err = normalize(RawFailure {
            status: Some(502),
            body: Some(json!("Bad Gateway")),
            transport: Some(String::new()),
        });
        assert_eq!(err.message(), FALLBACK_MESSAGE);
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_profile_fetch_keeps_message() {
        let err = ApiError::Server { status: 401, message: "Token expired".to_string() };
        assert!(err.is_unauthorized());
        let err = err.into_profile_fetch();
        assert_eq!(err, ApiError::ProfileFetch { message: "Token expired".to_string() });
    }

    #[test]
    fn test_missing_credential_message() {
        assert_eq!(ApiError::MissingCredential.to_string(), MISSING_CREDENTIAL_MESSAGE);
        assert_eq!(ApiError::MissingCredential.message(), MISSING_CREDENTIAL_MESSAGE);
    }

    #[test]
    fn test_truncate_body() {
        let short = "short body";
        assert_eq!(ApiError::truncate_body(short), short);

        let long = "x".repeat(600);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.starts_with(&"x".repeat(500)));
        assert!(truncated.ends_with("(truncated, 600 total bytes)"));
    }
}
