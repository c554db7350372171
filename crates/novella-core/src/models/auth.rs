use serde::{Deserialize, Serialize};

/// Domain used for the placeholder email of a registration without one.
const PLACEHOLDER_EMAIL_DOMAIN: &str = "example.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl RegisterRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// The email to send: the supplied one, or `<username>@example.com`.
    pub fn effective_email(&self) -> String {
        match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => email.to_string(),
            _ => format!("{}@{}", self.username, PLACEHOLDER_EMAIL_DOMAIN),
        }
    }

    /// Copy of this request with the email always filled in.
    pub fn with_effective_email(&self) -> Self {
        Self {
            email: Some(self.effective_email()),
            ..self.clone()
        }
    }

    pub fn credentials(&self) -> LoginRequest {
        LoginRequest::new(self.username.clone(), self.password.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_email_derived_from_username() {
        let req = RegisterRequest::new("u", "p");
        assert_eq!(req.effective_email(), "u@example.com");

        let req = RegisterRequest::new("u", "p").with_email("   ");
        assert_eq!(req.effective_email(), "u@example.com");
    }

    #[test]
    fn test_effective_email_keeps_supplied() {
        let req = RegisterRequest::new("u", "p").with_email("writer@novels.io");
        assert_eq!(req.effective_email(), "writer@novels.io");
    }

    #[test]
    fn test_register_payload_shape() {
        let request = RegisterRequest::new("u", "p").with_effective_email();
        let payload = serde_json::to_value(request).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({"username": "u", "password": "p", "email": "u@example.com"})
        );

        // Without email the field is omitted rather than sent as null
        let payload = serde_json::to_value(RegisterRequest::new("u", "p")).unwrap();
        assert!(payload.get("email").is_none());
    }
}
