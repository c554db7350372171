use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identity snapshot for the current token, as reported by `/users/me`.
///
/// A cached view: replaced wholesale on every fetch, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Profile {
    /// Best name to show for this user.
    pub fn display_name(&self) -> String {
        [&self.nickname, &self.username, &self.email]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
            .unwrap_or("unknown user")
            .to_string()
    }
}

/// Editable profile fields. Unset fields are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.nickname.is_none() && self.email.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_profile_keeps_unknown_fields() {
        let profile: Profile = serde_json::from_value(json!({
            "id": 7,
            "username": "jianglai",
            "email": "jl@example.com",
            "penName": "江来",
            "genre": "科幻"
        }))
        .unwrap();

        assert_eq!(profile.id, Some(json!(7)));
        assert_eq!(profile.username.as_deref(), Some("jianglai"));
        assert_eq!(profile.extra.get("penName"), Some(&json!("江来")));
        assert_eq!(profile.extra.len(), 2);
    }

    #[test]
    fn test_display_name_priority() {
        let mut profile = Profile {
            username: Some("writer".to_string()),
            email: Some("w@example.com".to_string()),
            ..Profile::default()
        };
        assert_eq!(profile.display_name(), "writer");

        profile.nickname = Some("Nib".to_string());
        assert_eq!(profile.display_name(), "Nib");

        assert_eq!(Profile::default().display_name(), "unknown user");
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            nickname: Some("江来".to_string()),
            ..ProfileUpdate::default()
        };
        assert!(!update.is_empty());
        assert_eq!(serde_json::to_value(&update).unwrap(), json!({"nickname": "江来"}));
        assert!(ProfileUpdate::default().is_empty());
    }
}
