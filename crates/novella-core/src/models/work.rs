use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Upload;

/// A manuscript stored on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "sizeLabel", default, skip_serializing_if = "Option::is_none")]
    pub size_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Work {
    pub fn display_status(&self) -> &str {
        self.status.as_deref().unwrap_or("--")
    }
}

/// Filters for listing works. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

/// Fields to change on an existing work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A new work: an uploaded file, inline content, or both.
///
/// When no file is given the inline content is sent as `content.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkUpload {
    pub title: Option<String>,
    pub content: Option<String>,
    pub file: Option<Upload>,
}

impl WorkUpload {
    pub fn from_file(file: Upload) -> Self {
        Self {
            file: Some(file),
            ..Self::default()
        }
    }

    pub fn from_content(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
            file: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The file part to send, if any.
    pub fn file_part(&self) -> Option<Upload> {
        match (&self.file, &self.content) {
            (Some(file), _) => Some(file.clone()),
            (None, Some(content)) if !content.is_empty() => {
                Some(Upload::text("content.txt", content.clone()))
            }
            _ => None,
        }
    }
}
