use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// File contents to send as a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            mime: None,
        }
    }

    pub fn text(file_name: impl Into<String>, text: String) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: text.into_bytes(),
            mime: Some("text/plain".to_string()),
        }
    }

    /// Read a file from disk, keeping its base name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let mime = match path.extension().and_then(|e| e.to_str()) {
            Some("txt") | Some("md") => Some("text/plain".to_string()),
            _ => None,
        };
        Ok(Self { file_name, bytes, mime })
    }
}

/// Input for a one-off text analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSource {
    File(Upload),
    Text(String),
}

impl TextSource {
    /// The `file` part sent to the server; inline text goes up as `text.txt`.
    pub fn into_upload(self) -> Upload {
        match self {
            TextSource::File(upload) => upload,
            TextSource::Text(text) => Upload::text("text.txt", text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub word: String,
    #[serde(default)]
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterInsight {
    pub name: String,
    #[serde(default)]
    pub archetype: Option<String>,
    #[serde(default)]
    pub highlight: Option<String>,
    #[serde(default)]
    pub trend: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub label: String,
    #[serde(default)]
    pub detail: Option<String>,
}

/// Result of analyzing a text or a stored work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisReport {
    pub sample: Option<String>,
    pub summary: Option<String>,
    pub keywords: Vec<Keyword>,
    pub sentiments: Vec<Sentiment>,
    pub characters: Vec<CharacterInsight>,
    pub timeline: Vec<TimelineEntry>,
    pub metrics: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisReport {
    /// Keywords ordered by weight, heaviest first.
    pub fn top_keywords(&self, limit: usize) -> Vec<&Keyword> {
        let mut keywords: Vec<&Keyword> = self.keywords.iter().collect();
        keywords.sort_by(|a, b| b.weight.total_cmp(&a.weight));
        keywords.truncate(limit);
        keywords
    }
}
