//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base address, the per-request timeout, where the credential token lives,
//! and the last username used to log in.
//!
//! Configuration is stored at `~/.config/novella/config.json`. Values can be
//! overridden from the environment (`NOVELLA_BASE_URL`, `NOVELLA_TIMEOUT_MS`,
//! `NOVELLA_TOKEN_STORAGE`).

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth::{CredentialStore, FileBackend, KeyringBackend};

/// Application name used for config/data directory paths
const APP_NAME: &str = "novella";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API root. Every remote path is relative to it.
pub const DEFAULT_BASE_ADDRESS: &str = "http://localhost:8081/api";

/// Default abort threshold for a single call.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

pub const ENV_BASE_URL: &str = "NOVELLA_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "NOVELLA_TIMEOUT_MS";
pub const ENV_TOKEN_STORAGE: &str = "NOVELLA_TOKEN_STORAGE";

/// Backend used for the credential token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStorage {
    Keyring,
    #[default]
    File,
    Memory,
}

impl FromStr for TokenStorage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyring" => Ok(TokenStorage::Keyring),
            "file" => Ok(TokenStorage::File),
            "memory" => Ok(TokenStorage::Memory),
            other => Err(anyhow::anyhow!(
                "Unknown token storage '{}' (expected keyring, file or memory)",
                other
            )),
        }
    }
}

impl fmt::Display for TokenStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenStorage::Keyring => "keyring",
            TokenStorage::File => "file",
            TokenStorage::Memory => "memory",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_address: String,
    pub timeout_ms: u64,
    pub token_storage: TokenStorage,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_address: DEFAULT_BASE_ADDRESS.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            token_storage: TokenStorage::default(),
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `NOVELLA_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base) = value(ENV_BASE_URL) {
            self.base_address = base.trim().to_string();
        }
        if let Some(timeout) = value(ENV_TIMEOUT_MS) {
            self.timeout_ms = timeout
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of milliseconds", ENV_TIMEOUT_MS))?;
        }
        if let Some(storage) = value(ENV_TOKEN_STORAGE) {
            self.token_storage = storage.parse()?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Build the credential store selected by `token_storage`.
    pub fn credential_store(&self) -> Result<CredentialStore> {
        let store = match self.token_storage {
            TokenStorage::Keyring => CredentialStore::new(KeyringBackend::new()),
            TokenStorage::File => CredentialStore::new(FileBackend::new(self.data_dir()?)),
            TokenStorage::Memory => CredentialStore::in_memory(),
        };
        Ok(store)
    }
}
