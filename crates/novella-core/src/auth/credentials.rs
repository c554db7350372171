//! Durable storage for the single credential token.
//!
//! `CredentialStore` owns one slot. Backends decide where it lives: the OS
//! keychain, a JSON file in the data directory, or process memory.

use std::path::PathBuf;
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiError;

/// Key under which the token is persisted.
pub const TOKEN_KEY: &str = "novel_jwt_token";

const SERVICE_NAME: &str = "novella";

/// Token file name in the data directory
const TOKEN_FILE: &str = "token.json";

/// Where the token slot physically lives.
pub trait TokenBackend: Send + Sync {
    fn load(&self) -> Result<Option<String>>;
    fn save(&mut self, token: &str) -> Result<()>;
    fn remove(&mut self) -> Result<()>;
}

/// OS keychain storage via `keyring`.
pub struct KeyringBackend {
    account: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_account(TOKEN_KEY)
    }

    pub fn with_account(account: impl Into<String>) -> Self {
        Self {
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &self.account).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBackend for KeyringBackend {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn save(&mut self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .context("Failed to store token in keychain")?;

        // Some stores accept writes they never keep
        match self.load()? {
            Some(stored) if stored == token => Ok(()),
            _ => anyhow::bail!("Keychain did not retain the token"),
        }
    }

    fn remove(&mut self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredToken {
    token: String,
    saved_at: DateTime<Utc>,
}

/// JSON file storage, for systems without a usable keychain.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(TOKEN_FILE)
    }
}

impl TokenBackend for FileBackend {
    fn load(&self) -> Result<Option<String>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read token file")?;
        let stored: StoredToken =
            serde_json::from_str(&contents).context("Failed to parse token file")?;
        debug!(saved_at = %stored.saved_at, "Loaded token from file");
        Ok(Some(stored.token))
    }

    fn save(&mut self, token: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir).context("Failed to create token directory")?;
        let stored = StoredToken {
            token: token.to_string(),
            saved_at: Utc::now(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        std::fs::write(self.token_path(), contents).context("Failed to write token file")?;
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to delete token file")?;
        }
        Ok(())
    }
}

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    token: Option<String>,
}

impl MemoryBackend {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

impl TokenBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }

    fn save(&mut self, token: &str) -> Result<()> {
        self.token = Some(token.to_string());
        Ok(())
    }

    fn remove(&mut self) -> Result<()> {
        self.token = None;
        Ok(())
    }
}

/// The single token slot shared by the request pipeline and the session manager.
pub struct CredentialStore {
    slot: RwLock<Box<dyn TokenBackend>>,
}

impl CredentialStore {
    pub fn new(backend: impl TokenBackend + 'static) -> Self {
        Self {
            slot: RwLock::new(Box::new(backend)),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    /// Read the current token. Never returns an empty string.
    pub fn get(&self) -> Result<Option<String>, ApiError> {
        let slot = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        let token = slot.load().map_err(ApiError::storage)?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    /// Persist a token. `None` or an empty string clears the slot.
    pub fn set(&self, token: Option<&str>) -> Result<(), ApiError> {
        match token {
            Some(token) if !token.is_empty() => {
                let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
                slot.save(token).map_err(ApiError::storage)
            }
            _ => self.clear(),
        }
    }

    pub fn clear(&self) -> Result<(), ApiError> {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        slot.remove().map_err(ApiError::storage)
    }

    pub fn has_token(&self) -> bool {
        matches!(self.get(), Ok(Some(_)))
    }
}
