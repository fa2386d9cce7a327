//! Persistent key-value storage for the session token pair.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Session file name in the session directory
const SESSION_FILE: &str = "session.json";

/// Scratch file renamed over the session file so readers never see a partial write
const SESSION_TMP_FILE: &str = "session.json.tmp";

/// The two fixed names a token can be stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKey {
    Access,
    Refresh,
}

impl TokenKey {
    pub fn name(self) -> &'static str {
        match self {
            TokenKey::Access => "jwtToken",
            TokenKey::Refresh => "refreshToken",
        }
    }
}

/// Backing storage for a `Session`. Absence of a key is a valid state.
pub trait TokenStore: Send + Sync {
    fn get(&self, key: TokenKey) -> Result<Option<String>>;
    fn set(&self, key: TokenKey, value: &str) -> Result<()>;
    fn remove(&self, key: TokenKey) -> Result<()>;
}

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    values: RwLock<HashMap<TokenKey, String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| anyhow!("token store lock poisoned"))?;
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| anyhow!("token store lock poisoned"))?;
        values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| anyhow!("token store lock poisoned"))?;
        values.remove(&key);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredTokens {
    #[serde(rename = "jwtToken", default, skip_serializing_if = "Option::is_none")]
    access_token: Option<String>,
    #[serde(rename = "refreshToken", default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl StoredTokens {
    fn slot(&mut self, key: TokenKey) -> &mut Option<String> {
        match key {
            TokenKey::Access => &mut self.access_token,
            TokenKey::Refresh => &mut self.refresh_token,
        }
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Tokens persisted as JSON in `<dir>/session.json`.
pub struct FileTokenStore {
    dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn load(&self) -> Result<StoredTokens> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(StoredTokens::default());
        }
        let contents =
            std::fs::read_to_string(&path).context("Failed to read session file")?;
        serde_json::from_str(&contents).context("Failed to parse session file")
    }

    fn save(&self, tokens: &StoredTokens) -> Result<()> {
        let path = self.session_path();
        if tokens.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path).context("Failed to remove session file")?;
            }
            return Ok(());
        }
        std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
        let contents = serde_json::to_string_pretty(tokens)?;
        let tmp = self.dir.join(SESSION_TMP_FILE);
        std::fs::write(&tmp, contents).context("Failed to write session file")?;
        std::fs::rename(&tmp, &path).context("Failed to replace session file")?;
        Ok(())
    }

    fn update(&self, key: TokenKey, value: Option<&str>) -> Result<()> {
        let mut tokens = match self.load() {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Unreadable session file replaced, other stored token dropped");
                StoredTokens::default()
            }
        };
        *tokens.slot(key) = value.map(str::to_string);
        tokens.updated_at = Some(Utc::now());
        self.save(&tokens)
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        Ok(self.load()?.slot(key).clone())
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.update(key, Some(value))
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        self.update(key, None)
    }
}
