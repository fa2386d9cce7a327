use anyhow::{bail, Context, Result};
use keyring::credential::CredentialPersistence;
use keyring::{CredentialBuilder, Entry};

use super::store::{TokenKey, TokenStore};

const SERVICE_NAME: &str = "vaultcore";

/// Token store backed by the OS keychain, one entry per token name.
pub struct KeyringTokenStore {
    service: String,
    builder: Box<CredentialBuilder>,
}

impl KeyringTokenStore {
    /// Open the platform keychain. Fails on platforms without a keychain backend.
    pub fn new() -> Result<Self> {
        let builder = keyring::default::default_credential_builder();
        require_persistent(builder.as_ref())?;
        Ok(Self::with_builder(SERVICE_NAME, builder))
    }

    pub fn with_builder(service: impl Into<String>, builder: Box<CredentialBuilder>) -> Self {
        Self {
            service: service.into(),
            builder,
        }
    }

    fn entry(&self, key: TokenKey) -> Result<Entry> {
        let credential = self
            .builder
            .build(None, &self.service, key.name())
            .context("Failed to create keyring entry")?;
        Ok(Entry::new_with_credential(credential))
    }
}

fn require_persistent(builder: &CredentialBuilder) -> Result<()> {
    if matches!(builder.persistence(), CredentialPersistence::EntryOnly) {
        bail!("No OS keychain is available on this platform; use file token storage");
    }
    Ok(())
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, key: TokenKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&self, key: TokenKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn remove(&self, key: TokenKey) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
