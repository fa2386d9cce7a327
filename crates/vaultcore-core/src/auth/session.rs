use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::credentials::KeyringTokenStore;
use super::store::{FileTokenStore, MemoryTokenStore, TokenKey, TokenStore};
use crate::config::{Config, TokenStorage};

/// Capacity of the session event channel. Slow subscribers only lose old events.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Changes to the session that the application may want to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    Refreshed,
    /// The credentials could not be recovered; the user has to sign in again.
    SignInRequired,
    SignedOut,
}

struct SessionInner {
    store: Box<dyn TokenStore>,
    events: broadcast::Sender<SessionEvent>,
}

/// Shared handle to the stored token pair.
///
/// Clones share the same store, so a token written through one handle is
/// seen by every request made through any other. There is no locking across
/// operations: the last writer wins.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                store: Box::new(store),
                events,
            }),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryTokenStore::new())
    }

    /// Open the session using the storage backend named in the config.
    pub fn open(config: &Config) -> Result<Self> {
        let session = match config.token_storage {
            TokenStorage::File => Self::new(FileTokenStore::new(config.session_dir()?)),
            TokenStorage::Keyring => Self::new(KeyringTokenStore::new()?),
            TokenStorage::Memory => Self::in_memory(),
        };
        debug!(storage = ?config.token_storage, "Session opened");
        Ok(session)
    }

    fn read(&self, key: TokenKey) -> Option<String> {
        match self.inner.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key.name(), error = %e, "Failed to read token, treating as absent");
                None
            }
        }
    }

    fn write(&self, key: TokenKey, value: &str) {
        if let Err(e) = self.inner.store.set(key, value) {
            warn!(key = key.name(), error = %e, "Failed to store token");
        }
    }

    fn remove(&self, key: TokenKey) {
        if let Err(e) = self.inner.store.remove(key) {
            warn!(key = key.name(), error = %e, "Failed to remove token");
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(TokenKey::Access)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(TokenKey::Refresh)
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Overwrite the access token, and the refresh token when a non-empty one is given.
    pub fn store_tokens(&self, access_token: &str, refresh_token: Option<&str>) {
        self.write(TokenKey::Access, access_token);
        if let Some(refresh) = refresh_token.filter(|t| !t.is_empty()) {
            self.write(TokenKey::Refresh, refresh);
        }
    }

    pub fn clear_access_token(&self) {
        self.remove(TokenKey::Access);
    }

    pub fn clear(&self) {
        self.remove(TokenKey::Access);
        self.remove(TokenKey::Refresh);
    }

    /// End the session after an unrecoverable auth failure.
    pub fn terminate(&self) {
        warn!("Session terminated, sign-in required");
        self.clear();
        self.notify(SessionEvent::SignInRequired);
    }

    pub fn sign_out(&self) {
        info!("Signed out");
        self.clear();
        self.notify(SessionEvent::SignedOut);
    }

    pub fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.inner.events.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }
}
