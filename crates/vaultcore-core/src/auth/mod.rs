//! Session and credential storage.
//!
//! This module provides:
//! - `Session`: shared handle to the access/refresh token pair, injected into
//!   the API client
//! - `TokenStore`: the key-value backend a session persists to, with memory,
//!   file, and OS keychain implementations
//!
//! Tokens are stored under the fixed names `jwtToken` and `refreshToken`.

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::KeyringTokenStore;
pub use session::{Session, SessionEvent};
pub use store::{FileTokenStore, MemoryTokenStore, TokenKey, TokenStore};
