//! Core library for the VaultCore banking client.
//!
//! - [`api`]: the authenticated HTTP client and its error type
//! - [`auth`]: the session handle and token storage backends
//! - [`config`]: client configuration
//! - [`models`]: request and response bodies

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionEvent};
pub use config::Config;
