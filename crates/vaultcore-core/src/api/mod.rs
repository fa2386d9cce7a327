//! REST API client module for the VaultCore banking API.
//!
//! This module provides the `ApiClient` for signing in and fetching account
//! and transaction data. Requests carry the session's bearer token, and an
//! expired token is refreshed once per request before the call is retried.

pub mod client;
pub mod error;
pub mod exchange;

pub use client::ApiClient;
pub use error::ApiError;
pub use exchange::{Exchange, ExchangeState, OutboundRequest};
