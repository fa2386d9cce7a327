//! Wire models for the VaultCore API.
//!
//! The API owns these shapes; unknown fields are ignored when parsing.
//!
//! - Auth bodies: `LoginRequest`, `SignupRequest`, `AuthResponse`,
//!   `RefreshTokenRequest`, `MessageResponse`
//! - `Account`, `AccountRequest`
//! - `Transaction`, `TransactionRequest`, `TransferRequest`

pub mod account;
pub mod auth;
pub mod transaction;

pub use account::{total_balance, Account, AccountRequest};
pub use auth::{AuthResponse, LoginRequest, MessageResponse, RefreshTokenRequest, SignupRequest};
pub use transaction::{Transaction, TransactionRequest, TransactionType, TransferRequest};
