use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Account;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Debit,
    Credit,
    /// Any type this client does not know. Never sent to the server.
    #[serde(other)]
    Other,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Debit => write!(f, "Debit"),
            TransactionType::Credit => write!(f, "Credit"),
            TransactionType::Other => write!(f, "Other"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Transaction {
    pub id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Server-local time without an offset.
    #[serde(default)]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub timestamp: Option<NaiveDateTime>,
    #[serde(default)]
    pub account: Option<Account>,
}

impl Transaction {
    /// Amount with the sign implied by its type: credits positive, debits negative.
    pub fn signed_amount(&self) -> f64 {
        match self.kind {
            TransactionType::Credit => self.amount.abs(),
            TransactionType::Debit => -self.amount.abs(),
            TransactionType::Other => self.amount,
        }
    }

    pub fn display_amount(&self) -> String {
        let signed = self.signed_amount();
        let sign = if signed >= 0.0 { '+' } else { '-' };
        format!("{} ${:.2}", sign, signed.abs())
    }

    pub fn display_date(&self) -> String {
        self.timestamp
            .map(|ts| ts.format("%b %d, %Y %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TransactionRequest {
    #[serde(rename = "accountId")]
    pub account_id: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TransferRequest {
    #[serde(rename = "fromAccountId")]
    pub from_account_id: String,
    #[serde(rename = "toAccountId")]
    pub to_account_id: String,
    pub amount: f64,
}
