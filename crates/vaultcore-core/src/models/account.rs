use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Account {
    pub id: String,
    #[serde(rename = "accountType")]
    pub account_type: String,
    #[serde(default)]
    pub balance: f64,
}

impl Account {
    pub fn display_balance(&self) -> String {
        format!("${:.2}", self.balance)
    }
}

/// Sum of balances across accounts, as shown on the dashboard.
pub fn total_balance(accounts: &[Account]) -> f64 {
    accounts.iter().map(|a| a.balance).sum()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AccountRequest {
    #[serde(rename = "accountType")]
    pub account_type: String,
    #[serde(rename = "initialBalance")]
    pub initial_balance: f64,
}

impl AccountRequest {
    /// Mirror the server's validation so obviously bad input never leaves the client.
    pub fn validate(&self) -> Result<(), String> {
        if self.account_type.trim().is_empty() {
            return Err("Account type is required".to_string());
        }
        if !self.initial_balance.is_finite() || self.initial_balance < 0.0 {
            return Err("Initial balance must be non-negative".to_string());
        }
        Ok(())
    }
}
