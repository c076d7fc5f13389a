//! Wire DTOs for the banking API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! integration tests catch any schema drift between the two crates. Request
//! types validate in their constructors so an invalid value never exists.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

fn require_non_blank(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField { field });
    }
    Ok(())
}

/// Body of `POST /authToken`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: &str, password: &str) -> Result<Self, ValidationError> {
        require_non_blank(username, "username")?;
        Ok(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthToken {
    pub token: String,
}

/// A validated funds transfer. Serializes to exactly
/// `{"fromAccount", "toAccount", "amount"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    from_account: String,
    to_account: String,
    amount: f64,
}

impl TransferRequest {
    pub fn new(from_account: &str, to_account: &str, amount: f64) -> Result<Self, ValidationError> {
        require_non_blank(from_account, "fromAccount")?;
        require_non_blank(to_account, "toAccount")?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ValidationError::NonPositiveAmount(amount));
        }
        Ok(Self {
            from_account: from_account.to_string(),
            to_account: to_account.to_string(),
            amount,
        })
    }

    pub fn from_account(&self) -> &str {
        &self.from_account
    }

    pub fn to_account(&self) -> &str {
        &self.to_account
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

/// Server receipt for a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub transaction_id: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub from_account: String,
    #[serde(default)]
    pub to_account: String,
    #[serde(default)]
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AccountValidation {
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: String,
    pub balance: f64,
    pub currency: String,
}
