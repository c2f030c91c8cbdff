use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Cents, CustomerId};

pub type AccountId = i64;

/// Account identifiers are drawn from `[0, ACCOUNT_ID_SPACE)`.
pub const ACCOUNT_ID_SPACE: AccountId = 10_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Closed,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "Active",
            AccountStatus::Closed => "Closed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(AccountStatus::Active),
            "Closed" => Some(AccountStatus::Closed),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rule violations raised by the account itself, independent of storage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("account type should not be empty")]
    EmptyType,

    #[error("amount must be positive, got {0} cents")]
    NonPositiveAmount(Cents),

    #[error("account is closed")]
    Closed,

    #[error("insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: Cents, required: Cents },

    #[error("balance would overflow")]
    BalanceOverflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    #[serde(rename = "type")]
    pub account_type: String,
    pub balance_cents: Cents,
    pub status: AccountStatus,
    pub customer_id: CustomerId,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    /// Optimistic concurrency token, bumped by the store on every update.
    #[serde(skip)]
    pub version: i64,
}

impl Account {
    /// Open a new, empty, active account for `customer_id`.
    pub fn open(
        id: AccountId,
        account_type: &str,
        customer_id: CustomerId,
    ) -> Result<Self, AccountError> {
        let account_type = account_type.trim();
        if account_type.is_empty() {
            return Err(AccountError::EmptyType);
        }

        Ok(Self {
            id,
            account_type: account_type.to_string(),
            balance_cents: 0,
            status: AccountStatus::Active,
            customer_id,
            created_at: Utc::now(),
            closed_at: None,
            version: 0,
        })
    }

    pub fn is_closed(&self) -> bool {
        self.status == AccountStatus::Closed
    }

    pub fn deposit(&mut self, amount: Cents) -> Result<(), AccountError> {
        self.ensure_mutable(amount)?;
        self.balance_cents = self
            .balance_cents
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow)?;
        Ok(())
    }

    /// Take `amount` out of the account. The balance is left untouched on error.
    pub fn withdraw(&mut self, amount: Cents) -> Result<(), AccountError> {
        self.ensure_mutable(amount)?;
        if self.balance_cents < amount {
            return Err(AccountError::InsufficientFunds {
                balance: self.balance_cents,
                required: amount,
            });
        }
        self.balance_cents -= amount;
        Ok(())
    }

    /// Move the account to `Closed`. Returns false if it was already closed.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        self.status = AccountStatus::Closed;
        self.closed_at = Some(Utc::now());
        true
    }

    fn ensure_mutable(&self, amount: Cents) -> Result<(), AccountError> {
        if self.is_closed() {
            return Err(AccountError::Closed);
        }
        if amount <= 0 {
            return Err(AccountError::NonPositiveAmount(amount));
        }
        Ok(())
    }
}
