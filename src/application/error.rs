use serde::Serialize;
use thiserror::Error;

use crate::domain::{AccountId, Cents, CustomerId, CustomerNameError, ParseCentsError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Customer not found with id: {0}")]
    CustomerNotFound(CustomerId),

    #[error("Account not found with id: {0}")]
    AccountNotFound(AccountId),

    #[error("Insufficient funds in account {account_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        account_id: AccountId,
        balance: Cents,
        required: Cents,
    },

    #[error("Invalid customer name: {0}")]
    InvalidCustomerName(#[from] CustomerNameError),

    #[error("Invalid account type: {0:?}")]
    InvalidAccountType(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Account is closed: {0}")]
    AccountClosed(AccountId),

    #[error("Account {account_id} was modified concurrently {attempts} times, giving up")]
    ConcurrentModification {
        account_id: AccountId,
        attempts: usize,
    },

    #[error("Could not find a free account id after {0} attempts")]
    AccountIdExhausted(usize),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<ParseCentsError> for AppError {
    fn from(err: ParseCentsError) -> Self {
        AppError::InvalidAmount(err.to_string())
    }
}

/// Coarse classification of failures, used by the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InsufficientFunds,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code for this kind of failure.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidInput | ErrorKind::InsufficientFunds => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::CustomerNotFound(_) | AppError::AccountNotFound(_) => ErrorKind::NotFound,
            AppError::InvalidCustomerName(_)
            | AppError::InvalidAccountType(_)
            | AppError::InvalidAmount(_) => ErrorKind::InvalidInput,
            AppError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            AppError::AccountClosed(_) | AppError::ConcurrentModification { .. } => {
                ErrorKind::Conflict
            }
            AppError::AccountIdExhausted(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Error body handed to callers of the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: ErrorKind,
    pub message: String,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        let kind = err.kind();
        Self {
            status: kind.status_code(),
            error: kind,
            message: err.to_string(),
        }
    }
}
