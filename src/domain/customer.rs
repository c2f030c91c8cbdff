use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type CustomerId = i64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomerNameError {
    #[error("customer name should not be empty")]
    Empty,

    #[error("customer name must contain at least one letter or digit: {0:?}")]
    NoAlphanumeric(String),
}

/// A customer that has not been persisted yet. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl NewCustomer {
    /// Validate `name` and build an unsaved customer.
    ///
    /// Surrounding whitespace is dropped. A name is accepted as soon as it
    /// carries one alphanumeric character, in any script.
    pub fn new(name: &str) -> Result<Self, CustomerNameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CustomerNameError::Empty);
        }
        if !name.chars().any(char::is_alphanumeric) {
            return Err(CustomerNameError::NoAlphanumeric(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            created_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
