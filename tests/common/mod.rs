// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::Result;
use ledgerbank::application::{AccountIdSource, LedgerService};
use ledgerbank::domain::{Account, AccountId, Customer};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Hands out a fixed list of account ids, then repeats the last one.
pub struct ScriptedIds {
    ids: Mutex<VecDeque<AccountId>>,
    last: Mutex<AccountId>,
}

impl ScriptedIds {
    pub fn new(ids: impl IntoIterator<Item = AccountId>) -> Self {
        let ids: VecDeque<AccountId> = ids.into_iter().collect();
        let last = ids.back().copied().unwrap_or(0);
        Self {
            ids: Mutex::new(ids),
            last: Mutex::new(last),
        }
    }
}

impl AccountIdSource for ScriptedIds {
    fn next_account_id(&self) -> AccountId {
        match self.ids.lock().unwrap().pop_front() {
            Some(id) => {
                *self.last.lock().unwrap() = id;
                id
            }
            None => *self.last.lock().unwrap(),
        }
    }
}

/// Test fixture: a customer holding one account
pub struct Fixture;

impl Fixture {
    /// Create customer "Alice" with an empty Savings account
    pub async fn alice_savings(service: &LedgerService) -> Result<(Customer, Account)> {
        let alice = service.customers().create_customer("Alice").await?;
        let account = service.create_account("Savings", alice.id).await?;
        Ok((alice, account))
    }

    /// Create "Alice" with a Savings account funded with `cents`
    pub async fn funded(service: &LedgerService, cents: i64) -> Result<(Customer, Account)> {
        let (alice, account) = Self::alice_savings(service).await?;
        let account = service.deposit(account.id, cents).await?;
        Ok((alice, account))
    }
}
