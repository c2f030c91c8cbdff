use crate::domain::{ACCOUNT_ID_SPACE, AccountId};

/// Source of candidate account identifiers.
///
/// Candidates need not be unique; the ledger retries on collision.
pub trait AccountIdSource: Send + Sync {
    fn next_account_id(&self) -> AccountId;
}

/// Uniformly random identifiers in `[0, ACCOUNT_ID_SPACE)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomAccountIds;

impl AccountIdSource for RandomAccountIds {
    fn next_account_id(&self) -> AccountId {
        rand::random_range(0..ACCOUNT_ID_SPACE)
    }
}
