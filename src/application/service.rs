use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{
    Account, AccountError, AccountId, Cents, Customer, CustomerId, NewCustomer, format_cents,
};
use crate::storage::Repository;

use super::{AccountIdSource, AppError, RandomAccountIds};

/// How many identifiers are drawn before account creation gives up.
pub const MAX_ACCOUNT_ID_ATTEMPTS: usize = 16;

/// How many times a read-modify-write is replayed after losing a race.
pub const MAX_UPDATE_ATTEMPTS: usize = 32;

/// Creates and looks up customers.
#[derive(Clone)]
pub struct CustomerDirectory {
    repo: Repository,
}

impl CustomerDirectory {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Create a customer after validating the name.
    pub async fn create_customer(&self, name: &str) -> Result<Customer, AppError> {
        info!(name, "Creating customer");
        let new_customer = NewCustomer::new(name).inspect_err(|err| {
            warn!(name, error = %err, "Rejected customer name");
        })?;

        let customer = self.repo.insert_customer(&new_customer).await?;
        info!(customer_id = customer.id, "Customer created");
        Ok(customer)
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Customer, AppError> {
        debug!(customer_id = id, "Retrieving customer");
        self.repo.get_customer(id).await?.ok_or_else(|| {
            warn!(customer_id = id, "Customer not found");
            AppError::CustomerNotFound(id)
        })
    }
}

/// Application service owning every account state transition.
/// This is the primary interface for any client (CLI, API, etc.).
pub struct LedgerService {
    customers: CustomerDirectory,
    repo: Repository,
    ids: Box<dyn AccountIdSource>,
}

impl LedgerService {
    /// Create a ledger over the given customer directory and account store,
    /// drawing account identifiers at random.
    pub fn new(customers: CustomerDirectory, repo: Repository) -> Self {
        Self {
            customers,
            repo,
            ids: Box::new(RandomAccountIds),
        }
    }

    /// Replace the account identifier source.
    pub fn with_id_source(mut self, ids: impl AccountIdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::from_repository(repo))
    }

    /// Connect to an existing database, bringing its schema up to date.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        repo.migrate().await?;
        Ok(Self::from_repository(repo))
    }

    fn from_repository(repo: Repository) -> Self {
        Self::new(CustomerDirectory::new(repo.clone()), repo)
    }

    pub fn customers(&self) -> &CustomerDirectory {
        &self.customers
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    // ========================
    // Account operations
    // ========================

    /// Open an empty, active account of `account_type` for an existing customer.
    pub async fn create_account(
        &self,
        account_type: &str,
        customer_id: CustomerId,
    ) -> Result<Account, AppError> {
        info!(customer_id, account_type, "Creating account");
        let customer = self.customers.get_customer(customer_id).await?;

        for attempt in 1..=MAX_ACCOUNT_ID_ATTEMPTS {
            let id = self.ids.next_account_id();
            let account = Account::open(id, account_type, customer.id).map_err(|err| match err {
                AccountError::EmptyType => {
                    warn!(customer_id, "Rejected blank account type");
                    AppError::InvalidAccountType(account_type.to_string())
                }
                other => self.reject(id, other),
            })?;

            if self.repo.insert_account(&account).await? {
                info!(account_id = id, customer_id, "Account created");
                return Ok(account);
            }
            warn!(account_id = id, attempt, "Account id already taken, drawing another");
        }

        Err(AppError::AccountIdExhausted(MAX_ACCOUNT_ID_ATTEMPTS))
    }

    /// Get an account by ID.
    pub async fn get_account_by_id(&self, id: AccountId) -> Result<Account, AppError> {
        debug!(account_id = id, "Retrieving account");
        self.repo.get_account(id).await?.ok_or_else(|| {
            warn!(account_id = id, "Account not found");
            AppError::AccountNotFound(id)
        })
    }

    /// List the accounts owned by a customer.
    pub async fn list_customer_accounts(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Account>, AppError> {
        let customer = self.customers.get_customer(customer_id).await?;
        Ok(self.repo.list_accounts_for_customer(customer.id).await?)
    }

    /// Add a strictly positive amount to an active account.
    pub async fn deposit(&self, account_id: AccountId, amount: Cents) -> Result<Account, AppError> {
        info!(account_id, amount = %format_cents(amount), "Depositing");
        Self::validate_amount(amount)?;
        let account = self
            .update_with_retry(account_id, |account| account.deposit(amount).map(|()| true))
            .await?;
        info!(account_id, balance = %format_cents(account.balance_cents), "Deposit complete");
        Ok(account)
    }

    /// Take a strictly positive amount out of an active account.
    /// Fails with `InsufficientFunds`, leaving the balance unchanged, on overdraw.
    pub async fn withdraw(&self, account_id: AccountId, amount: Cents) -> Result<Account, AppError> {
        info!(account_id, amount = %format_cents(amount), "Withdrawing");
        Self::validate_amount(amount)?;
        let account = self
            .update_with_retry(account_id, |account| account.withdraw(amount).map(|()| true))
            .await?;
        info!(account_id, balance = %format_cents(account.balance_cents), "Withdrawal complete");
        Ok(account)
    }

    /// Close an account, whatever its balance. Closing a closed account is a no-op.
    pub async fn close_account(&self, account_id: AccountId) -> Result<Account, AppError> {
        info!(account_id, "Closing account");
        let account = self
            .update_with_retry(account_id, |account| Ok(account.close()))
            .await?;
        info!(account_id, "Account closed");
        Ok(account)
    }

    fn validate_amount(amount: Cents) -> Result<(), AppError> {
        if amount <= 0 {
            warn!(amount, "Rejected non-positive amount");
            return Err(AppError::InvalidAmount(format!(
                "amount must be positive, got {}",
                format_cents(amount)
            )));
        }
        Ok(())
    }

    /// Load, apply `change`, and write back under the account's version.
    ///
    /// `change` returns whether it modified the account; unmodified accounts
    /// are returned without a write. A concurrent writer forces a replay.
    async fn update_with_retry<F>(&self, account_id: AccountId, change: F) -> Result<Account, AppError>
    where
        F: Fn(&mut Account) -> Result<bool, AccountError>,
    {
        for attempt in 1..=MAX_UPDATE_ATTEMPTS {
            let mut account = self.get_account_by_id(account_id).await?;

            if !change(&mut account).map_err(|err| self.reject(account_id, err))? {
                return Ok(account);
            }

            if self.repo.update_account(&mut account).await? {
                return Ok(account);
            }
            warn!(account_id, attempt, "Account changed concurrently, retrying");
            let jitter = rand::random_range(0..=attempt as u64);
            tokio::time::sleep(Duration::from_millis(jitter)).await;
        }

        Err(AppError::ConcurrentModification {
            account_id,
            attempts: MAX_UPDATE_ATTEMPTS,
        })
    }

    fn reject(&self, account_id: AccountId, err: AccountError) -> AppError {
        warn!(account_id, error = %err, "Account operation rejected");
        match err {
            AccountError::EmptyType => AppError::InvalidAccountType(String::new()),
            AccountError::NonPositiveAmount(amount) => AppError::InvalidAmount(format!(
                "amount must be positive, got {}",
                format_cents(amount)
            )),
            AccountError::Closed => AppError::AccountClosed(account_id),
            AccountError::InsufficientFunds { balance, required } => AppError::InsufficientFunds {
                account_id,
                balance,
                required,
            },
            AccountError::BalanceOverflow => AppError::InvalidAmount(format!(
                "deposit would overflow the balance of account {}",
                account_id
            )),
        }
    }
}
