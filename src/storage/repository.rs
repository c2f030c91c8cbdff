use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{Row, SqlitePool};

use crate::domain::{Account, AccountId, AccountStatus, Customer, CustomerId, NewCustomer};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting and querying customers and accounts.
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL such as `sqlite:bank.db?mode=rwc`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations. Safe to run more than once.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Customer operations
    // ========================

    /// Insert a customer; the database assigns its id.
    pub async fn insert_customer(&self, customer: &NewCustomer) -> Result<Customer> {
        let row = sqlx::query(
            r#"
            INSERT INTO customers (name, created_at)
            VALUES (?, ?)
            RETURNING id
            "#,
        )
        .bind(&customer.name)
        .bind(customer.created_at.to_rfc3339())
        .fetch_one(&self.pool)
        .await
        .context("Failed to save customer")?;

        Ok(Customer {
            id: row.get("id"),
            name: customer.name.clone(),
            created_at: customer.created_at,
        })
    }

    /// Get a customer by ID.
    pub async fn get_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        let row = sqlx::query("SELECT id, name, created_at FROM customers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch customer")?;

        row.as_ref().map(Self::row_to_customer).transpose()
    }

    fn row_to_customer(row: &SqliteRow) -> Result<Customer> {
        let created_at_str: String = row.get("created_at");

        Ok(Customer {
            id: row.get("id"),
            name: row.get("name"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
        })
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account unless its id is already taken.
    ///
    /// Returns false, without touching the existing row, when the id is in use.
    pub async fn insert_account(&self, account: &Account) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (id, account_type, balance_cents, status, customer_id, created_at, closed_at, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(account.id)
        .bind(&account.account_type)
        .bind(account.balance_cents)
        .bind(account.status.as_str())
        .bind(account.customer_id)
        .bind(account.created_at.to_rfc3339())
        .bind(account.closed_at.map(|dt| dt.to_rfc3339()))
        .bind(account.version)
        .execute(&self.pool)
        .await
        .context("Failed to save account")?;

        Ok(result.rows_affected() == 1)
    }

    /// Write back the mutable fields of an account, guarded by its version.
    ///
    /// On success the in-memory version is bumped to match the stored row.
    /// Returns false if the row changed since it was loaded (or is gone).
    pub async fn update_account(&self, account: &mut Account) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET balance_cents = ?, status = ?, closed_at = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(account.balance_cents)
        .bind(account.status.as_str())
        .bind(account.closed_at.map(|dt| dt.to_rfc3339()))
        .bind(account.id)
        .bind(account.version)
        .execute(&self.pool)
        .await
        .context("Failed to update account")?;

        if result.rows_affected() == 1 {
            account.version += 1;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT id, account_type, balance_cents, status, customer_id, created_at, closed_at, version
            FROM accounts
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// List the accounts owned by a customer, oldest first.
    pub async fn list_accounts_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_type, balance_cents, status, customer_id, created_at, closed_at, version
            FROM accounts
            WHERE customer_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Total number of stored accounts.
    pub async fn count_accounts(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM accounts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count accounts")?;
        Ok(row.get("count"))
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let status_str: String = row.get("status");
        let created_at_str: String = row.get("created_at");
        let closed_at_str: Option<String> = row.get("closed_at");

        Ok(Account {
            id: row.get("id"),
            account_type: row.get("account_type"),
            balance_cents: row.get("balance_cents"),
            status: AccountStatus::from_str(&status_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
            customer_id: row.get("customer_id"),
            created_at: parse_timestamp(&created_at_str).context("Invalid created_at timestamp")?,
            closed_at: closed_at_str
                .as_deref()
                .map(parse_timestamp)
                .transpose()
                .context("Invalid closed_at timestamp")?,
            version: row.get("version"),
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc))
}
