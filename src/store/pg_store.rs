//! PostgreSQL-backed account store.
//!
//! Rows read inside a transaction are locked with `SELECT ... FOR UPDATE`, so
//! two transfers touching the same account are serialized by the database.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, postgres::PgPoolOptions};
use tracing::{debug, info};

use crate::account::{Account, AccountId};

use super::{AccountStore, StorageError, StoreTransaction, ensure_balance_scale};

const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id      SERIAL PRIMARY KEY,
    name    TEXT NOT NULL CHECK (name <> ''),
    balance NUMERIC(18, 2) NOT NULL DEFAULT 0
)
"#;

#[derive(Debug, FromRow)]
struct AccountRow {
    id: i32,
    name: String,
    balance: Decimal,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account::new(row.id, row.name, row.balance)
    }
}

#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

/// `tx` is `None` once the transaction has been committed or rolled back.
pub struct PgTransaction {
    tx: Option<sqlx::Transaction<'static, Postgres>>,
}

impl PgAccountStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(CREATE_ACCOUNTS_TABLE)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    type Transaction = PgTransaction;

    async fn begin(&self) -> Result<PgTransaction, StorageError> {
        let tx = self.pool.begin().await?;
        Ok(PgTransaction { tx: Some(tx) })
    }

    async fn create(&self, name: &str, balance: Decimal) -> Result<Account, StorageError> {
        if name.is_empty() {
            return Err(StorageError::Rejected(
                "account name must not be empty".to_string(),
            ));
        }
        ensure_balance_scale(balance)?;
        let row: AccountRow = sqlx::query_as(
            "INSERT INTO accounts (name, balance) VALUES ($1, $2) RETURNING id, name, balance",
        )
        .bind(name)
        .bind(balance)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn accounts(&self) -> Result<Vec<Account>, StorageError> {
        let rows: Vec<AccountRow> =
            sqlx::query_as("SELECT id, name, balance FROM accounts ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Account::from).collect())
    }
}

impl PgTransaction {
    fn tx(&mut self) -> Result<&mut sqlx::Transaction<'static, Postgres>, StorageError> {
        self.tx.as_mut().ok_or(StorageError::Finished)
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn get(&mut self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let tx = self.tx()?;
        let row: Option<AccountRow> =
            sqlx::query_as("SELECT id, name, balance FROM accounts WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;
        Ok(row.map(Account::from))
    }

    async fn update(&mut self, account: &Account) -> Result<(), StorageError> {
        ensure_balance_scale(account.balance())?;
        let tx = self.tx()?;
        let result = sqlx::query("UPDATE accounts SET name = $2, balance = $3 WHERE id = $1")
            .bind(account.id())
            .bind(account.name())
            .bind(account.balance())
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Rejected(format!(
                "no account with id={} to update",
                account.id()
            )));
        }
        debug!(id = account.id(), balance = %account.balance(), "Staged account update");
        Ok(())
    }

    async fn remove(&mut self, id: AccountId) -> Result<(), StorageError> {
        let tx = self.tx()?;
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Rejected(format!(
                "no account with id={id} to remove"
            )));
        }
        debug!(id, "Staged account removal");
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        // sqlx consumes the transaction on commit. If the commit fails the
        // connection rolls back when it is dropped, so a later `rollback`
        // has nothing left to do.
        let tx = self.tx.take().ok_or(StorageError::Finished)?;
        tx.commit().await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        match self.tx.take() {
            Some(tx) => Ok(tx.rollback().await?),
            None => Ok(()),
        }
    }
}
