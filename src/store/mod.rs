use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::account::{Account, AccountId, BALANCE_SCALE};

pub mod in_memory_store;
pub mod pg_store;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Row rejected: {0}")]
    Rejected(String),
    #[error("Transaction is already finished")]
    Finished,
}

/// Transactional table of accounts.
///
/// `create` and `accounts` work outside of any transaction and exist for
/// seeding and reporting. Balances are only ever changed through a
/// [`StoreTransaction`].
#[async_trait]
pub trait AccountStore: Send + Sync {
    type Transaction: StoreTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StorageError>;

    async fn create(&self, name: &str, balance: Decimal) -> Result<Account, StorageError>;

    /// Committed accounts ordered by id.
    async fn accounts(&self) -> Result<Vec<Account>, StorageError>;
}

/// Handle to an open unit of work.
///
/// Writes are staged until [`commit`](StoreTransaction::commit) returns `Ok`.
/// A failed commit leaves the transaction unresolved, the caller must roll it
/// back. Dropping an unresolved handle rolls it back.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn get(&mut self, id: AccountId) -> Result<Option<Account>, StorageError>;

    async fn update(&mut self, account: &Account) -> Result<(), StorageError>;

    async fn remove(&mut self, id: AccountId) -> Result<(), StorageError>;

    async fn commit(&mut self) -> Result<(), StorageError>;

    /// No-op on a finished transaction.
    async fn rollback(&mut self) -> Result<(), StorageError>;
}

/// Stored balances keep [`BALANCE_SCALE`] decimal places, finer values are
/// rejected instead of rounded.
pub(crate) fn ensure_balance_scale(balance: Decimal) -> Result<(), StorageError> {
    if balance.normalize().scale() > BALANCE_SCALE {
        return Err(StorageError::Rejected(format!(
            "balance {balance} has more than {BALANCE_SCALE} decimal places"
        )));
    }
    Ok(())
}
