use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::account::{Account, AccountId};

use super::{AccountStore, StorageError, StoreTransaction, ensure_balance_scale};

#[derive(Debug, Default)]
struct Table {
    last_id: AccountId,
    rows: BTreeMap<AccountId, Account>,
}

/// Accounts kept in process memory.
///
/// A transaction owns the table lock from `begin` until it is committed,
/// rolled back or dropped, so transactions are fully serialized. Cloning the
/// store shares the table.
#[derive(Debug, Default, Clone)]
pub struct InMemoryAccountStore {
    table: Arc<Mutex<Table>>,
}

/// `None` in `staged` marks a removed row.
pub struct InMemoryTransaction {
    table: Option<OwnedMutexGuard<Table>>,
    staged: BTreeMap<AccountId, Option<Account>>,
}

impl InMemoryAccountStore {
    /// Committed view of a single account.
    ///
    /// Waits for any open transaction to finish, do not call it while holding one.
    pub async fn get(&self, id: AccountId) -> Option<Account> {
        self.table.lock().await.rows.get(&id).cloned()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction, StorageError> {
        let table = self.table.clone().lock_owned().await;
        Ok(InMemoryTransaction {
            table: Some(table),
            staged: BTreeMap::new(),
        })
    }

    async fn create(&self, name: &str, balance: Decimal) -> Result<Account, StorageError> {
        if name.is_empty() {
            return Err(StorageError::Rejected(
                "account name must not be empty".to_string(),
            ));
        }
        ensure_balance_scale(balance)?;
        let mut table = self.table.lock().await;
        table.last_id += 1;
        let account = Account::new(table.last_id, name, balance);
        table.rows.insert(account.id(), account.clone());
        Ok(account)
    }

    async fn accounts(&self) -> Result<Vec<Account>, StorageError> {
        Ok(self.table.lock().await.rows.values().cloned().collect())
    }
}

impl InMemoryTransaction {
    fn table(&self) -> Result<&Table, StorageError> {
        self.table.as_deref().ok_or(StorageError::Finished)
    }

    fn lookup(&self, id: AccountId) -> Result<Option<Account>, StorageError> {
        let table = self.table()?;
        Ok(match self.staged.get(&id) {
            Some(staged) => staged.clone(),
            None => table.rows.get(&id).cloned(),
        })
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn get(&mut self, id: AccountId) -> Result<Option<Account>, StorageError> {
        self.lookup(id)
    }

    async fn update(&mut self, account: &Account) -> Result<(), StorageError> {
        if self.lookup(account.id())?.is_none() {
            return Err(StorageError::Rejected(format!(
                "no account with id={} to update",
                account.id()
            )));
        }
        ensure_balance_scale(account.balance())?;
        if account.name().is_empty() {
            return Err(StorageError::Rejected(
                "account name must not be empty".to_string(),
            ));
        }
        debug!(id = account.id(), balance = %account.balance(), "Staged account update");
        self.staged.insert(account.id(), Some(account.clone()));
        Ok(())
    }

    async fn remove(&mut self, id: AccountId) -> Result<(), StorageError> {
        if self.lookup(id)?.is_none() {
            return Err(StorageError::Rejected(format!(
                "no account with id={id} to remove"
            )));
        }
        debug!(id, "Staged account removal");
        self.staged.insert(id, None);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StorageError> {
        let mut table = self.table.take().ok_or(StorageError::Finished)?;
        for (id, row) in std::mem::take(&mut self.staged) {
            match row {
                Some(account) => {
                    table.rows.insert(id, account);
                }
                None => {
                    table.rows.remove(&id);
                }
            }
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), StorageError> {
        self.staged.clear();
        self.table = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    async fn seeded() -> InMemoryAccountStore {
        let store = InMemoryAccountStore::default();
        store.create("Bruce", dec!(150)).await.unwrap();
        store.create("Clark", dec!(50)).await.unwrap();
        store
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids() {
        let store = seeded().await;
        let accounts = store.accounts().await.unwrap();
        assert_eq!(
            accounts,
            vec![
                Account::new(1, "Bruce", dec!(150)),
                Account::new(2, "Clark", dec!(50)),
            ]
        );

        let err = store.create("", dec!(1)).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)));
        let err = store.create("Penny", dec!(0.001)).await.unwrap_err();
        assert!(matches!(err, StorageError::Rejected(_)));
        assert_eq!(store.accounts().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let mut bruce = tx.get(1).await.unwrap().unwrap();
        let credit = bruce.handle_credit(dec!(10)).unwrap();
        bruce.apply(&credit);
        tx.update(&bruce).await.unwrap();
        tx.remove(2).await.unwrap();

        // the transaction sees its own writes
        assert_eq!(tx.get(1).await.unwrap().unwrap().balance(), dec!(160));
        assert_eq!(tx.get(2).await.unwrap(), None);

        tx.commit().await.unwrap();
        assert_eq!(store.get(1).await.unwrap().balance(), dec!(160));
        assert_eq!(store.get(2).await, None);
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        tx.remove(1).await.unwrap();
        tx.rollback().await.unwrap();
        // rollback twice is fine
        tx.rollback().await.unwrap();
        assert!(matches!(tx.get(1).await, Err(StorageError::Finished)));
        assert!(matches!(tx.commit().await, Err(StorageError::Finished)));

        assert_eq!(store.get(1).await, Some(Account::new(1, "Bruce", dec!(150))));
    }

    #[tokio::test]
    async fn dropped_transaction_releases_the_table() {
        let store = seeded().await;
        {
            let mut tx = store.begin().await.unwrap();
            tx.remove(1).await.unwrap();
        }
        assert_eq!(store.accounts().await.unwrap().len(), 2);
        // the lock is free again
        let mut tx = store.begin().await.unwrap();
        assert!(tx.get(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn missing_rows_are_rejected() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.get(99).await.unwrap(), None);
        assert!(matches!(tx.remove(99).await, Err(StorageError::Rejected(_))));
        assert!(matches!(
            tx.update(&Account::new(99, "Nobody", dec!(1))).await,
            Err(StorageError::Rejected(_))
        ));
        let too_fine = Account::new(1, "Bruce", dec!(150.005));
        assert!(matches!(tx.update(&too_fine).await, Err(StorageError::Rejected(_))));
        assert_eq!(tx.get(1).await.unwrap().unwrap().balance(), dec!(150));

        // a removed row cannot be updated in the same transaction
        let bruce = tx.get(1).await.unwrap().unwrap();
        tx.remove(1).await.unwrap();
        assert!(matches!(tx.update(&bruce).await, Err(StorageError::Rejected(_))));
    }
}
