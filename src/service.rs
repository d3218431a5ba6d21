use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    account::{Account, AccountError, AccountId},
    command::{AccountCommand, CommandError, DeleteCommand, TransferCommand},
    store::{AccountStore, StorageError, StoreTransaction},
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Rollback failed after another failure, the final state of the
    /// transaction is unknown.
    #[error("Transaction left unresolved, rollback failed ({rollback}) after: {reason}")]
    Unresolved {
        reason: Box<ServiceError>,
        rollback: StorageError,
    },
}

impl ServiceError {
    /// Business-rule and caller errors, as opposed to infrastructure failures.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Command(_) | Self::Account(_))
    }
}

/// Committed rows of a transfer. Both rows are the same account for a self-transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from: Account,
    pub to: Account,
    pub amount: Decimal,
}

impl fmt::Display for TransferReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Transferred {} from {} to {}", self.amount, self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Transferred(TransferReceipt),
    Deleted(Account),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Transferred(receipt) => receipt.fmt(f),
            Outcome::Deleted(account) => write!(f, "Removed account {account}"),
        }
    }
}

/// Runs every operation in its own store transaction. Any failure rolls the
/// transaction back before it is returned.
pub struct TransferService<S> {
    store: S,
}

impl<S> TransferService<S>
where
    S: AccountStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, ServiceError> {
        let command = TransferCommand::new(from, to, amount).inspect_err(|err| {
            warn!(from, to, amount = %amount, error = %err, "Transfer rejected");
        })?;
        self.execute_transfer(command).await
    }

    pub async fn delete(&self, id: AccountId) -> Result<Account, ServiceError> {
        self.execute_delete(DeleteCommand { id }).await
    }

    pub async fn execute(&self, command: AccountCommand) -> Result<Outcome, ServiceError> {
        match command {
            AccountCommand::Transfer(command) => {
                self.execute_transfer(command).await.map(Outcome::Transferred)
            }
            AccountCommand::Delete(command) => {
                self.execute_delete(command).await.map(Outcome::Deleted)
            }
        }
    }

    async fn execute_transfer(
        &self,
        command: TransferCommand,
    ) -> Result<TransferReceipt, ServiceError> {
        let TransferCommand { from, to, amount } = command;
        let result = match self.store.begin().await {
            Ok(mut tx) => {
                let outcome = apply_transfer(&mut tx, &command).await;
                resolve(tx, outcome).await
            }
            Err(err) => Err(err.into()),
        };
        match result {
            Ok(receipt) => {
                info!(from, to, amount = %amount, "Transfer committed");
                Ok(receipt)
            }
            Err(err) => {
                log_failure("Transfer", &err);
                Err(err)
            }
        }
    }

    async fn execute_delete(&self, command: DeleteCommand) -> Result<Account, ServiceError> {
        let result = match self.store.begin().await {
            Ok(mut tx) => {
                let outcome = apply_delete(&mut tx, &command).await;
                resolve(tx, outcome).await
            }
            Err(err) => Err(err.into()),
        };
        match result {
            Ok(account) => {
                info!(id = command.id, "Account removed");
                Ok(account)
            }
            Err(err) => {
                log_failure("Delete", &err);
                Err(err)
            }
        }
    }
}

async fn fetch<T>(tx: &mut T, id: AccountId) -> Result<Account, ServiceError>
where
    T: StoreTransaction,
{
    tx.get(id)
        .await?
        .ok_or_else(|| AccountError::NotFound(id).into())
}

async fn apply_transfer<T>(
    tx: &mut T,
    command: &TransferCommand,
) -> Result<TransferReceipt, ServiceError>
where
    T: StoreTransaction,
{
    let mut from = fetch(tx, command.from).await?;
    if command.is_self_transfer() {
        // debit and credit cancel out, only the funds check applies
        from.handle_debit(command.amount)?;
        return Ok(TransferReceipt {
            to: from.clone(),
            from,
            amount: command.amount,
        });
    }
    let mut to = fetch(tx, command.to).await?;

    let debit = from.handle_debit(command.amount)?;
    let credit = to.handle_credit(command.amount)?;
    from.apply(&debit);
    to.apply(&credit);

    tx.update(&from).await?;
    tx.update(&to).await?;
    Ok(TransferReceipt {
        from,
        to,
        amount: command.amount,
    })
}

async fn apply_delete<T>(tx: &mut T, command: &DeleteCommand) -> Result<Account, ServiceError>
where
    T: StoreTransaction,
{
    let account = fetch(tx, command.id).await?;
    account.ensure_removable()?;
    tx.remove(account.id()).await?;
    Ok(account)
}

/// Commits on success. Rolls back on any failure, including a failed commit.
async fn resolve<T, V>(mut tx: T, outcome: Result<V, ServiceError>) -> Result<V, ServiceError>
where
    T: StoreTransaction,
{
    let reason = match outcome {
        Ok(value) => match tx.commit().await {
            Ok(()) => return Ok(value),
            Err(err) => ServiceError::Storage(err),
        },
        Err(reason) => reason,
    };
    match tx.rollback().await {
        Ok(()) => Err(reason),
        Err(rollback) => Err(ServiceError::Unresolved {
            reason: Box::new(reason),
            rollback,
        }),
    }
}

fn log_failure(operation: &str, err: &ServiceError) {
    match err {
        ServiceError::Unresolved { .. } => {
            error!(operation, error = %err, "Transaction state unknown, operator attention required")
        }
        // also covers a failed `begin`, where nothing was opened to roll back
        ServiceError::Storage(_) => error!(operation, error = %err, "Storage failure"),
        _ => warn!(operation, error = %err, "Rolled back"),
    }
}
