use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

pub type AccountId = i32;

/// Decimal places a stored balance keeps.
pub const BALANCE_SCALE: u32 = 2;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BalanceChangeKind {
    Debited,
    Credited,
}

/// Validated change to an account balance, produced by the `handle_*`
/// methods and applied with [`Account::apply`].
#[derive(Debug)]
pub struct BalanceChange {
    account_id: AccountId,
    amount: Decimal,
    balance_after: Decimal,
    kind: BalanceChangeKind,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AccountError {
    #[error("Account with id={0} does not exist")]
    NotFound(AccountId),
    #[error(
        "Insufficient funds: account id={id} holds {balance}, but a transfer of {requested} was requested"
    )]
    InsufficientFunds {
        id: AccountId,
        balance: Decimal,
        requested: Decimal,
    },
    #[error("Account id={id} cannot be removed while its balance is {balance}")]
    NonZeroBalance { id: AccountId, balance: Decimal },
    #[error("Balance of account id={id} would overflow when changed by {amount}")]
    BalanceOverflow { id: AccountId, amount: Decimal },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    name: String,
    balance: Decimal,
}

impl Account {
    /// Only stores hand out new accounts, ids are assigned by them.
    pub fn new(id: AccountId, name: impl Into<String>, balance: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            balance,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn apply(&mut self, change: &BalanceChange) {
        debug_assert_eq!(change.account_id, self.id);
        self.balance = change.balance_after;
    }

    pub fn handle_debit(&self, amount: Decimal) -> Result<BalanceChange, AccountError> {
        if self.balance < amount {
            return Err(AccountError::InsufficientFunds {
                id: self.id,
                balance: self.balance,
                requested: amount,
            });
        }
        let balance_after = self
            .balance
            .checked_sub(amount)
            .ok_or(AccountError::BalanceOverflow { id: self.id, amount })?;
        Ok(BalanceChange {
            account_id: self.id,
            amount,
            balance_after,
            kind: BalanceChangeKind::Debited,
        })
    }

    pub fn handle_credit(&self, amount: Decimal) -> Result<BalanceChange, AccountError> {
        let balance_after = self
            .balance
            .checked_add(amount)
            .ok_or(AccountError::BalanceOverflow { id: self.id, amount })?;
        Ok(BalanceChange {
            account_id: self.id,
            amount,
            balance_after,
            kind: BalanceChangeKind::Credited,
        })
    }

    /// Exact comparison, `0.00` counts as zero.
    pub fn ensure_removable(&self) -> Result<(), AccountError> {
        if self.balance.is_zero() {
            Ok(())
        } else {
            Err(AccountError::NonZeroBalance {
                id: self.id,
                balance: self.balance,
            })
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (id={})", self.name, self.id)
    }
}
