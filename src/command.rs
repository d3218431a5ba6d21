use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::account::{AccountId, BALANCE_SCALE};

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Transfer,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCommand {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCommand {
    pub id: AccountId,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Transfer amount must be positive with at most 2 decimal places, got {amount}")]
    InvalidAmount { amount: Decimal },
    #[error("Field `{field}` is required for {kind:?}")]
    FieldRequired {
        kind: OperationKind,
        field: &'static str,
    },
}

impl TransferCommand {
    /// Amounts finer than a cent are rejected, stored balances keep
    /// [`BALANCE_SCALE`] decimal places.
    pub fn new(from: AccountId, to: AccountId, amount: Decimal) -> Result<Self, CommandError> {
        if amount <= Decimal::ZERO || amount.normalize().scale() > BALANCE_SCALE {
            return Err(CommandError::InvalidAmount { amount });
        }
        Ok(Self { from, to, amount })
    }

    pub fn is_self_transfer(&self) -> bool {
        self.from == self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountCommand {
    Transfer(TransferCommand),
    Delete(DeleteCommand),
}

impl AccountCommand {
    /// For `Delete` the account id is taken from `from`, `to` and `amount` are ignored.
    pub fn parse_command(
        kind: OperationKind,
        from: Option<AccountId>,
        to: Option<AccountId>,
        amount: Option<Decimal>,
    ) -> Result<Self, CommandError> {
        let required = |field: &'static str| CommandError::FieldRequired { kind, field };
        match kind {
            OperationKind::Transfer => {
                let from = from.ok_or_else(|| required("from"))?;
                let to = to.ok_or_else(|| required("to"))?;
                let amount = amount.ok_or_else(|| required("amount"))?;
                Ok(Self::Transfer(TransferCommand::new(from, to, amount)?))
            }
            OperationKind::Delete => {
                let id = from.ok_or_else(|| required("from"))?;
                Ok(Self::Delete(DeleteCommand { id }))
            }
        }
    }
}
