//! Drives [`crate::service::TransferService`] from CSV files for the
//! `cute-teller` binary. Kept in the library so the integration tests can run
//! the same code path.

use std::io::{Read, Write};

use crate::{
    command::AccountCommand,
    service::{Outcome, ServiceError, TransferService},
    store::AccountStore,
};
use anyhow::{Context, Result};
use csv_parser::{CsvRecordParser, Operation, SeedAccount};
use csv_printer::{AccountRow, print_accounts};
use thiserror::Error;
use tracing::info;

pub mod csv_parser;
pub mod csv_printer;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Malformed row: {0}")]
    Parse(#[from] csv::Error),
    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Creates one account per `name,balance` row, in row order.
pub async fn seed_accounts<S, R>(store: &S, source: R) -> Result<usize>
where
    S: AccountStore,
    R: Read,
{
    let parser = CsvRecordParser::<R, SeedAccount>::new(source).context("Invalid seed header")?;
    let mut created = 0;
    for (line, row) in parser {
        let seed = row.with_context(|| format!("Invalid seed account at line {line}"))?;
        store
            .create(&seed.name, seed.balance)
            .await
            .with_context(|| format!("Failed to seed account at line {line}"))?;
        created += 1;
    }
    info!(created, "Seeded accounts");
    Ok(created)
}

pub struct Script<'w, R, W: 'w> {
    pub operations: R,
    pub output: &'w mut W,
    pub success_printer: Box<dyn FnMut(u64, Outcome)>,
    pub error_printer: Box<dyn FnMut(u64, ScriptError)>,
}

impl<'w, R, W> Script<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    /// Runs every operation, then prints the remaining accounts.
    pub async fn run<S>(mut self, service: &TransferService<S>) -> Result<()>
    where
        S: AccountStore,
    {
        let parser = CsvRecordParser::<R, Operation>::new(self.operations)
            .context("Invalid operations header")?;

        for (line, row) in parser {
            match Self::execute_row(service, row).await {
                Ok(outcome) => (self.success_printer)(line, outcome),
                Err(err) => (self.error_printer)(line, err),
            }
        }

        let accounts = service
            .store()
            .accounts()
            .await
            .context("Failed to list accounts")?;
        print_accounts(self.output, accounts.into_iter().map(AccountRow::from))
    }

    async fn execute_row<S>(
        service: &TransferService<S>,
        row: csv::Result<Operation>,
    ) -> Result<Outcome, ScriptError>
    where
        S: AccountStore,
    {
        let row = row?;
        let command = AccountCommand::parse_command(row.op, row.from, row.to, row.amount)
            .map_err(ServiceError::from)?;
        Ok(service.execute(command).await?)
    }
}
