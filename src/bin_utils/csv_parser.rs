use std::{io::Read, marker::PhantomData};

use crate::{account::AccountId, command::OperationKind};
use csv::{StringRecord, Trim};
use rust_decimal::Decimal;
use serde::{Deserialize, de::DeserializeOwned};

#[derive(Debug, Deserialize)]
pub struct Operation {
    pub op: OperationKind,
    pub from: Option<AccountId>,
    pub to: Option<AccountId>,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct SeedAccount {
    pub name: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub balance: Decimal,
}

/// Parses CSV rows with a header line.
///
/// Yields the line number of each row with its parse result, a malformed row
/// does not stop the iteration. Reading stops at the first I/O error.
pub struct CsvRecordParser<R, T> {
    reader: csv::Reader<R>,
    headers: StringRecord,
    record: StringRecord,
    done: bool,
    _row: PhantomData<T>,
}

impl<R, T> CsvRecordParser<R, T>
where
    R: Read,
    T: DeserializeOwned,
{
    pub fn new(source: R) -> csv::Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(source);
        let headers = reader.headers()?.clone();

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
            done: false,
            _row: PhantomData,
        })
    }
}

impl<R, T> Iterator for CsvRecordParser<R, T>
where
    R: Read,
    T: DeserializeOwned,
{
    type Item = (u64, csv::Result<T>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record(&mut self.record) {
            Ok(true) => {
                let line = self.record.position().map_or(0, |pos| pos.line());
                Some((line, self.record.deserialize(Some(&self.headers))))
            }
            Ok(false) => None,
            Err(err) => {
                self.done = true;
                let line = err.position().map_or(0, |pos| pos.line());
                Some((line, Err(err)))
            }
        }
    }
}
