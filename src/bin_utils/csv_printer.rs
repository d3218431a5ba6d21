use std::io::Write;

use crate::account::{self, AccountId};
use csv::Writer;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AccountRow {
    pub id: AccountId,
    pub name: String,
    pub balance: Decimal,
}

impl From<account::Account> for AccountRow {
    fn from(acc: account::Account) -> Self {
        Self {
            id: acc.id(),
            name: acc.name().to_string(),
            balance: acc.balance(),
        }
    }
}

pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl Iterator<Item = AccountRow>,
) -> anyhow::Result<()>
where
    W: Write,
{
    let mut writer = Writer::from_writer(output);
    for acc in accounts {
        if let Err(err) = writer.serialize(acc) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn print_header_and_rows() {
        let mut output = Vec::new();
        print_accounts(
            &mut output,
            [
                account::Account::new(1, "Bruce", dec!(50.00)),
                account::Account::new(2, "Clark Kent", dec!(150.5)),
            ]
            .into_iter()
            .map(AccountRow::from),
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "id,name,balance\n1,Bruce,50.00\n2,Clark Kent,150.5\n"
        );
    }
}
