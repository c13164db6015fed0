//! CSV format handling for ledger commands and balance output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to `LedgerCommand`s
//! - Balance output serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Input Format
//!
//! ```text
//! type,account,to,amount,tx
//! deposit,1,,1000.0,
//! withdraw,1,,200,
//! transfer,1,2,300,
//! rollback,,,,2
//! ```
//!
//! Unused columns are left empty. `withdrawal` is accepted as an alias of
//! `withdraw`, and type names are case-insensitive.

use std::io::Write;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::types::{AccountId, Balance, LedgerCommand, LedgerError, TransactionId};

/// CSV record structure for deserialization
///
/// Every column except `type` is optional; which ones are required depends on
/// the command type.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub tx_type: String,
    pub account: Option<AccountId>,
    pub to: Option<AccountId>,
    pub amount: Option<String>,
    pub tx: Option<TransactionId>,
}

/// Convert a CsvRecord to a LedgerCommand
///
/// Only the shape of the record is checked here. Amount sign and account
/// rules are enforced by the ledger when the command is applied.
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
/// * `line` - Source line, attached to any error
///
/// # Returns
///
/// * `Ok(LedgerCommand)` - Successfully converted command
/// * `Err(LedgerError::ParseError)` - The record is not a valid command
pub fn convert_csv_record(
    csv_record: CsvRecord,
    line: Option<u64>,
) -> Result<LedgerCommand, LedgerError> {
    let kind = csv_record.tx_type.trim().to_lowercase();

    let command = match kind.as_str() {
        "deposit" => LedgerCommand::Credit {
            account: require(csv_record.account, "account", &kind, line)?,
            amount: parse_amount(csv_record.amount.as_deref(), &kind, line)?,
        },
        "withdraw" | "withdrawal" => LedgerCommand::Debit {
            account: require(csv_record.account, "account", &kind, line)?,
            amount: parse_amount(csv_record.amount.as_deref(), &kind, line)?,
        },
        "transfer" => LedgerCommand::Transfer {
            from: require(csv_record.account, "account", &kind, line)?,
            to: require(csv_record.to, "to", &kind, line)?,
            amount: parse_amount(csv_record.amount.as_deref(), &kind, line)?,
        },
        "rollback" => LedgerCommand::Rollback {
            tx: require(csv_record.tx, "tx", &kind, line)?,
        },
        _ => {
            return Err(LedgerError::parse_error(
                line,
                format!("Invalid command type: '{}'", csv_record.tx_type),
            ))
        }
    };

    Ok(command)
}

fn require<T>(
    value: Option<T>,
    column: &str,
    kind: &str,
    line: Option<u64>,
) -> Result<T, LedgerError> {
    value.ok_or_else(|| {
        LedgerError::parse_error(line, format!("{} requires a '{}' value", kind, column))
    })
}

fn parse_amount(raw: Option<&str>, kind: &str, line: Option<u64>) -> Result<Decimal, LedgerError> {
    match raw.map(str::trim) {
        Some(text) if !text.is_empty() => Decimal::from_str(text)
            .map_err(|_| LedgerError::parse_error(line, format!("Invalid amount '{}'", text))),
        _ => Err(LedgerError::parse_error(
            line,
            format!("{} requires an amount", kind),
        )),
    }
}

/// Write balances to CSV format
///
/// Writes balances in CSV format with columns: account, balance.
/// Balances are sorted by account id for deterministic output and printed
/// with four decimal places.
///
/// # Arguments
///
/// * `balances` - Slice of balance snapshots to write
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_balances_csv(balances: &[Balance], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "balance"])?;

    let mut sorted = balances.to_vec();
    sorted.sort_by_key(|balance| balance.account);

    for balance in sorted {
        writer.write_record(&[balance.account.to_string(), format!("{:.4}", balance.amount)])?;
    }

    writer.flush()?;
    Ok(())
}
