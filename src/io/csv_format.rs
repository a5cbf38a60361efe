//! CSV format handling for account seeds, operations and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - Record structures for deserialization
//! - Conversion from CSV records to domain types
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::money::format_amount;
use crate::types::{Account, AccountClass, AccountId, ClientId, LedgerError, Operation};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Row of the accounts CSV: `account,client,class,balance[,active]`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub account: String,
    pub client: ClientId,
    pub class: String,
    pub balance: String,
    #[serde(default)]
    pub active: Option<String>,
}

/// Account to open before processing operations
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSeed {
    pub id: AccountId,
    pub client: ClientId,
    pub class: AccountClass,
    pub balance: Decimal,
    pub active: bool,
}

/// Row of the operations CSV: `op,account,amount[,destination][,description]`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct OperationCsvRecord {
    pub op: String,
    pub account: String,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn non_empty(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

fn parse_decimal(raw: &str, what: &str) -> Result<Decimal, String> {
    Decimal::from_str(raw.trim()).map_err(|_| format!("Invalid {} '{}'", what, raw))
}

fn parse_account_id(raw: &str) -> Result<AccountId, String> {
    AccountId::parse(raw).map_err(|e| e.to_string())
}

/// Convert an accounts CSV row into an `AccountSeed`
///
/// # Returns
///
/// * `Ok(AccountSeed)` - Row is well formed
/// * `Err(String)` - Description of the first malformed field
pub fn convert_account_record(record: AccountCsvRecord) -> Result<AccountSeed, String> {
    let id = parse_account_id(&record.account)?;
    let class = AccountClass::from_str(&record.class)?;
    let balance = parse_decimal(&record.balance, "balance")?;

    let active = match non_empty(record.active) {
        None => true,
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => return Err(format!("Invalid active flag '{}' for account {}", raw, id)),
        },
    };

    Ok(AccountSeed {
        id,
        client: record.client.trim().to_string(),
        class,
        balance,
        active,
    })
}

/// Convert an operations CSV row into an `Operation`
///
/// Amount validity (sign, precision) is left to the engine so that such rows
/// count as rejected operations rather than malformed input.
///
/// # Returns
///
/// * `Ok(Operation)` - Row is well formed
/// * `Err(String)` - Unknown op, bad identifier, missing or unparsable amount,
///   or a transfer without destination
pub fn convert_operation_record(record: OperationCsvRecord) -> Result<Operation, String> {
    let account = parse_account_id(&record.account)?;
    let amount = match non_empty(record.amount) {
        Some(raw) => parse_decimal(&raw, "amount")?,
        None => {
            return Err(format!(
                "{} on account {} requires an amount",
                record.op, account
            ))
        }
    };
    let description = non_empty(record.description)
        .map(|d| d.trim().to_string())
        .unwrap_or_default();

    match record.op.trim().to_lowercase().as_str() {
        "deposit" => Ok(Operation::Deposit {
            account,
            amount,
            description,
        }),
        "withdrawal" | "withdraw" => Ok(Operation::Withdrawal {
            account,
            amount,
            description,
        }),
        "transfer" => {
            let destination = non_empty(record.destination)
                .ok_or_else(|| format!("transfer from account {} requires a destination", account))
                .and_then(|raw| parse_account_id(&raw))?;
            Ok(Operation::Transfer {
                source: account,
                destination,
                amount,
                description,
            })
        }
        _ => Err(format!(
            "Invalid operation type: '{}' for account {}",
            record.op, account
        )),
    }
}

/// Write account states to CSV format
///
/// Writes accounts with columns: account, client, class, balance, active.
/// Accounts are sorted by identifier and balances printed with 2 decimals.
///
/// # Arguments
///
/// * `accounts` - Slice of account states to write
/// * `output` - Mutable reference to a writer for outputting CSV
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), LedgerError> {
    let mut writer = csv::Writer::from_writer(output);

    writer.write_record(["account", "client", "class", "balance", "active"])?;

    let mut sorted: Vec<&Account> = accounts.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    for account in sorted {
        let class = account.class.to_string();
        let balance = format_amount(account.balance);
        let active = if account.active { "true" } else { "false" };
        writer.write_record([
            account.id.as_str(),
            account.client.as_str(),
            class.as_str(),
            balance.as_str(),
            active,
        ])?;
    }

    writer.flush()?;
    Ok(())
}
