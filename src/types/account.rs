//! Account-related types for the ledger engine
//!
//! This module defines the account identifier, the account class and the
//! `Account` record held by the account store.

use super::error::LedgerError;
use super::transaction::EntryId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Owning client reference (national identity number or similar)
pub type ClientId = String;

/// Bank account identifier in IBAN-like form
///
/// Two uppercase letters, two check digits, then 11 to 30 uppercase
/// alphanumerics. Parsing strips whitespace and upper-cases letters, so
/// `cm76 0001 0000 0000 0001` and `CM7600010000000001` are the same account.
///
/// Identifiers are totally ordered; the engine acquires account locks in
/// this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Shortest accepted identifier
    pub const MIN_LEN: usize = 15;

    /// Longest accepted identifier
    pub const MAX_LEN: usize = 34;

    /// Parse and normalize an account identifier
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        let bytes = normalized.as_bytes();

        let well_formed = (Self::MIN_LEN..=Self::MAX_LEN).contains(&bytes.len())
            && bytes[..2].iter().all(u8::is_ascii_uppercase)
            && bytes[2..4].iter().all(u8::is_ascii_digit)
            && bytes[4..]
                .iter()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());

        if !well_formed {
            return Err(LedgerError::invalid_account_id(raw));
        }

        Ok(Self(normalized))
    }

    /// The normalized identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AccountId {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

/// Account class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    /// Everyday current account
    Current,
    /// Savings account
    Savings,
}

impl fmt::Display for AccountClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountClass::Current => f.write_str("current"),
            AccountClass::Savings => f.write_str("savings"),
        }
    }
}

impl FromStr for AccountClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "current" => Ok(AccountClass::Current),
            "savings" => Ok(AccountClass::Savings),
            other => Err(format!("Invalid account class: '{}'", other)),
        }
    }
}

/// Bank account state
///
/// Accounts are never deleted. Closing an account clears `active`; closed
/// accounts stay readable but reject new operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Immutable account identifier
    pub id: AccountId,

    /// Owning client
    pub client: ClientId,

    /// Current balance, never negative
    pub balance: Decimal,

    /// Current or savings
    pub class: AccountClass,

    /// Cleared when the account is closed
    pub active: bool,

    /// When the account was opened
    pub created_at: DateTime<Utc>,

    /// Most recent log entry reflected in `balance`
    ///
    /// Readers use it to pair this snapshot with exactly the log prefix it
    /// was computed from.
    pub last_entry: Option<EntryId>,
}

impl Account {
    /// Create a new active account
    pub fn new(
        id: AccountId,
        client: impl Into<ClientId>,
        class: AccountClass,
        balance: Decimal,
        created_at: DateTime<Utc>,
    ) -> Self {
        Account {
            id,
            client: client.into(),
            balance,
            class,
            active: true,
            created_at,
            last_entry: None,
        }
    }

    /// Fail with `AccountInactive` unless the account is open
    pub fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.active {
            Ok(())
        } else {
            Err(LedgerError::account_inactive(&self.id))
        }
    }
}
