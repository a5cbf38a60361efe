//! Transaction-related types for the ledger engine
//!
//! This module defines the immutable log entry written for every committed
//! deposit, withdrawal and transfer, and the pending form it takes inside a
//! unit of work before the log assigns its sequence number.

use super::account::AccountId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log sequence number
///
/// Assigned by the transaction log at commit time, starting at 1 and
/// increasing by one per entry.
pub type EntryId = u64;

/// Kinds of balance-affecting operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    /// Credit to the source account
    Deposit,

    /// Debit from the source account, subject to the daily ceiling
    Withdrawal,

    /// Debit from the source, credit to the destination
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Deposit => f.write_str("DEPOSIT"),
            TransactionKind::Withdrawal => f.write_str("WITHDRAWAL"),
            TransactionKind::Transfer => f.write_str("TRANSFER"),
        }
    }
}

/// Whether an entry brought money into or out of a given account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Committed log entry
///
/// Created exactly once by the transaction log and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    /// Sequence number, unique and increasing
    pub id: EntryId,

    /// Deposit, withdrawal or transfer
    pub kind: TransactionKind,

    /// Account credited (deposit) or debited (withdrawal, transfer)
    pub source: AccountId,

    /// Credited account, present only for transfers
    pub destination: Option<AccountId>,

    /// Strictly positive amount
    pub amount: Decimal,

    /// Free-text description supplied by the caller
    pub description: String,

    /// Commit timestamp
    pub committed_at: DateTime<Utc>,
}

impl TransactionEntry {
    /// Whether the account appears as source or destination
    pub fn involves(&self, account: &AccountId) -> bool {
        &self.source == account || self.destination.as_ref() == Some(account)
    }

    /// Direction of this entry as seen from `account`
    ///
    /// Returns `None` when the account is not involved.
    pub fn direction_for(&self, account: &AccountId) -> Option<Direction> {
        match self.kind {
            TransactionKind::Deposit if &self.source == account => Some(Direction::Incoming),
            TransactionKind::Withdrawal if &self.source == account => Some(Direction::Outgoing),
            TransactionKind::Transfer if &self.source == account => Some(Direction::Outgoing),
            TransactionKind::Transfer if self.destination.as_ref() == Some(account) => {
                Some(Direction::Incoming)
            }
            _ => None,
        }
    }

    /// Signed balance change this entry caused on `account`
    pub fn effect_on(&self, account: &AccountId) -> Decimal {
        match self.direction_for(account) {
            Some(Direction::Incoming) => self.amount,
            Some(Direction::Outgoing) => -self.amount,
            None => Decimal::ZERO,
        }
    }
}

/// Entry staged inside a unit of work, not yet numbered or timestamped
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub kind: TransactionKind,
    pub source: AccountId,
    pub destination: Option<AccountId>,
    pub amount: Decimal,
    pub description: String,
}

impl NewEntry {
    pub fn deposit(account: AccountId, amount: Decimal, description: &str) -> Self {
        NewEntry {
            kind: TransactionKind::Deposit,
            source: account,
            destination: None,
            amount,
            description: description.to_string(),
        }
    }

    pub fn withdrawal(account: AccountId, amount: Decimal, description: &str) -> Self {
        NewEntry {
            kind: TransactionKind::Withdrawal,
            source: account,
            destination: None,
            amount,
            description: description.to_string(),
        }
    }

    pub fn transfer(
        source: AccountId,
        destination: AccountId,
        amount: Decimal,
        description: &str,
    ) -> Self {
        NewEntry {
            kind: TransactionKind::Transfer,
            source,
            destination: Some(destination),
            amount,
            description: description.to_string(),
        }
    }

    /// Number and timestamp the entry
    pub fn into_entry(self, id: EntryId, committed_at: DateTime<Utc>) -> TransactionEntry {
        TransactionEntry {
            id,
            kind: self.kind,
            source: self.source,
            destination: self.destination,
            amount: self.amount,
            description: self.description,
            committed_at,
        }
    }
}
