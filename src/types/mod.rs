//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: account identifier, class and record
//! - `transaction`: log entries and their kinds
//! - `operation`: operation requests and commit receipts
//! - `money`: amount validation and formatting
//! - `error`: error types for the ledger engine

pub mod account;
pub mod error;
pub mod money;
pub mod operation;
pub mod transaction;

pub use account::{Account, AccountClass, AccountId, ClientId};
pub use error::LedgerError;
pub use operation::{DepositReceipt, Operation, Receipt, TransferReceipt, WithdrawalReceipt};
pub use transaction::{Direction, EntryId, NewEntry, TransactionEntry, TransactionKind};
