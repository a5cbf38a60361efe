//! Error types for the ledger engine
//!
//! Every failure the engine can report is a variant of [`LedgerError`]. Validation
//! errors carry the context a caller needs to render a precise message (current
//! balance, remaining allowance, offending account).
//!
//! # Error Categories
//!
//! - **Validation**: invalid amount or identifier, unknown or inactive account,
//!   insufficient balance, daily limit, self-transfer, bad statistics window
//! - **Contention**: `Busy`, raised when account locks cannot be taken in time
//! - **Storage**: `StorageFailure`, raised when a commit could not be made durable
//! - **Input**: I/O and CSV parse errors surfaced by the batch CLI
//! - **Processing**: `WorkerFailed`, raised when a batch lane dies mid-batch
//!
//! Only `Busy` and `StorageFailure` are retryable: the engine guarantees that
//! neither leaves a partial effect behind.

use super::account::AccountId;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the ledger engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// Amount is zero, negative, too precise, or would overflow a balance
    #[error("Invalid amount {amount}: amounts must be positive with at most 2 decimal places")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// Account identifier does not have the bank-number shape
    #[error("Invalid account identifier '{value}'")]
    InvalidAccountId {
        /// The raw identifier as supplied
        value: String,
    },

    /// No account with this identifier exists
    #[error("Account {account} not found")]
    AccountNotFound {
        /// The unknown account
        account: AccountId,
    },

    /// The account has been closed and rejects new operations
    #[error("Account {account} is inactive")]
    AccountInactive {
        /// The closed account
        account: AccountId,
    },

    /// An account with this identifier is already open
    #[error("Account {account} already exists")]
    DuplicateAccount {
        /// The existing account
        account: AccountId,
    },

    /// Withdrawal or transfer larger than the current balance
    #[error("Insufficient balance on account {account}: balance {balance}, requested {requested}")]
    InsufficientBalance {
        /// Account being debited
        account: AccountId,
        /// Balance at the time of the check
        balance: Decimal,
        /// Requested debit
        requested: Decimal,
    },

    /// Withdrawal would push today's total over the configured ceiling
    #[error(
        "Daily withdrawal limit exceeded on account {account}: remaining allowance {remaining}, requested {requested}"
    )]
    DailyLimitExceeded {
        /// Account being debited
        account: AccountId,
        /// Allowance left for the current calendar day
        remaining: Decimal,
        /// Requested withdrawal
        requested: Decimal,
    },

    /// Transfer whose source and destination are the same account
    #[error("Cannot transfer from account {account} to itself")]
    SameAccountTransfer {
        /// The account named on both sides
        account: AccountId,
    },

    /// Exclusive access to an account could not be obtained in time
    ///
    /// Retryable: nothing was applied.
    #[error("Account {account} is busy: lock not acquired within {waited_ms} ms")]
    Busy {
        /// The account whose lock timed out
        account: AccountId,
        /// Configured wait in milliseconds
        waited_ms: u64,
    },

    /// The commit could not be made durable and was rolled back in full
    ///
    /// Retryable: balances and log are unchanged.
    #[error("Storage failure: {message}")]
    StorageFailure {
        /// Description of the underlying failure
        message: String,
    },

    /// Statistics window is empty, reversed, or too long
    #[error("Invalid range {from} to {to}: {reason}")]
    InvalidRange {
        /// First requested day
        from: NaiveDate,
        /// Last requested day
        to: NaiveDate,
        /// Why the window was rejected
        reason: String,
    },

    /// I/O error while reading or writing files
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// A batch lane panicked; its operations may be partly applied
    #[error("Worker failed: {message}")]
    WorkerFailed {
        /// Description of the failure
        message: String,
    },

    /// Malformed input record
    #[error("Parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Parse {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::Parse {
            line,
            message: error.to_string(),
        }
    }
}

// Journal encoding happens inside a commit, so a serialization failure is a storage failure.
impl From<serde_json::Error> for LedgerError {
    fn from(error: serde_json::Error) -> Self {
        LedgerError::StorageFailure {
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Whether the caller may safely retry the same operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::Busy { .. } | LedgerError::StorageFailure { .. }
        )
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal) -> Self {
        LedgerError::InvalidAmount { amount }
    }

    /// Create an InvalidAccountId error
    pub fn invalid_account_id(value: &str) -> Self {
        LedgerError::InvalidAccountId {
            value: value.to_string(),
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(account: &AccountId) -> Self {
        LedgerError::AccountNotFound {
            account: account.clone(),
        }
    }

    /// Create an AccountInactive error
    pub fn account_inactive(account: &AccountId) -> Self {
        LedgerError::AccountInactive {
            account: account.clone(),
        }
    }

    /// Create a DuplicateAccount error
    pub fn duplicate_account(account: &AccountId) -> Self {
        LedgerError::DuplicateAccount {
            account: account.clone(),
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(account: &AccountId, balance: Decimal, requested: Decimal) -> Self {
        LedgerError::InsufficientBalance {
            account: account.clone(),
            balance,
            requested,
        }
    }

    /// Create a DailyLimitExceeded error
    pub fn daily_limit_exceeded(account: &AccountId, remaining: Decimal, requested: Decimal) -> Self {
        LedgerError::DailyLimitExceeded {
            account: account.clone(),
            remaining,
            requested,
        }
    }

    /// Create a SameAccountTransfer error
    pub fn same_account_transfer(account: &AccountId) -> Self {
        LedgerError::SameAccountTransfer {
            account: account.clone(),
        }
    }

    /// Create a Busy error
    pub fn busy(account: &AccountId, waited: Duration) -> Self {
        LedgerError::Busy {
            account: account.clone(),
            waited_ms: u64::try_from(waited.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create a StorageFailure error
    pub fn storage_failure(message: impl Into<String>) -> Self {
        LedgerError::StorageFailure {
            message: message.into(),
        }
    }

    /// Create an InvalidRange error
    pub fn invalid_range(from: NaiveDate, to: NaiveDate, reason: &str) -> Self {
        LedgerError::InvalidRange {
            from,
            to,
            reason: reason.to_string(),
        }
    }

    /// Create a WorkerFailed error
    pub fn worker_failed(message: impl Into<String>) -> Self {
        LedgerError::WorkerFailed {
            message: message.into(),
        }
    }

    /// Create a Parse error
    pub fn parse(line: Option<u64>, message: impl Into<String>) -> Self {
        LedgerError::Parse {
            line,
            message: message.into(),
        }
    }
}
