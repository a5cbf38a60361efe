//! Core traits for account storage, the transaction log and durability
//!
//! The engine talks to its collaborators only through these traits, so the
//! in-memory implementations can be swapped for persistent ones without
//! touching business rules.
//!
//! # Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`: implementations carry
//! their own interior synchronization and are shared behind `Arc`.

use crate::types::{Account, AccountId, EntryId, LedgerError, NewEntry, TransactionEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Keyed storage for account snapshots
///
/// The store holds the latest committed state of every account. It performs
/// no business validation; callers hold the account lock when writing.
pub trait AccountStore: Send + Sync {
    /// Fetch a copy of the account
    ///
    /// # Returns
    ///
    /// * `Ok(Account)` - snapshot of the last committed state
    /// * `Err(LedgerError::AccountNotFound)` - no such account
    fn get(&self, id: &AccountId) -> Result<Account, LedgerError>;

    /// Replace the stored state of an existing or new account
    fn save(&self, account: Account);

    /// Insert a new account
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::DuplicateAccount)` - identifier already taken
    fn insert(&self, account: Account) -> Result<(), LedgerError>;

    /// All accounts ordered by identifier
    fn list(&self) -> Vec<Account>;
}

/// Hook run by the log after numbering a batch and before publishing it
pub type AppendHook<'a> = dyn FnMut(&[TransactionEntry]) -> Result<(), LedgerError> + 'a;

/// Append-only, totally ordered record of committed operations
pub trait TransactionLog: Send + Sync {
    /// Number, timestamp and append a batch of entries atomically
    ///
    /// `hook` sees the numbered entries before they are published and runs
    /// without any log lock held, so appends on other accounts proceed
    /// meanwhile. If it fails, nothing is appended and the error is
    /// returned, so the hook is where a commit makes itself durable.
    ///
    /// # Returns
    ///
    /// The appended entries in order
    fn append_with(
        &self,
        pending: Vec<NewEntry>,
        committed_at: DateTime<Utc>,
        hook: &mut AppendHook<'_>,
    ) -> Result<Vec<TransactionEntry>, LedgerError>;

    /// Entries involving `account` with `from <= committed_at < to`, newest first
    fn query(
        &self,
        account: &AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<TransactionEntry>;

    /// The `limit` most recent entries involving `account`, newest first
    fn recent(&self, account: &AccountId, limit: usize) -> Vec<TransactionEntry>;

    /// Walk the account's entries newest first
    ///
    /// Starts at `up_to` (inclusive) when given, and stops before the first
    /// entry committed earlier than `since`.
    fn scan_back(
        &self,
        account: &AccountId,
        up_to: Option<EntryId>,
        since: DateTime<Utc>,
    ) -> Vec<TransactionEntry>;

    /// Most recent entry involving `account`
    fn latest_for(&self, account: &AccountId) -> Option<TransactionEntry>;

    /// Load previously committed entries into an empty log
    fn restore(&self, entries: Vec<TransactionEntry>) -> Result<(), LedgerError>;

    /// Total number of entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything one commit changes, in the form it is made durable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Post-commit state of every account the commit touched
    pub accounts: Vec<Account>,

    /// Log entries written by the commit (empty for account administration)
    pub entries: Vec<TransactionEntry>,
}

/// Durability boundary for commits
///
/// `persist` is called once per commit before any change becomes visible.
/// An error aborts the commit. Commits on disjoint accounts may call it
/// concurrently; calls for one account never overlap.
pub trait CommitSink: Send + Sync {
    fn persist(&self, record: &CommitRecord) -> Result<(), LedgerError>;
}

/// Sink for purely in-memory ledgers
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl CommitSink for NullSink {
    fn persist(&self, _record: &CommitRecord) -> Result<(), LedgerError> {
        Ok(())
    }
}
