//! Per-account exclusive locks
//!
//! # Design
//!
//! Each account gets its own `parking_lot::Mutex<()>`, created on first use
//! and kept in a `DashMap`. An operation that touches several accounts takes
//! their locks one by one in ascending identifier order, which rules out
//! lock-order cycles between any two operations.
//!
//! Waiting is bounded: all locks of one acquisition share a single deadline.
//! When it passes, the locks already held are released (by dropping their
//! guards) and the caller gets `LedgerError::Busy` naming the account whose
//! lock could not be taken.

use crate::types::{AccountId, LedgerError};
use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

type AccountGuard = ArcMutexGuard<RawMutex, ()>;

/// Registry of account locks
#[derive(Debug, Default)]
pub struct LockTable {
    locks: DashMap<AccountId, Arc<Mutex<()>>>,
}

/// Locks held by one operation
///
/// Dropping the set releases every lock it holds.
pub struct LockSet {
    held: Vec<(AccountId, AccountGuard)>,
}

impl fmt::Debug for LockSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.accounts()).finish()
    }
}

impl LockSet {
    /// Whether this set holds the lock on `id`
    pub fn holds(&self, id: &AccountId) -> bool {
        self.held.iter().any(|(held, _)| held == id)
    }

    /// Locked accounts in acquisition order
    pub fn accounts(&self) -> impl Iterator<Item = &AccountId> {
        self.held.iter().map(|(id, _)| id)
    }
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, id: &AccountId) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(id.clone()).or_default())
    }

    /// Acquire the locks on `ids` in ascending order
    ///
    /// Duplicate identifiers are locked once.
    ///
    /// # Arguments
    ///
    /// * `ids` - Accounts to lock, in any order
    /// * `timeout` - Longest total wait across all locks
    ///
    /// # Returns
    ///
    /// * `Ok(LockSet)` - every requested lock is held
    /// * `Err(LedgerError::Busy)` - a lock was not obtained before the deadline;
    ///   no lock is held on return
    pub fn acquire<'a, I>(&self, ids: I, timeout: Duration) -> Result<LockSet, LedgerError>
    where
        I: IntoIterator<Item = &'a AccountId>,
    {
        let mut ordered: Vec<&AccountId> = ids.into_iter().collect();
        ordered.sort();
        ordered.dedup();

        let deadline = Instant::now() + timeout;
        let mut held = Vec::with_capacity(ordered.len());

        for id in ordered {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let guard = self
                .lock_for(id)
                .try_lock_arc_for(remaining)
                .ok_or_else(|| LedgerError::busy(id, timeout))?;
            held.push((id.clone(), guard));
        }

        Ok(LockSet { held })
    }

    /// Number of accounts that have ever been locked
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
