//! Atomic application of one operation
//!
//! # Design
//!
//! A `UnitOfWork` owns the locks of the accounts an operation touches and a
//! private staging area. Business rules read and modify staged copies of
//! accounts; nothing is visible to anyone else until `commit`, which:
//!
//! 1. asks the transaction log to number the staged entries,
//! 2. inside the log's append hook, stamps each staged account with the last
//!    entry it reflects and hands the whole change to the commit sink,
//! 3. publishes the log entries (done by the log once the hook succeeded),
//! 4. writes the staged accounts back to the account store.
//!
//! If the sink fails, the log appends nothing and the store is untouched.
//! Dropping a unit of work without committing discards the staging area and
//! releases the locks, so every early `?` return is a rollback.
//!
//! Readers may see a new log entry before the matching account snapshot
//! lands; they pair a snapshot with the log through `Account::last_entry`.

use super::clock::Clock;
use super::lock_table::{LockSet, LockTable};
use super::traits::{AccountStore, CommitRecord, CommitSink, TransactionLog};
use crate::types::{Account, AccountId, LedgerError, NewEntry, TransactionEntry};
use chrono::{DateTime, Utc};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::time::Duration;

/// Collaborators a unit of work commits through
#[derive(Clone, Copy)]
pub struct Stores<'a> {
    pub accounts: &'a dyn AccountStore,
    pub log: &'a dyn TransactionLog,
    pub sink: &'a dyn CommitSink,
    pub clock: &'a dyn Clock,
}

/// Locked, staged change set for one operation
pub struct UnitOfWork<'a> {
    stores: Stores<'a>,
    locks: LockSet,
    staged: BTreeMap<AccountId, Account>,
    pending: Vec<NewEntry>,
    now: DateTime<Utc>,
}

impl<'a> UnitOfWork<'a> {
    /// Lock `ids` and open a staging area
    ///
    /// The commit timestamp is fixed here: the clock reading, raised if needed
    /// so that it is not earlier than any entry already committed on the
    /// locked accounts. Per-account history therefore stays ordered in time
    /// even if the clock steps backwards.
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::Busy)` - a lock was not obtained within `timeout`
    pub fn begin(
        stores: Stores<'a>,
        lock_table: &LockTable,
        ids: &[&AccountId],
        timeout: Duration,
    ) -> Result<Self, LedgerError> {
        let locks = lock_table.acquire(ids.iter().copied(), timeout)?;

        let now = locks
            .accounts()
            .filter_map(|id| stores.log.latest_for(id))
            .map(|entry| entry.committed_at)
            .fold(stores.clock.now(), |now, committed| now.max(committed));

        Ok(Self {
            stores,
            locks,
            staged: BTreeMap::new(),
            pending: Vec::new(),
            now,
        })
    }

    /// Timestamp this unit of work will commit with
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn ensure_locked(&self, id: &AccountId) -> Result<(), LedgerError> {
        if self.locks.holds(id) {
            Ok(())
        } else {
            Err(LedgerError::storage_failure(format!(
                "account {} accessed without holding its lock",
                id
            )))
        }
    }

    /// Staged copy of a locked account, loaded on first access
    pub fn account(&mut self, id: &AccountId) -> Result<&Account, LedgerError> {
        self.account_mut(id).map(|account| &*account)
    }

    /// Mutable staged copy of a locked account
    pub fn account_mut(&mut self, id: &AccountId) -> Result<&mut Account, LedgerError> {
        self.ensure_locked(id)?;

        match self.staged.entry(id.clone()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let account = self.stores.accounts.get(id)?;
                Ok(slot.insert(account))
            }
        }
    }

    /// Stage a brand new account
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::DuplicateAccount)` - the identifier is taken
    pub fn create(&mut self, account: Account) -> Result<(), LedgerError> {
        self.ensure_locked(&account.id)?;

        if self.staged.contains_key(&account.id) || self.stores.accounts.get(&account.id).is_ok() {
            return Err(LedgerError::duplicate_account(&account.id));
        }

        self.staged.insert(account.id.clone(), account);
        Ok(())
    }

    /// Stage a log entry
    pub fn stage(&mut self, entry: NewEntry) {
        self.pending.push(entry);
    }

    /// Make every staged change durable and visible
    ///
    /// # Returns
    ///
    /// The committed log entries, in order
    pub fn commit(self) -> Result<Vec<TransactionEntry>, LedgerError> {
        let UnitOfWork {
            stores,
            locks,
            mut staged,
            pending,
            now,
        } = self;

        let committed = stores.log.append_with(pending, now, &mut |entries| {
            for entry in entries {
                for account in staged.values_mut().filter(|a| entry.involves(&a.id)) {
                    account.last_entry = Some(entry.id);
                }
            }

            stores.sink.persist(&CommitRecord {
                accounts: staged.values().cloned().collect(),
                entries: entries.to_vec(),
            })
        })?;

        for account in staged.into_values() {
            stores.accounts.save(account);
        }

        drop(locks);
        Ok(committed)
    }

    /// Commit a unit of work that staged exactly one log entry
    pub fn commit_entry(self) -> Result<TransactionEntry, LedgerError> {
        self.commit()?
            .pop()
            .ok_or_else(|| LedgerError::storage_failure("commit produced no log entry"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::account_store::InMemoryAccountStore;
    use crate::core::clock::ManualClock;
    use crate::core::traits::NullSink;
    use crate::core::transaction_log::InMemoryTransactionLog;
    use crate::types::AccountClass;
    use chrono::{TimeDelta, TimeZone};
    use rust_decimal::Decimal;

    fn id(n: u8) -> AccountId {
        AccountId::parse(&format!("CM76000100000000000000{:02}", n)).unwrap()
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 0, 0).unwrap()
    }

    struct FailingSink;

    impl CommitSink for FailingSink {
        fn persist(&self, _record: &CommitRecord) -> Result<(), LedgerError> {
            Err(LedgerError::storage_failure("disk full"))
        }
    }

    struct Fixture {
        accounts: InMemoryAccountStore,
        log: InMemoryTransactionLog,
        clock: ManualClock,
        locks: LockTable,
    }

    impl Fixture {
        fn new() -> Self {
            let accounts = InMemoryAccountStore::new();
            for n in [1, 2] {
                accounts
                    .insert(Account::new(
                        id(n),
                        "client",
                        AccountClass::Current,
                        Decimal::new(100, 0),
                        start(),
                    ))
                    .unwrap();
            }
            Self {
                accounts,
                log: InMemoryTransactionLog::new(),
                clock: ManualClock::new(start()),
                locks: LockTable::new(),
            }
        }

        fn stores<'a>(&'a self, sink: &'a dyn CommitSink) -> Stores<'a> {
            Stores {
                accounts: &self.accounts,
                log: &self.log,
                sink,
                clock: &self.clock,
            }
        }

        fn deposit(&self, sink: &dyn CommitSink, n: u8, amount: i64) -> Result<TransactionEntry, LedgerError> {
            let mut uow =
                UnitOfWork::begin(self.stores(sink), &self.locks, &[&id(n)], Duration::from_millis(50))?;
            uow.account_mut(&id(n))?.balance += Decimal::new(amount, 0);
            uow.stage(NewEntry::deposit(id(n), Decimal::new(amount, 0), ""));
            uow.commit_entry()
        }
    }

    #[test]
    fn test_commit_publishes_balance_and_entry() {
        let fx = Fixture::new();

        let entry = fx.deposit(&NullSink, 1, 50).unwrap();

        let account = fx.accounts.get(&id(1)).unwrap();
        assert_eq!(account.balance, Decimal::new(150, 0));
        assert_eq!(account.last_entry, Some(entry.id));
        assert_eq!(entry.committed_at, start());
        assert_eq!(fx.log.len(), 1);
    }

    #[test]
    fn test_sink_failure_rolls_back_everything() {
        let fx = Fixture::new();

        let result = fx.deposit(&FailingSink, 1, 50);

        assert_eq!(result, Err(LedgerError::storage_failure("disk full")));
        assert_eq!(fx.accounts.get(&id(1)).unwrap().balance, Decimal::new(100, 0));
        assert!(fx.log.is_empty());
        // locks were released
        assert!(fx.deposit(&NullSink, 1, 1).is_ok());
    }

    #[test]
    fn test_drop_without_commit_discards_changes() {
        let fx = Fixture::new();

        {
            let mut uow = UnitOfWork::begin(
                fx.stores(&NullSink),
                &fx.locks,
                &[&id(1)],
                Duration::from_millis(50),
            )
            .unwrap();
            uow.account_mut(&id(1)).unwrap().balance = Decimal::ZERO;
        }

        assert_eq!(fx.accounts.get(&id(1)).unwrap().balance, Decimal::new(100, 0));
    }

    #[test]
    fn test_unlocked_account_is_refused() {
        let fx = Fixture::new();
        let mut uow = UnitOfWork::begin(
            fx.stores(&NullSink),
            &fx.locks,
            &[&id(1)],
            Duration::from_millis(50),
        )
        .unwrap();

        assert!(matches!(
            uow.account(&id(2)),
            Err(LedgerError::StorageFailure { .. })
        ));
    }

    #[test]
    fn test_timestamp_never_goes_backwards_per_account() {
        let fx = Fixture::new();
        let first = fx.deposit(&NullSink, 1, 10).unwrap();

        fx.clock.advance(TimeDelta::hours(-1));
        let second = fx.deposit(&NullSink, 1, 10).unwrap();
        let other = fx.deposit(&NullSink, 2, 10).unwrap();

        assert_eq!(second.committed_at, first.committed_at);
        assert_eq!(other.committed_at, start() - TimeDelta::hours(1));
    }

    #[test]
    fn test_create_rejects_existing_account() {
        let fx = Fixture::new();
        let mut uow = UnitOfWork::begin(
            fx.stores(&NullSink),
            &fx.locks,
            &[&id(1)],
            Duration::from_millis(50),
        )
        .unwrap();

        let result = uow.create(Account::new(
            id(1),
            "client",
            AccountClass::Savings,
            Decimal::ZERO,
            start(),
        ));

        assert!(matches!(result, Err(LedgerError::DuplicateAccount { .. })));
    }
}
