//! In-memory transaction log
//!
//! # Design
//!
//! Entries are keyed by id in a `BTreeMap`. A per-account index of entry ids
//! makes account history queries independent of the total log size.
//!
//! Ids are strictly increasing but not necessarily dense: an append reserves
//! its ids up front, and a commit that fails after a later commit reserved
//! its own ids leaves a hole. When nothing was reserved after it, the failed
//! ids are handed back.
//!
//! # Thread Safety
//!
//! State sits behind a `parking_lot::RwLock`. The write lock is taken twice
//! per append and only briefly: once to reserve ids, once to publish. The
//! append hook (where a commit becomes durable) runs with no log lock held,
//! so a slow commit never stalls commits or reads on other accounts.
//! Entries of one account are published in id order because their commits
//! are serialized by that account's lock.

use super::traits::{AppendHook, TransactionLog};
use crate::types::{AccountId, EntryId, LedgerError, NewEntry, TransactionEntry};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

#[derive(Debug)]
struct LogState {
    /// Published entries by id
    entries: BTreeMap<EntryId, TransactionEntry>,

    /// Ids of the entries involving each account, ascending
    by_account: HashMap<AccountId, Vec<EntryId>>,

    /// First id not yet handed out
    next_id: EntryId,
}

impl Default for LogState {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            by_account: HashMap::new(),
            next_id: 1,
        }
    }
}

impl LogState {
    fn entry(&self, id: EntryId) -> &TransactionEntry {
        &self.entries[&id]
    }

    fn index(&mut self, entry: &TransactionEntry) {
        self.by_account
            .entry(entry.source.clone())
            .or_default()
            .push(entry.id);

        if let Some(destination) = &entry.destination {
            self.by_account
                .entry(destination.clone())
                .or_default()
                .push(entry.id);
        }
    }

    fn reserve(&mut self, count: usize) -> Range<EntryId> {
        let first = self.next_id;
        self.next_id += count as EntryId;
        first..self.next_id
    }

    /// Hand back ids of a failed append unless later ids were reserved
    fn release(&mut self, ids: Range<EntryId>) {
        if self.next_id == ids.end {
            self.next_id = ids.start;
        }
    }

    /// Account's entry ids, newest first
    fn ids_newest_first<'a>(&'a self, account: &AccountId) -> impl Iterator<Item = EntryId> + 'a {
        self.by_account
            .get(account)
            .into_iter()
            .flat_map(|ids| ids.iter().rev().copied())
    }
}

/// Append-only log kept in memory
#[derive(Debug, Default)]
pub struct InMemoryTransactionLog {
    state: RwLock<LogState>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every published entry in id order
    pub fn all(&self) -> Vec<TransactionEntry> {
        self.state.read().entries.values().cloned().collect()
    }
}

impl TransactionLog for InMemoryTransactionLog {
    fn append_with(
        &self,
        pending: Vec<NewEntry>,
        committed_at: DateTime<Utc>,
        hook: &mut AppendHook<'_>,
    ) -> Result<Vec<TransactionEntry>, LedgerError> {
        let ids = self.state.write().reserve(pending.len());

        let numbered: Vec<TransactionEntry> = pending
            .into_iter()
            .zip(ids.clone())
            .map(|(entry, id)| entry.into_entry(id, committed_at))
            .collect();

        if let Err(e) = hook(&numbered) {
            self.state.write().release(ids);
            return Err(e);
        }

        let mut state = self.state.write();
        for entry in &numbered {
            state.index(entry);
            state.entries.insert(entry.id, entry.clone());
        }

        Ok(numbered)
    }

    fn query(
        &self,
        account: &AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Vec<TransactionEntry> {
        let state = self.state.read();

        state
            .ids_newest_first(account)
            .map(|id| state.entry(id))
            .skip_while(|entry| to.is_some_and(|to| entry.committed_at >= to))
            .take_while(|entry| from.map_or(true, |from| entry.committed_at >= from))
            .cloned()
            .collect()
    }

    fn recent(&self, account: &AccountId, limit: usize) -> Vec<TransactionEntry> {
        let state = self.state.read();

        state
            .ids_newest_first(account)
            .take(limit)
            .map(|id| state.entry(id).clone())
            .collect()
    }

    fn scan_back(
        &self,
        account: &AccountId,
        up_to: Option<EntryId>,
        since: DateTime<Utc>,
    ) -> Vec<TransactionEntry> {
        let state = self.state.read();

        state
            .ids_newest_first(account)
            .skip_while(|id| up_to.is_some_and(|up_to| *id > up_to))
            .map(|id| state.entry(id))
            .take_while(|entry| entry.committed_at >= since)
            .cloned()
            .collect()
    }

    fn latest_for(&self, account: &AccountId) -> Option<TransactionEntry> {
        let state = self.state.read();
        let id = state.ids_newest_first(account).next()?;
        Some(state.entry(id).clone())
    }

    fn restore(&self, entries: Vec<TransactionEntry>) -> Result<(), LedgerError> {
        let mut state = self.state.write();

        if !state.entries.is_empty() {
            return Err(LedgerError::storage_failure(
                "cannot restore into a non-empty transaction log",
            ));
        }

        let mut previous: EntryId = 0;
        for entry in &entries {
            if entry.id <= previous {
                return Err(LedgerError::storage_failure(format!(
                    "transaction log out of order: entry {} after entry {}",
                    entry.id, previous
                )));
            }
            previous = entry.id;
        }

        for entry in entries {
            state.index(&entry);
            state.entries.insert(entry.id, entry);
        }
        state.next_id = previous + 1;

        Ok(())
    }

    fn len(&self) -> usize {
        self.state.read().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use rust_decimal::Decimal;

    fn id(n: u8) -> AccountId {
        AccountId::parse(&format!("CM76000100000000000000{:02}", n)).unwrap()
    }

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, hour, 0, 0).unwrap()
    }

    fn append(log: &InMemoryTransactionLog, entry: NewEntry, at: DateTime<Utc>) -> TransactionEntry {
        log.append_with(vec![entry], at, &mut |_| Ok(()))
            .unwrap()
            .remove(0)
    }

    /// Deposit on 1 at 08:00, transfer 1 -> 2 at 09:00, withdrawal on 2 at 10:00
    fn seeded_log() -> InMemoryTransactionLog {
        let log = InMemoryTransactionLog::new();
        append(&log, NewEntry::deposit(id(1), Decimal::new(100, 0), "cash"), t(8));
        append(
            &log,
            NewEntry::transfer(id(1), id(2), Decimal::new(40, 0), "rent"),
            t(9),
        );
        append(&log, NewEntry::withdrawal(id(2), Decimal::new(10, 0), "atm"), t(10));
        log
    }

    fn ids(entries: &[TransactionEntry]) -> Vec<EntryId> {
        entries.iter().map(|e| e.id).collect()
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let log = seeded_log();

        assert_eq!(ids(&log.all()), vec![1, 2, 3]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_failing_hook_appends_nothing() {
        let log = seeded_log();

        let result = log.append_with(
            vec![NewEntry::deposit(id(1), Decimal::ONE, "")],
            t(11),
            &mut |_| Err(LedgerError::storage_failure("disk full")),
        );

        assert_eq!(result, Err(LedgerError::storage_failure("disk full")));
        assert_eq!(log.len(), 3);
        assert_eq!(log.latest_for(&id(1)).unwrap().id, 2);
    }

    #[test]
    fn test_hook_sees_numbered_entries() {
        let log = seeded_log();
        let mut seen = vec![];

        log.append_with(
            vec![NewEntry::deposit(id(3), Decimal::ONE, "")],
            t(11),
            &mut |entries| {
                seen.extend(entries.iter().map(|e| e.id));
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(seen, vec![4]);
    }

    #[test]
    fn test_transfer_indexed_under_both_accounts() {
        let log = seeded_log();

        assert_eq!(ids(&log.query(&id(1), None, None)), vec![2, 1]);
        assert_eq!(ids(&log.query(&id(2), None, None)), vec![3, 2]);
        assert!(log.query(&id(3), None, None).is_empty());
    }

    #[test]
    fn test_query_window_is_half_open() {
        let log = seeded_log();

        assert_eq!(ids(&log.query(&id(2), Some(t(9)), Some(t(10)))), vec![2]);
        assert_eq!(ids(&log.query(&id(2), Some(t(10)), None)), vec![3]);
        assert_eq!(ids(&log.query(&id(1), None, Some(t(9)))), vec![1]);
    }

    #[test]
    fn test_recent_limits_newest_first() {
        let log = seeded_log();

        assert_eq!(ids(&log.recent(&id(1), 1)), vec![2]);
        assert_eq!(ids(&log.recent(&id(1), 20)), vec![2, 1]);
    }

    #[test]
    fn test_scan_back_respects_bounds() {
        let log = seeded_log();

        assert_eq!(ids(&log.scan_back(&id(2), None, t(0))), vec![3, 2]);
        assert_eq!(ids(&log.scan_back(&id(2), Some(2), t(0))), vec![2]);
        assert_eq!(ids(&log.scan_back(&id(1), None, t(9))), vec![2]);
        assert_eq!(
            ids(&log.scan_back(&id(1), None, t(9) + TimeDelta::seconds(1))),
            Vec::<EntryId>::new()
        );
    }

    #[test]
    fn test_failed_append_hands_back_its_ids() {
        let log = seeded_log();

        let failed = log.append_with(
            vec![NewEntry::deposit(id(1), Decimal::ONE, "")],
            t(11),
            &mut |_| Err(LedgerError::storage_failure("disk full")),
        );
        assert!(failed.is_err());

        let next = append(&log, NewEntry::deposit(id(1), Decimal::ONE, ""), t(11));
        assert_eq!(next.id, 4);
    }

    #[test]
    fn test_append_proceeds_while_another_hook_runs() {
        let log = seeded_log();
        let mut inner = None;

        let outer = log
            .append_with(
                vec![NewEntry::deposit(id(1), Decimal::ONE, "slow")],
                t(11),
                &mut |_| {
                    inner = Some(append(&log, NewEntry::deposit(id(3), Decimal::TEN, ""), t(11)));
                    assert_eq!(ids(&log.recent(&id(3), 5)), vec![5]);
                    assert_eq!(ids(&log.recent(&id(1), 5)), vec![2, 1]);
                    Ok(())
                },
            )
            .unwrap();

        assert_eq!(outer[0].id, 4);
        assert_eq!(inner.unwrap().id, 5);
        assert_eq!(ids(&log.all()), vec![1, 2, 3, 4, 5]);
        assert_eq!(ids(&log.recent(&id(1), 5)), vec![4, 2, 1]);
    }

    #[test]
    fn test_failed_append_leaves_hole_behind_later_reservation() {
        let log = seeded_log();

        let failed = log.append_with(
            vec![NewEntry::deposit(id(1), Decimal::ONE, "")],
            t(11),
            &mut |_| {
                append(&log, NewEntry::deposit(id(3), Decimal::TEN, ""), t(11));
                Err(LedgerError::storage_failure("disk full"))
            },
        );
        assert!(failed.is_err());

        let next = append(&log, NewEntry::deposit(id(1), Decimal::ONE, ""), t(12));
        assert_eq!(next.id, 6);
        assert_eq!(ids(&log.all()), vec![1, 2, 3, 5, 6]);
        assert_eq!(log.len(), 5);
    }

    #[test]
    fn test_restore_requires_increasing_ids() {
        let source = seeded_log();
        let mut entries = source.all();

        let restored = InMemoryTransactionLog::new();
        restored.restore(entries.clone()).unwrap();
        assert_eq!(restored.all(), entries);
        assert_eq!(ids(&restored.query(&id(2), None, None)), vec![3, 2]);

        entries.remove(1);
        let holed = InMemoryTransactionLog::new();
        holed.restore(entries.clone()).unwrap();
        let next = append(&holed, NewEntry::deposit(id(1), Decimal::ONE, ""), t(11));
        assert_eq!(next.id, 4);

        entries.swap(0, 1);
        let shuffled = InMemoryTransactionLog::new();
        assert!(matches!(
            shuffled.restore(entries),
            Err(LedgerError::StorageFailure { .. })
        ));
    }
}
