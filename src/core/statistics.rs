//! Balance series and period summaries
//!
//! Historical balances are never stored. They are rebuilt by walking the log
//! backwards from an account snapshot: the snapshot's `last_entry` names the
//! exact log prefix its balance reflects, so undoing the effect of each entry
//! in that prefix, newest first, yields the balance at any earlier instant.
//! Scans stop at the start of the requested window, which is capped by
//! `LedgerConfig::max_series_days`.

use super::traits::TransactionLog;
use crate::config::LedgerConfig;
use crate::types::{Account, LedgerError, TransactionEntry, TransactionKind};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

/// Closing balance of one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalancePoint {
    pub date: NaiveDate,
    pub balance: Decimal,
}

/// Activity of one account over a window of calendar days
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Balance at the start of `from`
    pub opening_balance: Decimal,
    /// Balance at the end of `to`
    pub closing_balance: Decimal,
    pub deposits: Decimal,
    pub withdrawals: Decimal,
    pub transfers_in: Decimal,
    pub transfers_out: Decimal,
    pub entry_count: usize,
}

/// Read-only aggregator over the transaction log
pub struct Statistics {
    log: Arc<dyn TransactionLog>,
    config: LedgerConfig,
}

impl Statistics {
    pub fn new(log: Arc<dyn TransactionLog>, config: LedgerConfig) -> Self {
        Self { log, config }
    }

    fn validate_window(&self, from: NaiveDate, to: NaiveDate) -> Result<(), LedgerError> {
        if from > to {
            return Err(LedgerError::invalid_range(from, to, "start is after end"));
        }

        let days = (to - from).num_days() + 1;
        if days > i64::from(self.config.max_series_days) {
            return Err(LedgerError::invalid_range(
                from,
                to,
                &format!("window longer than {} days", self.config.max_series_days),
            ));
        }

        Ok(())
    }

    /// First instant after the local day `date`, if representable
    fn end_of(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        date.succ_opt().map(|next| self.config.day_start(next))
    }

    /// Entries of the snapshot's log prefix committed on or after the start of `from`
    fn prefix_since(&self, snapshot: &Account, from: NaiveDate) -> Vec<TransactionEntry> {
        match snapshot.last_entry {
            Some(last) => {
                self.log
                    .scan_back(&snapshot.id, Some(last), self.config.day_start(from))
            }
            None => Vec::new(),
        }
    }

    /// Closing balance of every day in `from..=to`, oldest first
    ///
    /// Days before the account was opened report its opening balance.
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::InvalidRange)` - `from` is after `to`, or the window
    ///   is longer than the configured maximum
    pub fn balance_series(
        &self,
        snapshot: &Account,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BalancePoint>, LedgerError> {
        self.validate_window(from, to)?;

        let days = (to - from).num_days() + 1;
        let dates: Vec<NaiveDate> = from.iter_days().take(days as usize).collect();

        let entries = self.prefix_since(snapshot, from);
        let mut pending = entries.iter().peekable();
        let mut balance = snapshot.balance;
        let mut points = Vec::with_capacity(dates.len());

        for &date in dates.iter().rev() {
            if let Some(end) = self.end_of(date) {
                while let Some(entry) = pending.next_if(|entry| entry.committed_at >= end) {
                    balance -= entry.effect_on(&snapshot.id);
                }
            }
            points.push(BalancePoint { date, balance });
        }

        points.reverse();
        Ok(points)
    }

    /// Opening and closing balance plus activity totals for `from..=to`
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::InvalidRange)` - same rules as `balance_series`
    pub fn summarize(
        &self,
        snapshot: &Account,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodSummary, LedgerError> {
        self.validate_window(from, to)?;

        let entries = self.prefix_since(snapshot, from);
        let end = self.end_of(to);
        let after_window: Decimal = entries
            .iter()
            .filter(|entry| end.is_some_and(|end| entry.committed_at >= end))
            .map(|entry| entry.effect_on(&snapshot.id))
            .sum();

        let mut summary = PeriodSummary {
            from,
            to,
            opening_balance: Decimal::ZERO,
            closing_balance: snapshot.balance - after_window,
            deposits: Decimal::ZERO,
            withdrawals: Decimal::ZERO,
            transfers_in: Decimal::ZERO,
            transfers_out: Decimal::ZERO,
            entry_count: 0,
        };

        let mut within_window = Decimal::ZERO;
        for entry in entries
            .iter()
            .filter(|entry| end.map_or(true, |end| entry.committed_at < end))
        {
            within_window += entry.effect_on(&snapshot.id);
            summary.entry_count += 1;

            match entry.kind {
                TransactionKind::Deposit => summary.deposits += entry.amount,
                TransactionKind::Withdrawal => summary.withdrawals += entry.amount,
                TransactionKind::Transfer if entry.source == snapshot.id => {
                    summary.transfers_out += entry.amount
                }
                TransactionKind::Transfer => summary.transfers_in += entry.amount,
            }
        }

        summary.opening_balance = summary.closing_balance - within_window;
        Ok(summary)
    }
}
