//! Ledger configuration
//!
//! `LedgerConfig` carries the business constants (daily withdrawal ceiling),
//! the contention bound (lock timeout) and the calendar the ledger runs on.
//! Invalid values fall back to the defaults with a warning rather than
//! aborting, so a bad CLI flag never takes the engine down.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeDelta, Utc};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::warn;

/// Configuration for the ledger engine
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerConfig {
    /// Maximum total of WITHDRAWAL amounts per account per calendar day
    pub daily_withdrawal_limit: Decimal,

    /// Longest wait for an account lock before failing with `Busy`
    pub lock_timeout: Duration,

    /// Default number of entries returned by history queries
    pub history_limit: usize,

    /// Longest window accepted by the statistics queries, in days
    pub max_series_days: u32,

    /// Offset of the ledger's local time from UTC; calendar days follow it
    pub utc_offset: FixedOffset,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            daily_withdrawal_limit: Decimal::new(500_000, 0),
            lock_timeout: Duration::from_secs(2),
            history_limit: 20,
            max_series_days: 90,
            utc_offset: Utc.fix(),
        }
    }
}

impl LedgerConfig {
    /// Create a LedgerConfig with custom values
    pub fn new(
        daily_withdrawal_limit: Decimal,
        lock_timeout: Duration,
        utc_offset_minutes: i32,
    ) -> Self {
        let default = Self::default();

        let daily_withdrawal_limit = if daily_withdrawal_limit <= Decimal::ZERO {
            warn!(
                %daily_withdrawal_limit,
                default = %default.daily_withdrawal_limit,
                "invalid daily withdrawal limit, using default"
            );
            default.daily_withdrawal_limit
        } else {
            daily_withdrawal_limit
        };

        let lock_timeout = if lock_timeout.is_zero() {
            warn!(
                default_ms = default.lock_timeout.as_millis() as u64,
                "invalid lock timeout (0 ms), using default"
            );
            default.lock_timeout
        } else {
            lock_timeout
        };

        let utc_offset = match utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
        {
            Some(offset) => offset,
            None => {
                warn!(utc_offset_minutes, "invalid UTC offset, using UTC");
                default.utc_offset
            }
        };

        Self {
            daily_withdrawal_limit,
            lock_timeout,
            utc_offset,
            ..default
        }
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        if history_limit == 0 {
            warn!("invalid history limit (0), keeping {}", self.history_limit);
        } else {
            self.history_limit = history_limit;
        }
        self
    }

    pub fn with_max_series_days(mut self, max_series_days: u32) -> Self {
        if max_series_days == 0 {
            warn!("invalid series window (0 days), keeping {}", self.max_series_days);
        } else {
            self.max_series_days = max_series_days;
        }
        self
    }

    /// Calendar day of `instant` in ledger local time
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.utc_offset).date_naive()
    }

    /// First instant of the local calendar day `date`, in UTC
    pub fn day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        let local_midnight = date.and_time(NaiveTime::MIN);
        let offset = TimeDelta::seconds(i64::from(self.utc_offset.local_minus_utc()));
        (local_midnight - offset).and_utc()
    }
}
