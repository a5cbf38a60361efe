//! Daily withdrawal ceiling
//!
//! The tracker keeps no counters of its own. Today's withdrawn total is read
//! back from the transaction log, so it is always consistent with committed
//! history and survives restarts for free. Because the engine consults it
//! while holding the account lock, no withdrawal can commit between the read
//! and the decision.

use super::traits::TransactionLog;
use crate::config::LedgerConfig;
use crate::types::{AccountId, LedgerError, TransactionKind};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;

/// Answers "how much has this account withdrawn today"
pub struct LimitTracker {
    log: Arc<dyn TransactionLog>,
    config: LedgerConfig,
}

impl LimitTracker {
    pub fn new(log: Arc<dyn TransactionLog>, config: LedgerConfig) -> Self {
        Self { log, config }
    }

    /// Configured daily ceiling
    pub fn ceiling(&self) -> Decimal {
        self.config.daily_withdrawal_limit
    }

    /// Sum of WITHDRAWAL amounts debited from `account` on the local calendar
    /// day containing `as_of`
    ///
    /// Transfers do not count toward the ceiling.
    pub fn withdrawn_today(&self, account: &AccountId, as_of: DateTime<Utc>) -> Decimal {
        let today = self.config.local_date(as_of);
        let day_start = self.config.day_start(today);
        let day_end = today
            .succ_opt()
            .map(|tomorrow| self.config.day_start(tomorrow));

        self.log
            .scan_back(account, None, day_start)
            .iter()
            .filter(|entry| day_end.map_or(true, |end| entry.committed_at < end))
            .filter(|entry| entry.kind == TransactionKind::Withdrawal && &entry.source == account)
            .map(|entry| entry.amount)
            .sum()
    }

    /// Allowance left for the day, never negative
    pub fn remaining_today(&self, account: &AccountId, as_of: DateTime<Utc>) -> Decimal {
        (self.ceiling() - self.withdrawn_today(account, as_of)).max(Decimal::ZERO)
    }

    /// Fail with `DailyLimitExceeded` if withdrawing `amount` would pass the ceiling
    ///
    /// # Returns
    ///
    /// * `Ok(Decimal)` - allowance left after the withdrawal
    pub fn check(
        &self,
        account: &AccountId,
        amount: Decimal,
        as_of: DateTime<Utc>,
    ) -> Result<Decimal, LedgerError> {
        let remaining = self.remaining_today(account, as_of);

        if amount > remaining {
            return Err(LedgerError::daily_limit_exceeded(account, remaining, amount));
        }

        Ok(remaining - amount)
    }
}
