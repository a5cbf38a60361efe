//! Ledger engine
//!
//! `LedgerEngine` is the only component that mutates accounts. Every balance
//! change runs as one [`UnitOfWork`]: lock the accounts involved, validate,
//! stage the new balances and log entry, commit all-or-nothing.
//!
//! # Design
//!
//! Validation happens twice. A lock-free pre-check against the last
//! published snapshot rejects obviously invalid requests without touching a
//! lock. The authoritative check then runs again inside the unit of work,
//! with the account locks held, immediately before the mutation, so no other
//! operation can slip in between the final check and the write.
//!
//! # Architecture
//!
//! ```text
//! LedgerEngine
//!     ├── Arc<dyn AccountStore>    (published account snapshots)
//!     ├── Arc<dyn TransactionLog>  (append-only history)
//!     ├── Arc<dyn CommitSink>      (durability, e.g. the file journal)
//!     ├── Arc<dyn Clock>           (commit timestamps)
//!     ├── LockTable                (per-account locks, bounded wait)
//!     ├── LimitTracker             (daily withdrawal ceiling)
//!     └── Statistics               (balance series, period summaries)
//! ```
//!
//! # Thread Safety
//!
//! All operations take `&self`; share the engine behind an `Arc` and call it
//! from any number of threads. Operations on disjoint accounts never wait on
//! each other.

use super::account_store::InMemoryAccountStore;
use super::clock::{Clock, SystemClock};
use super::limit_tracker::LimitTracker;
use super::lock_table::LockTable;
use super::statistics::{BalancePoint, PeriodSummary, Statistics};
use super::traits::{AccountStore, CommitSink, NullSink, TransactionLog};
use super::transaction_log::InMemoryTransactionLog;
use super::unit_of_work::{Stores, UnitOfWork};
use crate::config::LedgerConfig;
use crate::types::money::{validate_amount, validate_opening_balance};
use crate::types::{
    Account, AccountClass, AccountId, ClientId, DepositReceipt, LedgerError, NewEntry, Operation,
    Receipt, TransactionEntry, TransferReceipt, WithdrawalReceipt,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::debug;

/// Builder for [`LedgerEngine`]
///
/// Defaults to in-memory stores, the system clock and no durability sink.
pub struct LedgerEngineBuilder {
    config: LedgerConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn CommitSink>,
    accounts: Vec<Account>,
    entries: Vec<TransactionEntry>,
}

impl LedgerEngineBuilder {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            sink: Arc::new(NullSink),
            accounts: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Use `clock` for commit timestamps
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Make every commit durable through `sink` before it becomes visible
    pub fn sink(mut self, sink: Arc<dyn CommitSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Start from previously committed state
    pub fn restore(mut self, accounts: Vec<Account>, entries: Vec<TransactionEntry>) -> Self {
        self.accounts = accounts;
        self.entries = entries;
        self
    }

    /// Build the engine
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::StorageFailure)` - restored state is inconsistent
    ///   (entry ids out of order, duplicate accounts)
    pub fn build(self) -> Result<LedgerEngine, LedgerError> {
        let accounts = Arc::new(InMemoryAccountStore::new());
        for account in self.accounts {
            accounts.insert(account).map_err(|e| {
                LedgerError::storage_failure(format!("inconsistent restored state: {}", e))
            })?;
        }

        let log: Arc<dyn TransactionLog> = Arc::new(InMemoryTransactionLog::new());
        log.restore(self.entries)?;

        Ok(LedgerEngine {
            limits: LimitTracker::new(Arc::clone(&log), self.config.clone()),
            statistics: Statistics::new(Arc::clone(&log), self.config.clone()),
            config: self.config,
            accounts,
            log,
            sink: self.sink,
            clock: self.clock,
            locks: LockTable::new(),
        })
    }
}

/// Bank ledger: accounts, balances and their append-only history
pub struct LedgerEngine {
    config: LedgerConfig,
    accounts: Arc<dyn AccountStore>,
    log: Arc<dyn TransactionLog>,
    sink: Arc<dyn CommitSink>,
    clock: Arc<dyn Clock>,
    locks: LockTable,
    limits: LimitTracker,
    statistics: Statistics,
}

impl LedgerEngine {
    /// Create an empty in-memory ledger
    pub fn new(config: LedgerConfig) -> Self {
        let log: Arc<dyn TransactionLog> = Arc::new(InMemoryTransactionLog::new());

        Self {
            limits: LimitTracker::new(Arc::clone(&log), config.clone()),
            statistics: Statistics::new(Arc::clone(&log), config.clone()),
            config,
            accounts: Arc::new(InMemoryAccountStore::new()),
            log,
            sink: Arc::new(NullSink),
            clock: Arc::new(SystemClock),
            locks: LockTable::new(),
        }
    }

    pub fn builder(config: LedgerConfig) -> LedgerEngineBuilder {
        LedgerEngineBuilder::new(config)
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn stores(&self) -> Stores<'_> {
        Stores {
            accounts: self.accounts.as_ref(),
            log: self.log.as_ref(),
            sink: self.sink.as_ref(),
            clock: self.clock.as_ref(),
        }
    }

    fn begin(&self, ids: &[&AccountId]) -> Result<UnitOfWork<'_>, LedgerError> {
        UnitOfWork::begin(self.stores(), &self.locks, ids, self.config.lock_timeout)
    }

    /// Credit `amount` to an account
    ///
    /// # Arguments
    ///
    /// * `account` - Account to credit
    /// * `amount` - Strictly positive, at most two decimals
    /// * `description` - Free text stored on the log entry
    ///
    /// # Returns
    ///
    /// * `Ok(DepositReceipt)` - new balance and the committed entry
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound`, `AccountInactive`, `Busy`,
    /// `StorageFailure`. No upper bound applies; a sum that would overflow the
    /// balance is reported as `InvalidAmount`.
    pub fn deposit(
        &self,
        account: &AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<DepositReceipt, LedgerError> {
        validate_amount(amount)?;
        self.accounts.get(account)?.ensure_active()?;

        let mut uow = self.begin(&[account])?;
        let staged = uow.account_mut(account)?;
        staged.ensure_active()?;
        staged.balance = staged
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::invalid_amount(amount))?;
        let new_balance = staged.balance;

        uow.stage(NewEntry::deposit(account.clone(), amount, description));
        let entry = uow.commit_entry()?;

        debug!(entry = entry.id, %account, %amount, %new_balance, "deposit committed");
        Ok(DepositReceipt { entry, new_balance })
    }

    /// Debit `amount` from an account, subject to the daily ceiling
    ///
    /// The balance is checked before the ceiling: a withdrawal failing both
    /// reports `InsufficientBalance`.
    ///
    /// # Returns
    ///
    /// * `Ok(WithdrawalReceipt)` - new balance, allowance left for the day and
    ///   the committed entry
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `AccountNotFound`, `AccountInactive`,
    /// `InsufficientBalance`, `DailyLimitExceeded`, `Busy`, `StorageFailure`
    pub fn withdraw(
        &self,
        account: &AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<WithdrawalReceipt, LedgerError> {
        validate_amount(amount)?;
        Self::check_debit(&self.accounts.get(account)?, amount)?;

        let mut uow = self.begin(&[account])?;
        Self::check_debit(uow.account(account)?, amount)?;
        let remaining_daily_allowance = self.limits.check(account, amount, uow.now())?;

        let staged = uow.account_mut(account)?;
        staged.balance -= amount;
        let new_balance = staged.balance;

        uow.stage(NewEntry::withdrawal(account.clone(), amount, description));
        let entry = uow.commit_entry()?;

        debug!(
            entry = entry.id,
            %account,
            %amount,
            %new_balance,
            %remaining_daily_allowance,
            "withdrawal committed"
        );
        Ok(WithdrawalReceipt {
            entry,
            new_balance,
            remaining_daily_allowance,
        })
    }

    /// Move `amount` from `source` to `destination` in one commit
    ///
    /// Transfers do not count toward the daily withdrawal ceiling. Naming the
    /// same account on both sides fails with `SameAccountTransfer` before the
    /// accounts are even looked up.
    ///
    /// # Returns
    ///
    /// * `Ok(TransferReceipt)` - both new balances and the committed entry
    ///
    /// # Errors
    ///
    /// `InvalidAmount`, `SameAccountTransfer`, `AccountNotFound`,
    /// `AccountInactive` (either side), `InsufficientBalance`, `Busy`,
    /// `StorageFailure`
    pub fn transfer(
        &self,
        source: &AccountId,
        destination: &AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<TransferReceipt, LedgerError> {
        validate_amount(amount)?;
        if source == destination {
            return Err(LedgerError::same_account_transfer(source));
        }

        let source_snapshot = self.accounts.get(source)?;
        let destination_snapshot = self.accounts.get(destination)?;
        Self::check_transfer(&source_snapshot, &destination_snapshot, amount)?;

        let mut uow = self.begin(&[source, destination])?;
        let source_state = uow.account(source)?.clone();
        let destination_state = uow.account(destination)?.clone();
        Self::check_transfer(&source_state, &destination_state, amount)?;

        let destination_balance = destination_state
            .balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::invalid_amount(amount))?;
        let source_balance = source_state.balance - amount;
        uow.account_mut(source)?.balance = source_balance;
        uow.account_mut(destination)?.balance = destination_balance;

        uow.stage(NewEntry::transfer(
            source.clone(),
            destination.clone(),
            amount,
            description,
        ));
        let entry = uow.commit_entry()?;

        debug!(
            entry = entry.id,
            %source,
            %destination,
            %amount,
            "transfer committed"
        );
        Ok(TransferReceipt {
            entry,
            source_balance,
            destination_balance,
        })
    }

    /// Apply any operation and return its receipt
    pub fn apply(&self, operation: &Operation) -> Result<Receipt, LedgerError> {
        match operation {
            Operation::Deposit {
                account,
                amount,
                description,
            } => self
                .deposit(account, *amount, description)
                .map(Receipt::Deposit),
            Operation::Withdrawal {
                account,
                amount,
                description,
            } => self
                .withdraw(account, *amount, description)
                .map(Receipt::Withdrawal),
            Operation::Transfer {
                source,
                destination,
                amount,
                description,
            } => self
                .transfer(source, destination, *amount, description)
                .map(Receipt::Transfer),
        }
    }

    fn check_debit(account: &Account, amount: Decimal) -> Result<(), LedgerError> {
        account.ensure_active()?;
        if account.balance < amount {
            return Err(LedgerError::insufficient_balance(
                &account.id,
                account.balance,
                amount,
            ));
        }
        Ok(())
    }

    fn check_transfer(
        source: &Account,
        destination: &Account,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        source.ensure_active()?;
        destination.ensure_active()?;
        Self::check_debit(source, amount)
    }

    /// Open a new account
    ///
    /// The opening balance is set directly; no log entry is written for it.
    ///
    /// # Arguments
    ///
    /// * `id` - Raw account identifier, normalized before use
    /// * `client` - Owning client reference
    /// * `class` - Current or savings
    /// * `opening_balance` - Zero or more, at most two decimals
    ///
    /// # Errors
    ///
    /// `InvalidAccountId`, `InvalidAmount`, `DuplicateAccount`, `Busy`,
    /// `StorageFailure`
    pub fn open_account(
        &self,
        id: &str,
        client: impl Into<ClientId>,
        class: AccountClass,
        opening_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let id = AccountId::parse(id)?;
        validate_opening_balance(opening_balance)?;
        if self.accounts.get(&id).is_ok() {
            return Err(LedgerError::duplicate_account(&id));
        }

        let mut uow = self.begin(&[&id])?;
        let account = Account::new(id.clone(), client, class, opening_balance, uow.now());
        uow.create(account.clone())?;
        uow.commit()?;

        debug!(account = %id, %class, %opening_balance, "account opened");
        Ok(account)
    }

    /// Deactivate an account
    ///
    /// Closed accounts keep their balance and history but reject new
    /// operations. Closing an already closed account is a no-op.
    pub fn close_account(&self, id: &AccountId) -> Result<Account, LedgerError> {
        self.accounts.get(id)?;

        let mut uow = self.begin(&[id])?;
        let staged = uow.account_mut(id)?;
        if !staged.active {
            return Ok(staged.clone());
        }
        staged.active = false;
        let closed = staged.clone();
        uow.commit()?;

        debug!(account = %id, "account closed");
        Ok(closed)
    }

    /// Latest committed state of an account
    pub fn get_account(&self, id: &AccountId) -> Result<Account, LedgerError> {
        self.accounts.get(id)
    }

    /// Accounts ordered by identifier
    pub fn list_accounts(&self, active_only: bool) -> Vec<Account> {
        let mut accounts = self.accounts.list();
        if active_only {
            accounts.retain(|account| account.active);
        }
        accounts
    }

    /// Most recent entries of an account, newest first
    ///
    /// `limit` defaults to the configured history limit.
    pub fn history(
        &self,
        id: &AccountId,
        limit: Option<usize>,
    ) -> Result<Vec<TransactionEntry>, LedgerError> {
        self.accounts.get(id)?;
        Ok(self
            .log
            .recent(id, limit.unwrap_or(self.config.history_limit)))
    }

    /// Entries of an account committed in `[from, to)`, newest first
    pub fn entries(
        &self,
        id: &AccountId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TransactionEntry>, LedgerError> {
        self.accounts.get(id)?;
        Ok(self.log.query(id, from, to))
    }

    /// End-of-day balances for every day in `from..=to`
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `InvalidRange`
    pub fn balance_series(
        &self,
        id: &AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BalancePoint>, LedgerError> {
        let snapshot = self.accounts.get(id)?;
        self.statistics.balance_series(&snapshot, from, to)
    }

    /// Balances and activity totals for `from..=to`
    pub fn summarize(
        &self,
        id: &AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<PeriodSummary, LedgerError> {
        let snapshot = self.accounts.get(id)?;
        self.statistics.summarize(&snapshot, from, to)
    }

    /// Total withdrawn from an account today, per the ledger clock
    pub fn withdrawn_today(&self, id: &AccountId) -> Result<Decimal, LedgerError> {
        self.accounts.get(id)?;
        Ok(self.limits.withdrawn_today(id, self.clock.now()))
    }

    /// Withdrawal allowance left today, per the ledger clock
    pub fn remaining_allowance(&self, id: &AccountId) -> Result<Decimal, LedgerError> {
        self.accounts.get(id)?;
        Ok(self.limits.remaining_today(id, self.clock.now()))
    }

    /// Number of committed log entries
    pub fn entry_count(&self) -> usize {
        self.log.len()
    }
}
