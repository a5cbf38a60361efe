//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - Storage and durability abstractions the engine is written against
//! - `engine` - Deposit, withdraw, transfer and account administration
//! - `unit_of_work` - Locked, staged, all-or-nothing commits
//! - `lock_table` - Per-account locks with bounded wait
//! - `account_store` - Concurrent in-memory account snapshots
//! - `transaction_log` - Append-only in-memory history
//! - `limit_tracker` - Daily withdrawal ceiling derived from the log
//! - `statistics` - Balance series and period summaries derived from the log
//! - `clock` - Injectable time source

pub mod account_store;
pub mod clock;
pub mod engine;
pub mod limit_tracker;
pub mod lock_table;
pub mod statistics;
pub mod traits;
pub mod transaction_log;
pub mod unit_of_work;

pub use account_store::InMemoryAccountStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{LedgerEngine, LedgerEngineBuilder};
pub use limit_tracker::LimitTracker;
pub use lock_table::{LockSet, LockTable};
pub use statistics::{BalancePoint, PeriodSummary, Statistics};
pub use traits::{AccountStore, CommitRecord, CommitSink, NullSink, TransactionLog};
pub use transaction_log::InMemoryTransactionLog;
pub use unit_of_work::UnitOfWork;
