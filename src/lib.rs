//! Rust Ledger Engine Library
//! # Overview
//!
//! A concurrent bank ledger: deposits, withdrawals and transfers between
//! accounts, with balances that never go negative, a per-account daily
//! withdrawal ceiling, and an append-only transaction log from which history,
//! balance series and period summaries are derived.
//!
//! # Architecture
//!
//! - [`types`] - Accounts, operations, log entries, money rules, errors
//! - [`config`] - Ledger configuration (ceiling, lock timeout, calendar)
//! - [`core`] - Business logic components:
//!   - [`core::engine`] - Operation orchestration and account administration
//!   - [`core::unit_of_work`] - Locked, all-or-nothing commits
//!   - [`core::lock_table`] - Per-account locks with bounded wait
//!   - [`core::limit_tracker`] - Daily withdrawal ceiling
//!   - [`core::statistics`] - Balance series and period summaries
//! - [`io`] - CSV readers and writer, file journal
//! - [`strategy`] - Sequential and concurrent batch processing
//! - [`cli`] - CLI argument parsing
//! - [`telemetry`] - Log subscriber for the binary
//!
//! # Invariants
//!
//! - A committed balance is never negative
//! - Per account and calendar day, withdrawals never exceed the ceiling
//! - Every committed operation appends exactly one log entry; rejected
//!   operations append none and change nothing
//! - A transfer moves money between two distinct accounts and conserves
//!   their sum

pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod strategy;
pub mod telemetry;
pub mod types;

pub use config::LedgerConfig;
pub use core::{LedgerEngine, LedgerEngineBuilder};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountClass, AccountId, LedgerError, Operation, Receipt, TransactionEntry,
    TransactionKind,
};
