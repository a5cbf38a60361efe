use crate::config::LedgerConfig;
use crate::strategy::{BatchConfig, PipelineSetup};
use clap::{Parser, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::time::Duration;

/// Apply deposits, withdrawals and transfers to a set of bank accounts
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Apply deposits, withdrawals and transfers to bank accounts", long_about = None)]
pub struct CliArgs {
    /// Operations CSV file path
    #[arg(value_name = "OPERATIONS", help = "Path to the operations CSV file")]
    pub operations_file: PathBuf,

    /// Accounts CSV file used to seed the ledger
    #[arg(
        long = "accounts",
        value_name = "ACCOUNTS",
        help = "Path to the accounts CSV file (account,client,class,balance[,active])"
    )]
    pub accounts_file: PathBuf,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "concurrent",
        help = "Processing strategy: 'sequential' or 'concurrent'"
    )]
    pub strategy: StrategyType,

    /// Operations per batch (concurrent mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Worker threads (concurrent mode only)
    #[arg(
        long = "workers",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub workers: Option<usize>,

    #[arg(
        long = "daily-limit",
        value_name = "AMOUNT",
        allow_negative_numbers = true,
        help = "Daily withdrawal ceiling per account (default: 500000)"
    )]
    pub daily_limit: Option<Decimal>,

    #[arg(
        long = "lock-timeout-ms",
        value_name = "MS",
        help = "Longest wait for an account lock before an operation fails as busy (default: 2000)"
    )]
    pub lock_timeout_ms: Option<u64>,

    #[arg(
        long = "utc-offset-minutes",
        value_name = "MINUTES",
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Offset of the ledger's calendar day from UTC, in minutes"
    )]
    pub utc_offset_minutes: i32,

    #[arg(
        long = "journal",
        value_name = "PATH",
        help = "Append-only journal; replayed on start, appended on every commit"
    )]
    pub journal: Option<PathBuf>,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sequential,
    Concurrent,
}

impl CliArgs {
    /// Build the ledger configuration; invalid values fall back to defaults with a warning
    pub fn to_ledger_config(&self) -> LedgerConfig {
        let default = LedgerConfig::default();
        LedgerConfig::new(
            self.daily_limit.unwrap_or(default.daily_withdrawal_limit),
            self.lock_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default.lock_timeout),
            self.utc_offset_minutes,
        )
    }

    /// Build the batch configuration for the concurrent strategy
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.workers.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.workers.unwrap_or(default.workers),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_setup(&self) -> PipelineSetup {
        PipelineSetup {
            journal_path: self.journal.clone(),
            ..PipelineSetup::new(
                self.accounts_file.clone(),
                self.operations_file.clone(),
                self.to_ledger_config(),
            )
        }
    }
}
