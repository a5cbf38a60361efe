//! Ledger Engine CLI
//!
//! Seeds a ledger from an accounts CSV, applies an operations CSV and prints
//! the final account states.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --accounts accounts.csv operations.csv > accounts_out.csv
//! cargo run -- --accounts accounts.csv --strategy sequential operations.csv
//! cargo run -- --accounts accounts.csv --workers 8 --batch-size 2000 operations.csv
//! cargo run -- --accounts accounts.csv --journal ledger.journal operations.csv
//! RUST_LOG=debug cargo run -- --accounts accounts.csv operations.csv
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success (individual rows may still have been rejected)
//! - 1: Fatal error (missing input file, unreadable journal, output failure)

use rust_ledger_engine::{cli, strategy, telemetry};
use std::process;
use tracing::error;

fn main() {
    telemetry::init_tracing();

    let args = cli::parse_args();

    let strategy = {
        let config = if args.strategy == cli::StrategyType::Concurrent {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let setup = args.to_setup();
    let mut output = std::io::stdout().lock();
    if let Err(e) = strategy::run_pipeline(&setup, strategy.as_ref(), &mut output) {
        error!(error = %e, "fatal error");
        process::exit(1);
    }
}
