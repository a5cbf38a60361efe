//! End-to-end batch run
//!
//! ```text
//! journal? ──replay──► LedgerEngine ◄──seed── accounts.csv
//!                          │
//!                 strategy.process(operations.csv)
//!                          │
//!                          ▼
//!                  account CSV on output
//! ```

use crate::config::LedgerConfig;
use crate::core::traits::CommitSink;
use crate::core::{Clock, LedgerEngine, SystemClock};
use crate::io::csv_format::{write_accounts_csv, AccountSeed};
use crate::io::journal::FileJournal;
use crate::io::sync_reader::read_accounts;
use crate::strategy::{ProcessingStrategy, ProcessingSummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Inputs of one batch run
#[derive(Debug, Clone)]
pub struct PipelineSetup {
    pub accounts_path: PathBuf,
    pub operations_path: PathBuf,
    pub config: LedgerConfig,
    /// Durable journal; replayed before seeding when present
    pub journal_path: Option<PathBuf>,
    /// Source of commit timestamps
    pub clock: Arc<dyn Clock>,
}

impl PipelineSetup {
    /// In-memory run on the system clock
    pub fn new(accounts_path: PathBuf, operations_path: PathBuf, config: LedgerConfig) -> Self {
        Self {
            accounts_path,
            operations_path,
            config,
            journal_path: None,
            clock: Arc::new(SystemClock),
        }
    }
}

fn build_engine(setup: &PipelineSetup) -> Result<LedgerEngine, LedgerError> {
    let builder = LedgerEngine::builder(setup.config.clone()).clock(Arc::clone(&setup.clock));

    let Some(path) = &setup.journal_path else {
        return builder.build();
    };

    let (journal, state) = FileJournal::open(path)?;
    let sink: Arc<dyn CommitSink> = Arc::new(journal);
    builder
        .sink(sink)
        .restore(state.accounts, state.entries)
        .build()
}

fn seed_account(engine: &LedgerEngine, seed: &AccountSeed) -> Result<(), LedgerError> {
    engine.open_account(seed.id.as_str(), seed.client.clone(), seed.class, seed.balance)?;
    if !seed.active {
        engine.close_account(&seed.id)?;
    }
    Ok(())
}

/// Seed accounts, apply the operations file and write every account to `output`
///
/// Accounts already known to the engine (restored from the journal) are
/// left untouched. Seeds the engine refuses are logged and skipped.
///
/// # Returns
///
/// * `Err(LedgerError)` - an input file is missing, the journal cannot be
///   replayed, or the output cannot be written
pub fn run_pipeline(
    setup: &PipelineSetup,
    strategy: &dyn ProcessingStrategy,
    output: &mut dyn Write,
) -> Result<ProcessingSummary, LedgerError> {
    let started = Instant::now();
    let engine = Arc::new(build_engine(setup)?);

    let seeds = read_accounts(&setup.accounts_path)?;
    let mut seeded = 0usize;
    for seed in &seeds {
        if engine.get_account(&seed.id).is_ok() {
            debug!(account = %seed.id, "account restored from journal, skipping seed");
            continue;
        }
        match seed_account(&engine, seed) {
            Ok(()) => seeded += 1,
            Err(e) => warn!(account = %seed.id, error = %e, "account seed rejected"),
        }
    }

    info!(
        operations = %setup.operations_path.display(),
        seeded,
        restored_entries = engine.entry_count(),
        "processing started"
    );

    let summary = strategy.process(&engine, &setup.operations_path)?;

    write_accounts_csv(&engine.list_accounts(false), output)?;

    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        malformed = summary.malformed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "processing finished"
    );

    Ok(summary)
}
