//! Processing strategy module for batch ledger runs
//!
//! A strategy takes an operations CSV file and applies every well-formed
//! operation to a shared `LedgerEngine`. Sequential and concurrent
//! implementations can be selected at runtime; both leave the ledger in the
//! same final state for the same input.
//!
//! `pipeline` wraps a strategy with the surrounding steps of a CLI run:
//! journal replay, account seeding and account output.

use crate::cli::StrategyType;
use crate::core::LedgerEngine;
use crate::types::LedgerError;
use std::path::Path;
use std::sync::Arc;

pub mod batch_processor;
pub mod concurrent;
pub mod pipeline;
pub mod sequential;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use concurrent::{BatchConfig, ConcurrentProcessingStrategy};
pub use pipeline::{run_pipeline, PipelineSetup};
pub use sequential::SequentialProcessingStrategy;

/// Counts of what happened to each operations row
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Operations committed
    pub applied: usize,
    /// Well-formed operations the engine refused
    pub rejected: usize,
    /// Rows that could not be parsed into an operation
    pub malformed: usize,
}

impl ProcessingSummary {
    /// Tally one engine outcome
    pub fn record<T>(&mut self, result: &Result<T, LedgerError>) {
        match result {
            Ok(_) => self.applied += 1,
            Err(_) => self.rejected += 1,
        }
    }
}

/// Processing strategy trait for batch runs
pub trait ProcessingStrategy: Send + Sync {
    /// Apply the operations in `operations_path` to `engine`
    ///
    /// # Arguments
    ///
    /// * `engine` - Shared ledger engine, already seeded with accounts
    /// * `operations_path` - Path to the operations CSV file
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessingSummary)` - every row was read (some may have failed)
    /// * `Err(LedgerError)` - fatal error such as a missing input file
    ///
    /// Malformed rows and rejected operations are logged and counted, never
    /// returned as errors.
    fn process(
        &self,
        engine: &Arc<LedgerEngine>,
        operations_path: &Path,
    ) -> Result<ProcessingSummary, LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Sequential or concurrent
/// * `config` - Batch configuration for the concurrent strategy (ignored for sequential)
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sequential => Box::new(SequentialProcessingStrategy),
        StrategyType::Concurrent => {
            Box::new(ConcurrentProcessingStrategy::new(config.unwrap_or_default()))
        }
    }
}
