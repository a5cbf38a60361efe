//! Concurrent batch processing strategy
//!
//! # Architecture
//!
//! ```text
//! ConcurrentProcessingStrategy
//!     ├── BatchConfig (batch_size, workers)
//!     ├── AsyncReader (batch CSV reading via csv-async)
//!     └── BatchProcessor (account-connected partitioning, blocking lanes)
//!         └── Arc<LedgerEngine>
//! ```
//!
//! Batches are applied one after another; only the groups inside a batch
//! run in parallel. Any two operations that share an account therefore run
//! in file order, and the final ledger state equals the sequential one.

use crate::core::LedgerEngine;
use crate::io::async_reader::AsyncReader;
use crate::strategy::batch_processor::BatchProcessor;
use crate::strategy::{ProcessingStrategy, ProcessingSummary};
use crate::types::LedgerError;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for batch processing
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Runtime worker threads and parallel lanes per batch
    pub workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            workers: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a BatchConfig; zero values fall back to the defaults with a warning
    pub fn new(batch_size: usize, workers: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let workers = if workers == 0 {
            warn!(
                workers,
                default = default.workers,
                "invalid worker count, using default"
            );
            default.workers
        } else {
            workers
        };

        Self {
            batch_size,
            workers,
        }
    }
}

/// Multi-threaded strategy built on a tokio runtime
#[derive(Debug, Clone)]
pub struct ConcurrentProcessingStrategy {
    config: BatchConfig,
}

impl ConcurrentProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }
}

impl ProcessingStrategy for ConcurrentProcessingStrategy {
    fn process(
        &self,
        engine: &Arc<LedgerEngine>,
        operations_path: &Path,
    ) -> Result<ProcessingSummary, LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.workers.max(1))
            .build()
            .map_err(|e| LedgerError::Io {
                message: format!("Failed to create tokio runtime: {}", e),
            })?;

        runtime.block_on(async {
            let processor = BatchProcessor::new(Arc::clone(engine), self.config.workers);

            let file = tokio::fs::File::open(operations_path)
                .await
                .map_err(|e| LedgerError::Io {
                    message: format!(
                        "Failed to open file '{}': {}",
                        operations_path.display(),
                        e
                    ),
                })?;
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);

            let mut summary = ProcessingSummary::default();
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                debug!(size = batch.len(), "applying batch");
                for outcome in processor.process_batch(batch).await? {
                    summary.record(&outcome.result);
                }
            }

            summary.malformed = reader.malformed();
            Ok(summary)
        })
    }
}
