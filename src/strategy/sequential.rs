//! Sequential processing strategy
//!
//! Streams the operations file through `SyncReader` and applies each
//! operation on the calling thread, in file order.

use crate::core::LedgerEngine;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{ProcessingStrategy, ProcessingSummary};
use crate::types::LedgerError;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Single-threaded strategy; memory use is constant in the size of the input
#[derive(Debug, Clone, Copy)]
pub struct SequentialProcessingStrategy;

impl ProcessingStrategy for SequentialProcessingStrategy {
    fn process(
        &self,
        engine: &Arc<LedgerEngine>,
        operations_path: &Path,
    ) -> Result<ProcessingSummary, LedgerError> {
        let reader = SyncReader::new(operations_path)?;
        let mut summary = ProcessingSummary::default();

        for row in reader {
            let operation = match row {
                Ok(operation) => operation,
                Err(e) => {
                    summary.malformed += 1;
                    warn!(error = %e, "skipping malformed operation row");
                    continue;
                }
            };

            let result = engine.apply(&operation);
            if let Err(e) = &result {
                warn!(%operation, error = %e, "operation rejected");
            }
            summary.record(&result);
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountClass, AccountId};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const A: &str = "CM7600010000000000000001";
    const B: &str = "CM7600010000000000000002";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn engine() -> Arc<LedgerEngine> {
        let engine = LedgerEngine::new(Default::default());
        engine
            .open_account(A, "alice", AccountClass::Current, Decimal::new(1000, 0))
            .unwrap();
        engine
            .open_account(B, "bob", AccountClass::Savings, Decimal::ZERO)
            .unwrap();
        Arc::new(engine)
    }

    #[test]
    fn test_applies_rows_in_order() {
        let file = create_temp_csv(&format!(
            "op,account,amount,destination,description\n\
             withdrawal,{A},1500\n\
             transfer,{A},400,{B},rent\n\
             withdrawal,{B},100\n\
             deposit,{B},abc\n\
             transfer,{A},1,{A}\n"
        ));
        let engine = engine();

        let summary = SequentialProcessingStrategy
            .process(&engine, file.path())
            .unwrap();

        assert_eq!(
            summary,
            ProcessingSummary {
                applied: 2,
                rejected: 2,
                malformed: 1
            }
        );
        let a = engine.get_account(&AccountId::parse(A).unwrap()).unwrap();
        let b = engine.get_account(&AccountId::parse(B).unwrap()).unwrap();
        assert_eq!(a.balance, Decimal::new(600, 0));
        assert_eq!(b.balance, Decimal::new(300, 0));
        assert_eq!(engine.entry_count(), 2);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = SequentialProcessingStrategy.process(&engine(), Path::new("nonexistent.csv"));
        assert!(matches!(result, Err(LedgerError::Io { .. })));
    }
}
