//! Synchronous CSV readers
//!
//! `SyncReader` streams operations from a CSV file one row at a time;
//! `read_accounts` loads the (small) accounts file in one go. Both delegate
//! format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding `Result<Operation, String>`
//! for each CSV row:
//!
//! ```no_run
//! use rust_ledger_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(operation) => println!("Applying {}", operation),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found) are returned from `new()`
//! - Individual row errors are yielded as Err variants carrying the line number

use crate::io::csv_format::{
    convert_account_record, convert_operation_record, AccountCsvRecord, AccountSeed,
    OperationCsvRecord,
};
use crate::types::{LedgerError, Operation};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;
use tracing::warn;

fn open_csv(path: &Path) -> Result<csv::Reader<File>, LedgerError> {
    let file = File::open(path).map_err(|e| LedgerError::Io {
        message: format!("Failed to open file '{}': {}", path.display(), e),
    })?;

    Ok(ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .buffer_capacity(8 * 1024)
        .from_reader(file))
}

/// Streaming reader over an operations CSV file
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Open an operations CSV file
    ///
    /// The reader trims whitespace from all fields and accepts rows with
    /// varying field counts (destination and description are optional).
    ///
    /// # Returns
    ///
    /// * `Err(LedgerError::Io)` - the file could not be opened
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            reader: open_csv(path)?,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<Operation, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.reader.deserialize::<OperationCsvRecord>().next()?;
        self.line_num += 1;

        Some(match row {
            Ok(record) => convert_operation_record(record)
                .map_err(|e| format!("Line {}: {}", self.line_num, e)),
            Err(e) => Err(format!("Line {}: CSV parse error: {}", self.line_num, e)),
        })
    }
}

/// Load every well-formed row of an accounts CSV file
///
/// Malformed rows are logged and skipped.
///
/// # Returns
///
/// * `Err(LedgerError::Io)` - the file could not be opened
pub fn read_accounts(path: &Path) -> Result<Vec<AccountSeed>, LedgerError> {
    let mut reader = open_csv(path)?;
    let mut seeds = Vec::new();

    for (index, row) in reader.deserialize::<AccountCsvRecord>().enumerate() {
        let line = index + 2;
        match row.map_err(|e| e.to_string()).and_then(convert_account_record) {
            Ok(seed) => seeds.push(seed),
            Err(e) => warn!(line, error = %e, "skipping malformed account row"),
        }
    }

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountClass, TransactionKind};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "op,account,amount,destination,description\n";

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        assert!(matches!(result, Err(LedgerError::Io { .. })));
    }

    #[test]
    fn test_sync_reader_iterates_all_kinds() {
        let file = create_temp_csv(&format!(
            "{HEADER}\
             deposit,CM7600010000000000000001,100.00,,salary\n\
             withdrawal,CM7600010000000000000001,50\n\
             transfer,CM7600010000000000000001,25.5,CM7600010000000000000002,rent\n"
        ));

        let operations: Vec<Operation> = SyncReader::new(file.path())
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let kinds: Vec<TransactionKind> = operations.iter().map(Operation::kind).collect();
        assert_eq!(
            kinds,
            vec![
                TransactionKind::Deposit,
                TransactionKind::Withdrawal,
                TransactionKind::Transfer
            ]
        );
        assert_eq!(operations[2].amount(), Decimal::new(255, 1));
    }

    #[test]
    fn test_sync_reader_reports_line_numbers_and_continues() {
        let file = create_temp_csv(&format!(
            "{HEADER}\
             deposit,CM7600010000000000000001,100\n\
             deposit,CM7600010000000000000001,lots\n\
             deposit,CM7600010000000000000002,75\n"
        ));

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[2].is_ok());
        let error = records[1].as_ref().unwrap_err();
        assert!(error.contains("Line 3"), "unexpected error: {}", error);
        assert!(error.contains("Invalid amount"));
    }

    #[test]
    fn test_sync_reader_handles_whitespace() {
        let file = create_temp_csv(&format!(
            "{HEADER}  deposit  ,  CM7600010000000000000001  ,  10.00  \n"
        ));

        let records: Vec<_> = SyncReader::new(file.path())
            .unwrap()
            .filter_map(Result::ok)
            .collect();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount(), Decimal::new(1000, 2));
    }

    #[test]
    fn test_sync_reader_empty_after_header() {
        let file = create_temp_csv(HEADER);
        assert_eq!(SyncReader::new(file.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_read_accounts_skips_malformed_rows() {
        let file = create_temp_csv(
            "account,client,class,balance,active\n\
             CM7600010000000000000001,alice,current,1000\n\
             CM7600010000000000000002,bob,checking,10\n\
             CM7600010000000000000003,carol,savings,0,false\n",
        );

        let seeds = read_accounts(file.path()).unwrap();

        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].client, "alice");
        assert_eq!(seeds[0].class, AccountClass::Current);
        assert!(seeds[0].active);
        assert_eq!(seeds[1].class, AccountClass::Savings);
        assert!(!seeds[1].active);
    }

    #[test]
    fn test_read_accounts_missing_file() {
        assert!(matches!(
            read_accounts(Path::new("missing-accounts.csv")),
            Err(LedgerError::Io { .. })
        ));
    }
}
