//! Append-only file journal
//!
//! Every commit is written as one JSON line holding the post-commit state of
//! the touched accounts and the new log entries. Replaying the file in order
//! rebuilds the account store (last state per account wins) and the
//! transaction log (all entries, sorted by id). Lines of commits on disjoint
//! accounts may land out of id order; lines touching one account never do.
//!
//! # Durability
//!
//! `persist` returns only after the line has been written and `sync_data`
//! has completed. If either step fails the file is cut back to its previous
//! length and the commit is reported as a `StorageFailure`, so the engine
//! can abandon it without leaving a partial record behind. If that cut
//! itself fails, the journal refuses every later commit: appending after
//! leftover bytes would fuse them into one corrupt line. Reopening the
//! file discards the leftover as a torn tail.
//!
//! A crash in the middle of a write leaves a final line without a newline.
//! `FileJournal::open` logs and truncates such a torn tail; a terminated line
//! that does not decode is reported as corruption instead.

use crate::core::traits::{CommitRecord, CommitSink};
use crate::types::{Account, AccountId, LedgerError, TransactionEntry};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// State rebuilt from a journal file
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JournalState {
    /// Latest state of every journaled account, ordered by identifier
    pub accounts: Vec<Account>,
    /// All journaled entries, ordered by id
    pub entries: Vec<TransactionEntry>,
}

/// Decoded journal contents plus the length of the well-formed prefix
struct Decoded {
    state: JournalState,
    valid_len: u64,
    torn: bool,
}

fn decode(bytes: &[u8]) -> Result<Decoded, LedgerError> {
    let mut accounts: BTreeMap<AccountId, Account> = BTreeMap::new();
    let mut entries = Vec::new();
    let mut offset = 0usize;
    let mut line = 0u64;

    while offset < bytes.len() {
        let Some(newline) = bytes[offset..].iter().position(|&b| b == b'\n') else {
            break;
        };
        line += 1;
        let raw = &bytes[offset..offset + newline];
        offset += newline + 1;

        if raw.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let record: CommitRecord = serde_json::from_slice(raw).map_err(|e| {
            LedgerError::storage_failure(format!("corrupt journal record at line {}: {}", line, e))
        })?;
        for account in record.accounts {
            accounts.insert(account.id.clone(), account);
        }
        entries.extend(record.entries);
    }

    entries.sort_by_key(|entry: &TransactionEntry| entry.id);

    Ok(Decoded {
        state: JournalState {
            accounts: accounts.into_values().collect(),
            entries,
        },
        valid_len: offset as u64,
        torn: offset < bytes.len(),
    })
}

fn read_all(file: &mut File) -> Result<Vec<u8>, LedgerError> {
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| LedgerError::storage_failure(format!("cannot read journal: {}", e)))?;
    Ok(bytes)
}

/// Rebuild state from a journal file without modifying it
///
/// A torn final line is ignored.
pub fn replay(path: &Path) -> Result<JournalState, LedgerError> {
    let mut file = File::open(path).map_err(|e| LedgerError::Io {
        message: format!("Failed to open journal '{}': {}", path.display(), e),
    })?;
    Ok(decode(&read_all(&mut file)?)?.state)
}

/// Append target of a journal
trait Segment: Write {
    fn len(&self) -> io::Result<u64>;
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl Segment for File {
    fn len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Writes whole lines, cutting back partial ones
#[derive(Debug)]
struct Appender<S> {
    segment: S,
    poisoned: bool,
}

impl<S: Segment> Appender<S> {
    fn new(segment: S) -> Self {
        Self {
            segment,
            poisoned: false,
        }
    }

    fn append(&mut self, line: &[u8]) -> Result<(), LedgerError> {
        if self.poisoned {
            return Err(LedgerError::storage_failure(
                "journal holds a partial record that could not be removed; reopen it",
            ));
        }

        let previous_len = self
            .segment
            .len()
            .map_err(|e| LedgerError::storage_failure(format!("cannot stat journal: {}", e)))?;

        let written = self
            .segment
            .write_all(line)
            .and_then(|()| self.segment.sync());
        if let Err(e) = written {
            if let Err(rollback) = self.segment.truncate(previous_len) {
                error!(error = %rollback, "failed to roll back partial journal write");
                self.poisoned = true;
            }
            return Err(LedgerError::storage_failure(format!(
                "journal write failed: {}",
                e
            )));
        }

        Ok(())
    }
}

/// Durable commit sink backed by a JSON-lines file
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    appender: Mutex<Appender<File>>,
}

impl FileJournal {
    /// Open or create the journal at `path` and replay it
    ///
    /// # Returns
    ///
    /// * `Ok((journal, state))` - journal ready for appends, plus the state it holds
    /// * `Err(LedgerError::StorageFailure)` - the file cannot be opened or a
    ///   complete record does not decode
    pub fn open(path: &Path) -> Result<(Self, JournalState), LedgerError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| {
                LedgerError::storage_failure(format!(
                    "cannot open journal '{}': {}",
                    path.display(),
                    e
                ))
            })?;

        let decoded = decode(&read_all(&mut file)?)?;
        if decoded.torn {
            warn!(
                journal = %path.display(),
                valid_len = decoded.valid_len,
                "discarding torn journal tail"
            );
            file.set_len(decoded.valid_len).map_err(|e| {
                LedgerError::storage_failure(format!("cannot truncate torn journal tail: {}", e))
            })?;
        }

        info!(
            journal = %path.display(),
            accounts = decoded.state.accounts.len(),
            entries = decoded.state.entries.len(),
            "journal replayed"
        );

        Ok((
            Self {
                path: path.to_path_buf(),
                appender: Mutex::new(Appender::new(file)),
            },
            decoded.state,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommitSink for FileJournal {
    fn persist(&self, record: &CommitRecord) -> Result<(), LedgerError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        self.appender.lock().append(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountClass, NewEntry};
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn id(n: u8) -> AccountId {
        AccountId::parse(&format!("CM76000100000000000000{:02}", n)).unwrap()
    }

    fn account(n: u8, balance: i64) -> Account {
        Account::new(
            id(n),
            format!("client-{}", n),
            AccountClass::Current,
            Decimal::new(balance, 0),
            Utc.with_ymd_and_hms(2026, 10, 1, 9, 0, 0).unwrap(),
        )
    }

    fn deposit_record(n: u8, entry_id: u64, balance: i64) -> CommitRecord {
        let entry = NewEntry::deposit(id(n), Decimal::new(10, 0), "")
            .into_entry(entry_id, Utc.with_ymd_and_hms(2026, 10, 2, 9, 0, 0).unwrap());
        let mut account = account(n, balance);
        account.last_entry = Some(entry_id);
        CommitRecord {
            accounts: vec![account],
            entries: vec![entry],
        }
    }

    #[test]
    fn test_open_creates_empty_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.journal");

        let (journal, state) = FileJournal::open(&path).unwrap();

        assert!(path.exists());
        assert_eq!(journal.path(), path.as_path());
        assert_eq!(state, JournalState::default());
    }

    #[test]
    fn test_persist_then_replay() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.journal");

        {
            let (journal, _) = FileJournal::open(&path).unwrap();
            journal
                .persist(&CommitRecord {
                    accounts: vec![account(2, 50), account(1, 100)],
                    entries: vec![],
                })
                .unwrap();
            journal.persist(&deposit_record(1, 1, 110)).unwrap();
        }

        let (_, state) = FileJournal::open(&path).unwrap();

        assert_eq!(state.accounts.len(), 2);
        assert_eq!(state.accounts[0].id, id(1));
        assert_eq!(state.accounts[0].balance, Decimal::new(110, 0));
        assert_eq!(state.accounts[0].last_entry, Some(1));
        assert_eq!(state.accounts[1].balance, Decimal::new(50, 0));
        assert_eq!(state.entries.len(), 1);
        assert_eq!(replay(&path).unwrap(), state);
    }

    #[test]
    fn test_torn_tail_is_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.journal");
        {
            let (journal, _) = FileJournal::open(&path).unwrap();
            journal.persist(&deposit_record(1, 1, 110)).unwrap();
        }
        let intact_len = std::fs::metadata(&path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(br#"{"accounts":[{"id":"CM76"#).unwrap();
        drop(file);

        assert_eq!(replay(&path).unwrap().entries.len(), 1);

        let (journal, state) = FileJournal::open(&path).unwrap();
        assert_eq!(state.entries.len(), 1);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), intact_len);

        journal.persist(&deposit_record(1, 2, 120)).unwrap();
        drop(journal);
        assert_eq!(replay(&path).unwrap().entries.len(), 2);
    }

    #[test]
    fn test_corrupt_complete_line_is_storage_failure() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.journal");
        std::fs::write(&path, "not json\n").unwrap();

        assert!(matches!(
            FileJournal::open(&path),
            Err(LedgerError::StorageFailure { .. })
        ));
    }

    #[test]
    fn test_replay_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            replay(&dir.path().join("absent")),
            Err(LedgerError::Io { .. })
        ));
    }

    #[test]
    fn test_replay_orders_entries_by_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.journal");
        {
            let (journal, _) = FileJournal::open(&path).unwrap();
            journal.persist(&deposit_record(2, 2, 60)).unwrap();
            journal.persist(&deposit_record(1, 1, 110)).unwrap();
        }

        let state = replay(&path).unwrap();

        let ids: Vec<u64> = state.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(state.accounts[1].last_entry, Some(2));
    }

    /// In-memory segment that accepts `write_budget` bytes, then fails
    #[derive(Default)]
    struct FlakySegment {
        data: Vec<u8>,
        write_budget: Option<usize>,
        truncate_fails: bool,
    }

    impl Write for FlakySegment {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = match self.write_budget.as_mut() {
                None => buf.len(),
                Some(budget) => {
                    let n = buf.len().min(*budget);
                    *budget -= n;
                    n
                }
            };
            if n == 0 && !buf.is_empty() {
                return Err(io::Error::other("disk full"));
            }
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Segment for FlakySegment {
        fn len(&self) -> io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn sync(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.truncate_fails {
                return Err(io::Error::other("read-only file system"));
            }
            self.data.truncate(len as usize);
            Ok(())
        }
    }

    #[test]
    fn test_partial_write_is_cut_back() {
        let mut appender = Appender::new(FlakySegment::default());
        appender.append(b"first\n").unwrap();

        appender.segment.write_budget = Some(3);
        assert!(matches!(
            appender.append(b"second\n"),
            Err(LedgerError::StorageFailure { .. })
        ));
        assert_eq!(appender.segment.data, b"first\n");

        appender.segment.write_budget = None;
        appender.append(b"third\n").unwrap();
        assert_eq!(appender.segment.data, b"first\nthird\n");
    }

    #[test]
    fn test_failed_rollback_refuses_later_appends() {
        let mut appender = Appender::new(FlakySegment::default());
        appender.append(b"first\n").unwrap();

        appender.segment.write_budget = Some(3);
        appender.segment.truncate_fails = true;
        assert!(appender.append(b"second\n").is_err());
        assert_eq!(appender.segment.data, b"first\nsec");

        appender.segment.write_budget = None;
        appender.segment.truncate_fails = false;
        let refused = appender.append(b"third\n");

        assert!(matches!(refused, Err(LedgerError::StorageFailure { .. })));
        assert!(refused.unwrap_err().is_retryable());
        assert_eq!(appender.segment.data, b"first\nsec");
    }
}
