//! I/O module
//!
//! Handles CSV parsing, CSV output and the durable journal.
//!
//! # Components
//!
//! - `csv_format` - CSV record types, conversion and account output
//! - `sync_reader` - Synchronous operations iterator and accounts loader
//! - `async_reader` - Asynchronous batch reader for operations
//! - `journal` - JSON-lines commit journal with replay

pub mod async_reader;
pub mod csv_format;
pub mod journal;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{write_accounts_csv, AccountSeed};
pub use journal::{FileJournal, JournalState};
pub use sync_reader::{read_accounts, SyncReader};
