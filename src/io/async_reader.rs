//! Asynchronous CSV reader with batch interface
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of Operations
//!                  ↓
//!           csv_format module
//!           (OperationCsvRecord, convert_operation_record)
//! ```

use crate::io::csv_format::{convert_operation_record, OperationCsvRecord};
use crate::types::Operation;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous operations CSV reader
///
/// Reads fixed-size batches so the caller can overlap parsing with
/// application of the previous batch.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    malformed: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            malformed: 0,
        }
    }

    /// Read up to `batch_size` operations
    ///
    /// Malformed rows are logged, counted and skipped.
    ///
    /// # Returns
    ///
    /// The well-formed operations in file order; empty at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Operation> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<OperationCsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => match convert_operation_record(record) {
                    Ok(operation) => batch.push(operation),
                    Err(e) => {
                        self.malformed += 1;
                        warn!(error = %e, "skipping malformed operation row");
                    }
                },
                Some(Err(e)) => {
                    self.malformed += 1;
                    warn!(error = %e, "CSV parse error");
                }
                None => break,
            }
        }

        batch
    }

    /// Rows skipped so far because they could not be parsed
    pub fn malformed(&self) -> usize {
        self.malformed
    }
}
