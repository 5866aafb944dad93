//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over operations from a CSV file.
//! Supports batch reading for efficient async processing.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of Operations
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::Operation;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Rows that fail to parse are logged, counted, and skipped.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    rejected: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            rejected: 0,
        }
    }

    /// Read up to `batch_size` operations
    ///
    /// An empty batch means the input is exhausted.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Operation> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(csv_record)) => match convert_csv_record(csv_record) {
                    Ok(operation) => batch.push(operation),
                    Err(e) => {
                        self.rejected += 1;
                        warn!(error = %e, "skipping invalid operation");
                    }
                },
                Some(Err(e)) => {
                    self.rejected += 1;
                    warn!(error = %e, "skipping unparseable row");
                }
                None => break,
            }
        }

        batch
    }

    /// Rows skipped so far because they could not be parsed
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}
