//! Row-at-a-time operation reader
//!
//! `SyncReader` walks the operations file one record at a time and turns each
//! row into an [`Operation`]. A bad row never ends the iteration: it is
//! yielded as an `Err` tagged with its line number and the next row follows.
//!
//! ```no_run
//! use coin_ledger::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(operation) => println!("{} tx {}", operation.name(), operation.tx()),
//!         Err(e) => println!("skipped: {}", e),
//!     }
//! }
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::Operation;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::path::Path;

/// Streaming reader over an operations CSV file
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    headers: StringRecord,
    record: StringRecord,
}

impl SyncReader {
    /// Open `path` and read its header row
    ///
    /// # Returns
    ///
    /// * `Ok(SyncReader)` - Positioned at the first operation
    /// * `Err(String)` - The file could not be opened or its header read
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);
        let headers = reader
            .headers()
            .map_err(|e| format!("Failed to read header of '{}': {}", path.display(), e))?
            .clone();

        Ok(Self {
            reader,
            headers,
            record: StringRecord::new(),
        })
    }

    fn decode(&self) -> Result<Operation, String> {
        // Position lines are 1-based and include the header
        let line = self.record.position().map_or(0, |pos| pos.line());
        let csv_record = self
            .record
            .deserialize::<CsvRecord>(Some(&self.headers))
            .map_err(|e| format!("Line {}: CSV parse error: {}", line, e))?;
        convert_csv_record(csv_record).map_err(|e| format!("Line {}: {}", line, e))
    }
}

impl Iterator for SyncReader {
    type Item = Result<Operation, String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.reader.read_record(&mut self.record) {
            Ok(true) => Some(self.decode()),
            Ok(false) => None,
            Err(e) => Some(Err(format!("CSV read error: {}", e))),
        }
    }
}
