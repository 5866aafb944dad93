//! I/O module
//!
//! Handles CSV parsing and output.
//!
//! # Components
//!
//! - `csv_format` - Operation record conversion, balance and transaction output
//! - `catalog` - Brand and user catalog loading
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface

pub mod async_reader;
pub mod catalog;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use catalog::Catalog;
pub use csv_format::{convert_csv_record, write_balances_csv, write_transactions_csv, CsvRecord};
pub use sync_reader::SyncReader;
