//! Asynchronous batch processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. It executes operations in batches, running the
//! operations of different users in parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (user partitioning + tokio tasks)
//!         └── TransactionProcessor (shared, thread-safe)
//! ```
//!
//! # Ordering
//!
//! - Batches are processed one after another
//! - Within a batch, each user's operations run sequentially on one task
//! - A user's operations therefore keep input order both within and across batches

use crate::core::{BatchProcessor, TransactionProcessor};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::write_balances_csv;
use crate::strategy::{ProcessingStrategy, ProcessingSummary};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Configuration for batch processing
///
/// Controls how operations are batched and the number of worker threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchConfig {
    /// Number of operations read per batch
    pub batch_size: usize,

    /// Number of tokio worker threads
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a configuration, replacing zero values with the defaults
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
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

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid worker count, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Multi-threaded batch strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    pub fn new(config: BatchConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        processor: &Arc<TransactionProcessor>,
        output: &mut dyn Write,
    ) -> Result<ProcessingSummary, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        let summary = runtime.block_on(async {
            let batch_processor = BatchProcessor::new(Arc::clone(processor));

            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads through the futures I/O traits
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut summary = ProcessingSummary::default();

            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                // Wait for the batch before reading the next one so a user's
                // operations spanning two batches stay in order
                for outcome in batch_processor.process_batch(batch).await {
                    match outcome.result {
                        Ok(_) => summary.executed += 1,
                        Err(e) => {
                            summary.refused += 1;
                            let (name, tx) = (outcome.operation.name(), outcome.operation.tx());
                            if e.is_anomaly() {
                                error!(operation = name, tx, error = %e, "operation refused");
                            } else {
                                warn!(operation = name, tx, error = %e, "operation refused");
                            }
                        }
                    }
                }
            }

            summary.malformed = reader.rejected();
            Ok::<_, String>(summary)
        })?;

        write_balances_csv(&processor.balances(), output)?;

        info!(
            executed = summary.executed,
            refused = summary.refused,
            malformed = summary.malformed,
            batch_size = self.config.batch_size,
            workers = self.config.max_concurrent_batches,
            "async processing finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{InMemoryBrandDirectory, InMemoryUserDirectory};
    use crate::types::{Brand, BrandRules};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,user,tx,brand,amount,coins,reference,method,note,admin\n";

    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes())
            .expect("Failed to write to temp file");
        file.write_all(rows.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn processor() -> Arc<TransactionProcessor> {
        let brands = InMemoryBrandDirectory::new();
        brands.insert(Brand {
            id: 1,
            name: "Cafe".to_string(),
            is_active: true,
            rules: BrandRules::new(1, Decimal::TEN, Decimal::new(50, 0), 0, 2000).unwrap(),
        });
        Arc::new(TransactionProcessor::in_memory(
            brands,
            InMemoryUserDirectory::permissive(),
        ))
    }

    #[rstest::rstest]
    #[case::zero_batch_size(0, 4, 1000, 4)]
    #[case::zero_workers(10, 0, 10, num_cpus::get())]
    #[case::valid(10, 4, 10, 4)]
    fn test_batch_config_new(
        #[case] batch_size: usize,
        #[case] workers: usize,
        #[case] expected_batch: usize,
        #[case] expected_workers: usize,
    ) {
        let config = BatchConfig::new(batch_size, workers);
        assert_eq!(config.batch_size, expected_batch);
        assert_eq!(config.max_concurrent_batches, expected_workers);
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(Path::new("nonexistent.csv"), &processor(), &mut output);

        assert!(result.is_err());
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        // Redeeming tx 3 depends on tx 1 being approved in an earlier batch
        let file = create_temp_csv(
            "welcome,1,1,,,200,,,,\n\
             submit,2,2,1,500,,,,,\n\
             submit,1,3,1,1000,50,,,,\n\
             approve,2,2,,,,,,,9\n\
             approve,1,3,,,,,,,9\n\
             pay,1,3,,50,,UTR-3,upi,,9\n",
        );
        let strategy = AsyncProcessingStrategy::new(BatchConfig::new(2, 4));
        let shared = processor();
        let mut output = Vec::new();

        let summary = strategy.process(file.path(), &shared, &mut output).unwrap();

        assert_eq!(summary.executed, 6);
        assert_eq!(summary.refused, 0);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "user,balance,total_earned,total_redeemed\n1,250,300,50\n2,50,50,0\n"
        );
    }
}
