//! Synchronous processing strategy
//!
//! Reads the operations file row by row and executes each operation on the
//! calling thread, in input order.

use crate::core::TransactionProcessor;
use crate::io::csv_format::write_balances_csv;
use crate::io::sync_reader::SyncReader;
use crate::strategy::{ProcessingStrategy, ProcessingSummary};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Single-threaded streaming strategy
#[derive(Debug, Clone, Copy)]
pub struct SyncProcessingStrategy;

impl ProcessingStrategy for SyncProcessingStrategy {
    fn process(
        &self,
        input_path: &Path,
        processor: &Arc<TransactionProcessor>,
        output: &mut dyn Write,
    ) -> Result<ProcessingSummary, String> {
        let reader = SyncReader::new(input_path)?;
        let mut summary = ProcessingSummary::default();

        for result in reader {
            match result {
                Ok(operation) => {
                    let name = operation.name();
                    let tx = operation.tx();
                    match processor.execute(operation) {
                        Ok(_) => summary.executed += 1,
                        Err(e) if e.is_anomaly() => {
                            summary.refused += 1;
                            error!(operation = name, tx, error = %e, "operation refused");
                        }
                        Err(e) => {
                            summary.refused += 1;
                            warn!(operation = name, tx, error = %e, "operation refused");
                        }
                    }
                }
                Err(e) => {
                    summary.malformed += 1;
                    warn!(error = %e, "skipping malformed row");
                }
            }
        }

        write_balances_csv(&processor.balances(), output)?;

        info!(
            executed = summary.executed,
            refused = summary.refused,
            malformed = summary.malformed,
            "sync processing finished"
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

    #[test]
    fn test_sync_strategy_processes_earn_flow() {
        let file = create_temp_csv("submit,1,1,1,1000,,,,,\napprove,1,1,,,,,,,9\n");
        let mut output = Vec::new();

        let summary = SyncProcessingStrategy
            .process(file.path(), &processor(), &mut output)
            .unwrap();

        assert_eq!(summary.executed, 2);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "user,balance,total_earned,total_redeemed\n1,100,100,0\n"
        );
    }

    #[test]
    fn test_sync_strategy_handles_missing_file() {
        let mut output = Vec::new();

        let result =
            SyncProcessingStrategy.process(Path::new("nonexistent.csv"), &processor(), &mut output);

        assert!(result.is_err());
    }

    #[test]
    fn test_sync_strategy_continues_after_refusals_and_malformed_rows() {
        let file = create_temp_csv(
            "approve,1,5,,,,,,,9\n\
             bogus,1,6,,,,,,,\n\
             submit,1,1,1,1000,,,,,\n\
             approve,1,1,,,,,,,9\n",
        );
        let mut output = Vec::new();

        let summary = SyncProcessingStrategy
            .process(file.path(), &processor(), &mut output)
            .unwrap();

        assert_eq!(
            summary,
            ProcessingSummary {
                executed: 2,
                refused: 1,
                malformed: 1
            }
        );
    }

    #[test]
    fn test_sync_strategy_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SyncProcessingStrategy>();
    }
}
