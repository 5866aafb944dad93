//! Processing strategy module for batch operation processing
//!
//! This module defines the Strategy pattern for complete processing pipelines,
//! encompassing both CSV parsing and execution against the transaction
//! processor. This allows different implementations (synchronous,
//! asynchronous batch) to be selected at runtime.

use crate::cli::StrategyType;
use crate::core::TransactionProcessor;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessingSummary {
    /// Operations the processor accepted, including idempotent repeats
    pub executed: usize,

    /// Operations the processor refused
    pub refused: usize,

    /// Input rows that could not be parsed into an operation
    pub malformed: usize,
}

/// Processing strategy trait for complete processing pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Execute the operations in `input_path` and write the final balances
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the operations CSV file
    /// * `processor` - Processor the operations are executed against
    /// * `output` - Writer receiving the balances CSV
    ///
    /// # Errors
    ///
    /// Returns an error only for fatal problems (input cannot be opened,
    /// output cannot be written). Refused operations and malformed rows are
    /// logged and counted, and processing continues with the next row.
    fn process(
        &self,
        input_path: &Path,
        processor: &Arc<TransactionProcessor>,
        output: &mut dyn Write,
    ) -> Result<ProcessingSummary, String>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - Which implementation to use
/// * `config` - Batch configuration, used by the async strategy only
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config))
        }
    }
}
