//! Coin ledger batch driver
//!
//! Replays a CSV file of loyalty coin operations against an in-memory
//! processor seeded from brand and user catalogs, then prints the final
//! per-user balances.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- --brands brands.csv ops.csv > balances.csv
//! cargo run -- --brands brands.csv --users users.csv --strategy sync ops.csv > balances.csv
//! cargo run -- --brands brands.csv --transactions tx.csv --batch-size 2000 --max-concurrent 8 ops.csv > balances.csv
//! ```
//!
//! Logs go to stderr and are filtered with `RUST_LOG` (default `coin_ledger=info`).
//!
//! # Exit Codes
//!
//! - 0: Success (refused operations and malformed rows are logged, not fatal)
//! - 1: Error (missing arguments, unreadable catalog or input, unwritable output)

use coin_ledger::cli;
use coin_ledger::io::{write_transactions_csv, Catalog};
use coin_ledger::strategy;
use std::fs::File;
use std::process;
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coin_ledger=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();

    let catalog = match Catalog::load(&args.brands_file, args.users_file.as_deref()) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "failed to load catalog");
            process::exit(1);
        }
    };
    let processor = Arc::new(catalog.into_processor(args.to_processor_config()));

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config)
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.input_file, &processor, &mut output) {
        error!(error = %e, "processing failed");
        process::exit(1);
    }

    if let Some(path) = &args.transactions_file {
        let written = File::create(path)
            .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))
            .and_then(|mut file| write_transactions_csv(&processor.transactions(), &mut file));
        if let Err(e) = written {
            error!(error = %e, "failed to write transactions");
            process::exit(1);
        }
    }
}
