use crate::core::ProcessorConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for the batch driver
#[derive(Parser, Debug)]
#[command(name = "coin-ledger")]
#[command(about = "Process loyalty coin earn/redeem operations and reconcile balances", long_about = None)]
pub struct CliArgs {
    #[arg(value_name = "INPUT", help = "Path to the operations CSV file")]
    pub input_file: PathBuf,

    #[arg(
        long = "brands",
        value_name = "FILE",
        help = "Path to the brand catalog CSV file"
    )]
    pub brands_file: PathBuf,

    #[arg(
        long = "users",
        value_name = "FILE",
        help = "Path to the user catalog CSV file (default: every user is active)"
    )]
    pub users_file: Option<PathBuf>,

    #[arg(
        long = "transactions",
        value_name = "FILE",
        help = "Also write the final transaction records to this CSV file"
    )]
    pub transactions_file: Option<PathBuf>,

    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Processing strategy: 'sync' for synchronous or 'async' for asynchronous"
    )]
    pub strategy: StrategyType,

    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of operations per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Number of worker threads (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    #[arg(
        long = "pending-ttl-hours",
        value_name = "HOURS",
        default_value_t = 24,
        help = "Hours a pre-authentication upload may wait to be claimed"
    )]
    pub pending_ttl_hours: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    pub fn to_processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            pending_ttl: chrono::Duration::hours(i64::from(self.pending_ttl_hours)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> CliArgs {
        let mut full = vec!["program", "--brands", "brands.csv"];
        full.extend_from_slice(args);
        full.push("input.csv");
        CliArgs::try_parse_from(full).unwrap()
    }

    #[rstest]
    #[case::default_strategy(&[], StrategyType::Async)]
    #[case::explicit_sync(&["--strategy", "sync"], StrategyType::Sync)]
    #[case::explicit_async(&["--strategy", "async"], StrategyType::Async)]
    fn test_strategy_parsing(#[case] args: &[&str], #[case] expected: StrategyType) {
        assert_eq!(parse(args).strategy, expected);
    }

    #[test]
    fn test_catalog_and_output_paths() {
        let parsed = parse(&["--users", "users.csv", "--transactions", "out.csv"]);

        assert_eq!(parsed.input_file, PathBuf::from("input.csv"));
        assert_eq!(parsed.brands_file, PathBuf::from("brands.csv"));
        assert_eq!(parsed.users_file, Some(PathBuf::from("users.csv")));
        assert_eq!(parsed.transactions_file, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_optional_paths_default_to_none() {
        let parsed = parse(&[]);
        assert!(parsed.users_file.is_none());
        assert!(parsed.transactions_file.is_none());
    }

    #[rstest]
    #[case::all_defaults(&[], 1000, num_cpus::get())]
    #[case::custom_batch_size(&["--batch-size", "2000"], 2000, num_cpus::get())]
    #[case::custom_max_concurrent(&["--max-concurrent", "8"], 1000, 8)]
    #[case::zero_batch_size(&["--batch-size", "0"], 1000, num_cpus::get())]
    #[case::zero_max_concurrent(&["--max-concurrent", "0"], 1000, num_cpus::get())]
    fn test_batch_config_conversion(
        #[case] args: &[&str],
        #[case] expected_batch_size: usize,
        #[case] expected_max_concurrent: usize,
    ) {
        let config = parse(args).to_batch_config();

        assert_eq!(config.batch_size, expected_batch_size);
        assert_eq!(config.max_concurrent_batches, expected_max_concurrent);
    }

    #[rstest]
    #[case::default_ttl(&[], 24)]
    #[case::custom_ttl(&["--pending-ttl-hours", "2"], 2)]
    fn test_processor_config_conversion(#[case] args: &[&str], #[case] hours: i64) {
        assert_eq!(
            parse(args).to_processor_config().pending_ttl,
            chrono::Duration::hours(hours)
        );
    }

    #[rstest]
    #[case::missing_input(&["program", "--brands", "brands.csv"])]
    #[case::missing_brands(&["program", "input.csv"])]
    #[case::invalid_strategy(&["program", "--brands", "b.csv", "--strategy", "invalid", "input.csv"])]
    #[case::negative_ttl(&["program", "--brands", "b.csv", "--pending-ttl-hours", "-1", "input.csv"])]
    fn test_parsing_errors(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
