//! Core business logic module
//!
//! This module contains the coin transaction components:
//! - `traits` - Repository traits at the seams of the core
//! - `processor` - Transaction lifecycle state machine
//! - `rules` - Coin arithmetic and redemption checks
//! - `ledger` - Per-user balance ledger
//! - `transaction_store` - Transaction record storage
//! - `directory` - Brand and user lookups
//! - `staging` - Pre-authentication upload staging
//! - `notify` - Status change notification sinks
//! - `review` - Admin review surface
//! - `batch_processor` - Concurrent batch execution partitioned by user

pub mod batch_processor;
pub mod directory;
pub mod ledger;
pub mod notify;
pub mod processor;
pub mod review;
pub mod rules;
pub mod staging;
pub mod traits;
pub mod transaction_store;

pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use directory::{InMemoryBrandDirectory, InMemoryUserDirectory};
pub use ledger::InMemoryLedger;
pub use notify::{ChannelNotifier, TracingNotifier};
pub use processor::{ProcessorConfig, TransactionProcessor};
pub use review::AdminReview;
pub use staging::PendingStaging;
pub use traits::{BalanceLedger, BrandDirectory, NotificationSink, TransactionStore, UserDirectory};
pub use transaction_store::InMemoryTransactionStore;
