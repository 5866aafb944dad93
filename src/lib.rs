//! Coin Ledger Library
//! # Overview
//!
//! This library provides the transactional core of a loyalty cashback
//! program: users earn coins on partner-brand bills and redeem them as
//! discounts, under per-brand rules and admin review. A CSV batch driver
//! replays operations through a sync or an async strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (CoinTransaction, CoinBalance, Brand, etc.)
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::processor`] - Transaction lifecycle and ledger application
//!   - [`core::rules`] - Coin earning and redemption arithmetic
//!   - [`core::ledger`] - Per-user balance ledger
//!   - [`core::transaction_store`] - Transaction records with immutability guards
//!   - [`core::review`] - Admin review queues
//! - [`io`] - CSV operations, catalogs and output
//! - [`strategy`] - Sync and async processing pipelines
//!
//! # Transaction Lifecycle
//!
//! ```text
//! submit ──► PENDING ──approve──► PAID                 (earn)
//!               │    ──approve──► APPROVED ──pay──► PAID   (redeem)
//!               └────reject───► REJECTED
//! ```
//!
//! A transaction touches the ledger exactly once, when it is approved.
//! Welcome bonuses and adjustments are created already PAID and applied
//! immediately.
//!
//! # Balance Rows
//!
//! Each user's ledger row maintains:
//! - `balance`: Coins currently spendable
//! - `total_earned`: Coins ever credited
//! - `total_redeemed`: Coins ever debited
//! - `balance == total_earned - total_redeemed` at all times

pub mod cli;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use core::{BalanceLedger, TransactionProcessor, TransactionStore};
pub use io::{write_balances_csv, write_transactions_csv, Catalog};
pub use types::{
    Brand, BrandRules, CoinBalance, CoinTransaction, Coins, LoyaltyError, Operation,
    PaymentDetails, SubmitRewardRequest, TransactionId, TransactionStatus, TransactionType, UserId,
};
