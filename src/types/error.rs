//! Error types for the coin ledger
//!
//! This module defines all error types that can occur while submitting,
//! reviewing, and settling coin transactions.
//!
//! # Error Categories
//!
//! - **Request Errors**: Non-positive bill amounts, malformed request fields
//! - **Rule Errors**: Unavailable brands, redemption caps and minimums
//! - **Lifecycle Errors**: Invalid status transitions, immutable records, duplicates
//! - **Ledger Errors**: Missing ledger rows, negative balances, arithmetic overflow
//! - **Input Errors**: File I/O and CSV parsing failures in the batch driver

use crate::types::{BrandId, Coins, TransactionId, TransactionStatus, UserId, UserStatus};
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Which limit a redemption request ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionLimit {
    /// The brand's per-transaction absolute ceiling
    BrandCap,
    /// The brand's redemption percentage applied to the bill amount
    BillShare,
    /// The user's current spendable balance
    Balance,
}

impl fmt::Display for RedemptionLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedemptionLimit::BrandCap => write!(f, "brandwise max cap"),
            RedemptionLimit::BillShare => write!(f, "redeemable share of bill"),
            RedemptionLimit::Balance => write!(f, "available balance"),
        }
    }
}

/// Main error type for the coin ledger
///
/// Every variant is surfaced to the caller with a human-readable reason;
/// nothing is swallowed by the core. `LedgerInconsistency` is additionally
/// logged as a severe anomaly where it is raised.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoyaltyError {
    /// Bill amount was zero or negative
    #[error("Invalid bill amount {amount}: must be greater than zero")]
    InvalidAmount {
        /// The rejected bill amount
        amount: Decimal,
    },

    /// Brand is missing or deactivated
    #[error("Brand {brand} is unavailable")]
    BrandUnavailable {
        /// Brand ID that was requested
        brand: BrandId,
    },

    /// Requested redemption is above one of the applicable limits
    #[error("Redemption of {requested} coins exceeds {limit} of {allowed}")]
    RedemptionLimitExceeded {
        /// Coins the user asked to redeem
        requested: Coins,
        /// The most that could have been redeemed under `limit`
        allowed: Coins,
        /// Which limit was hit
        limit: RedemptionLimit,
    },

    /// Requested redemption is below the brand's minimum
    #[error("Redemption of {requested} coins is below the brand minimum of {minimum}")]
    RedemptionBelowMinimum {
        /// Coins the user asked to redeem
        requested: Coins,
        /// Brand minimum
        minimum: Coins,
    },

    /// Operation attempted on a transaction not in the required source state
    #[error("Cannot {operation} transaction {tx} in status {from}")]
    InvalidStateTransition {
        /// Transaction ID
        tx: TransactionId,
        /// Status the transaction was in
        from: TransactionStatus,
        /// Operation that was refused
        operation: String,
    },

    /// Applying a delta would leave the ledger negative
    #[error("Ledger inconsistency for user {user}: balance would become {balance}")]
    LedgerInconsistency {
        /// User whose ledger was being written
        user: UserId,
        /// The balance the write would have produced
        balance: Coins,
    },

    /// No ledger row exists for the user
    #[error("No coin balance found for user {user}")]
    LedgerNotFound {
        /// User ID
        user: UserId,
    },

    /// Transaction lookup failed
    #[error("Transaction {tx} not found for {operation}")]
    TransactionNotFound {
        /// Transaction ID that was not found
        tx: TransactionId,
        /// Operation that failed
        operation: String,
    },

    /// Transaction ID already used
    #[error("Duplicate transaction ID {tx} for user {user}")]
    DuplicateTransaction {
        /// Transaction ID that is duplicated
        tx: TransactionId,
        /// Owner of the existing transaction
        user: UserId,
    },

    /// User lookup failed
    #[error("User {user} not found")]
    UserNotFound {
        /// User ID
        user: UserId,
    },

    /// User exists but may not transact
    #[error("User {user} is {status} and cannot transact")]
    UserInactive {
        /// User ID
        user: UserId,
        /// Current user status
        status: UserStatus,
    },

    /// The user named on an operation does not own the transaction
    #[error("User mismatch for {operation} on transaction {tx}: expected user {expected_user}, got user {actual_user}")]
    UserMismatch {
        /// Transaction ID
        tx: TransactionId,
        /// Owner of the transaction
        expected_user: UserId,
        /// User named by the operation
        actual_user: UserId,
        /// Operation that failed
        operation: String,
    },

    /// Rejection without a reason
    #[error("Rejecting transaction {tx} requires a reason")]
    MissingReason {
        /// Transaction ID
        tx: TransactionId,
    },

    /// A request field failed boundary validation
    #[error("Invalid request field '{field}': {message}")]
    InvalidRequest {
        /// Offending field name
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// Ledger deltas must be non-negative
    #[error("Invalid ledger delta for user {user}: earned {earned}, redeemed {redeemed}")]
    InvalidDelta {
        /// User ID
        user: UserId,
        /// Earned delta supplied
        earned: Coins,
        /// Redeemed delta supplied
        redeemed: Coins,
    },

    /// Attempt to change the financial fields of a finalized transaction
    #[error("Transaction {tx} is no longer pending and its amounts are immutable")]
    ImmutableTransaction {
        /// Transaction ID
        tx: TransactionId,
    },

    /// Staged upload lookup failed
    #[error("No pending upload for session '{session}'")]
    PendingNotFound {
        /// Session key
        session: String,
    },

    /// Staged upload outlived its TTL
    #[error("Pending upload for session '{session}' has expired")]
    PendingExpired {
        /// Session key
        session: String,
    },

    /// Welcome bonus is granted once per user
    #[error("Welcome bonus already granted to user {user}")]
    WelcomeBonusAlreadyGranted {
        /// User ID
        user: UserId,
    },

    /// Arithmetic overflow would occur
    #[error("Arithmetic overflow in {operation} for user {user}")]
    ArithmeticOverflow {
        /// Operation that would overflow
        operation: String,
        /// User ID
        user: UserId,
    },

    /// Brand configuration is out of range
    #[error("Invalid rules for brand {brand}: {message}")]
    InvalidBrandRules {
        /// Brand ID
        brand: BrandId,
        /// Description of the problem
        message: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },
}

impl From<std::io::Error> for LoyaltyError {
    fn from(error: std::io::Error) -> Self {
        LoyaltyError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for LoyaltyError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LoyaltyError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

// Helper functions for creating common errors

impl LoyaltyError {
    pub fn invalid_amount(amount: Decimal) -> Self {
        LoyaltyError::InvalidAmount { amount }
    }

    pub fn brand_unavailable(brand: BrandId) -> Self {
        LoyaltyError::BrandUnavailable { brand }
    }

    pub fn redemption_limit_exceeded(
        requested: Coins,
        allowed: Coins,
        limit: RedemptionLimit,
    ) -> Self {
        LoyaltyError::RedemptionLimitExceeded {
            requested,
            allowed,
            limit,
        }
    }

    pub fn invalid_state_transition(
        tx: TransactionId,
        from: TransactionStatus,
        operation: &str,
    ) -> Self {
        LoyaltyError::InvalidStateTransition {
            tx,
            from,
            operation: operation.to_string(),
        }
    }

    pub fn transaction_not_found(tx: TransactionId, operation: &str) -> Self {
        LoyaltyError::TransactionNotFound {
            tx,
            operation: operation.to_string(),
        }
    }

    pub fn user_mismatch(
        tx: TransactionId,
        expected_user: UserId,
        actual_user: UserId,
        operation: &str,
    ) -> Self {
        LoyaltyError::UserMismatch {
            tx,
            expected_user,
            actual_user,
            operation: operation.to_string(),
        }
    }

    pub fn invalid_request(field: &str, message: impl Into<String>) -> Self {
        LoyaltyError::InvalidRequest {
            field: field.to_string(),
            message: message.into(),
        }
    }

    pub fn arithmetic_overflow(operation: &str, user: UserId) -> Self {
        LoyaltyError::ArithmeticOverflow {
            operation: operation.to_string(),
            user,
        }
    }

    /// Whether the error reflects a broken invariant rather than bad input
    pub fn is_anomaly(&self) -> bool {
        matches!(
            self,
            LoyaltyError::LedgerInconsistency { .. } | LoyaltyError::ImmutableTransaction { .. }
        )
    }
}
