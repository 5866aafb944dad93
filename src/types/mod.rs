//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `user`: User identity and status
//! - `brand`: Brand and its earning/redemption rules
//! - `balance`: Per-user ledger row
//! - `transaction`: Transaction record, type, status state machine
//! - `request`: Validated request payloads and processor operations
//! - `pending`: Pre-authentication upload staging
//! - `event`: Status change notifications
//! - `error`: Error types for the coin ledger

pub mod balance;
pub mod brand;
pub mod error;
pub mod event;
pub mod pending;
pub mod request;
pub mod transaction;
pub mod user;

pub use balance::CoinBalance;
pub use brand::{Brand, BrandId, BrandRules};
pub use error::{LoyaltyError, RedemptionLimit};
pub use event::StatusChange;
pub use pending::PendingTransaction;
pub use request::{Operation, PaymentDetails, SubmitRewardRequest};
pub use transaction::{
    CoinTransaction, Coins, PaymentMethod, PaymentRecord, TransactionId, TransactionStatus,
    TransactionType,
};
pub use user::{AdminId, User, UserId, UserStatus};
