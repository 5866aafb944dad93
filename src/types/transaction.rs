//! Transaction-related types for the coin ledger
//!
//! This module defines the transaction record, its type and status, and the
//! status state machine that every change to a record must respect.

use super::brand::BrandId;
use super::error::LoyaltyError;
use super::user::{AdminId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction identifier
///
/// Supplied by the caller, so it doubles as an idempotency key for
/// submissions.
pub type TransactionId = u64;

/// Whole coins
pub type Coins = i64;

/// Kind of coin transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Bill that only earns coins
    Earn,

    /// Bill paid partly with coins and earning nothing
    Redeem,

    /// One-off credit when a user joins
    WelcomeBonus,

    /// Manual admin credit or debit
    Adjustment,

    /// Bill that both earns and redeems coins
    RewardRequest,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Earn => write!(f, "EARN"),
            TransactionType::Redeem => write!(f, "REDEEM"),
            TransactionType::WelcomeBonus => write!(f, "WELCOME_BONUS"),
            TransactionType::Adjustment => write!(f, "ADJUSTMENT"),
            TransactionType::RewardRequest => write!(f, "REWARD_REQUEST"),
        }
    }
}

/// Status of a coin transaction
///
/// ```text
/// PENDING ──approve (nothing redeemed)──▶ PAID
///    │  └───approve (coins redeemed)───▶ APPROVED ──pay──▶ PAID
///    └──────reject──────────────────────▶ REJECTED
/// ```
///
/// `REJECTED` and `PAID` are terminal. No transition returns to `PENDING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Submitted, awaiting admin review; ledger untouched
    Pending,

    /// Approved and applied to the ledger; a payout is still owed
    Approved,

    /// Refused; never applied to the ledger
    Rejected,

    /// Applied to the ledger and nothing further is owed
    Paid,
}

impl TransactionStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Rejected | TransactionStatus::Paid)
    }

    /// Whether the ledger has been credited/debited for a record in this status
    pub fn is_applied(self) -> bool {
        matches!(self, TransactionStatus::Approved | TransactionStatus::Paid)
    }

    /// Whether `self -> next` is an edge of the state machine
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Approved) | (Pending, Rejected) | (Pending, Paid) | (Approved, Paid)
        )
    }

    /// Status a pending record moves to when approved
    ///
    /// Redemptions owe the user a payout and stop at `APPROVED` until
    /// the payment is recorded; pure earns are settled immediately.
    pub fn on_approval(coins_redeemed: Coins) -> TransactionStatus {
        if coins_redeemed > 0 {
            TransactionStatus::Approved
        } else {
            TransactionStatus::Paid
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Pending => write!(f, "PENDING"),
            TransactionStatus::Approved => write!(f, "APPROVED"),
            TransactionStatus::Rejected => write!(f, "REJECTED"),
            TransactionStatus::Paid => write!(f, "PAID"),
        }
    }
}

/// Channel a payout was made through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Upi,
    BankTransfer,
    Cash,
    Other,
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "upi" => Ok(PaymentMethod::Upi),
            "bank_transfer" | "bank" => Ok(PaymentMethod::BankTransfer),
            "cash" => Ok(PaymentMethod::Cash),
            "other" => Ok(PaymentMethod::Other),
            other => Err(format!("Unknown payment method '{}'", other)),
        }
    }
}

/// External payout recorded against an approved redemption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecord {
    /// Reference issued by the payment provider
    pub reference: String,
    pub method: PaymentMethod,
    pub amount: Decimal,
}

/// One earn/redeem request and its review outcome
///
/// While `PENDING` every field may be written. Afterwards only `status`,
/// `admin_notes`, `reviewed_by`, `payment` and the timestamps change; the
/// store refuses updates that touch anything returned by [`financials`].
///
/// [`financials`]: CoinTransaction::financials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinTransaction {
    pub id: TransactionId,
    pub user_id: UserId,

    /// `None` for welcome bonuses and adjustments, or once the brand is gone
    pub brand_id: Option<BrandId>,
    pub tx_type: TransactionType,
    pub bill_amount: Decimal,
    pub bill_date: Option<NaiveDate>,
    pub coins_earned: Coins,
    pub coins_redeemed: Coins,

    /// Net effect on the balance: earned minus redeemed
    pub amount: Coins,
    pub status: TransactionStatus,

    /// Opaque reference into the receipt store
    pub receipt_url: Option<String>,
    pub admin_notes: Option<String>,
    pub reviewed_by: Option<AdminId>,
    pub payment: Option<PaymentRecord>,

    pub created_at: DateTime<Utc>,
    pub status_updated_at: DateTime<Utc>,

    /// When an admin approved or rejected the request
    pub processed_at: Option<DateTime<Utc>>,
    pub payment_processed_at: Option<DateTime<Utc>>,
}

impl CoinTransaction {
    /// The fields frozen once the record leaves `PENDING`
    pub fn financials(&self) -> (Decimal, Coins, Coins, Coins) {
        (
            self.bill_amount,
            self.coins_earned,
            self.coins_redeemed,
            self.amount,
        )
    }

    /// Whether approval leaves a payout owed to the user
    pub fn requires_payout(&self) -> bool {
        self.coins_redeemed > 0
    }

    /// Whether a payout is currently owed
    pub fn payout_outstanding(&self) -> bool {
        self.status == TransactionStatus::Approved
    }

    /// Move to `next`, stamping the status timestamp
    ///
    /// Callers validate the edge; the store re-checks it on commit.
    pub(crate) fn transition(&mut self, next: TransactionStatus, at: DateTime<Utc>) {
        self.status = next;
        self.status_updated_at = at;
    }

    /// Check that `next` is a legal successor of this record
    ///
    /// Identity never changes, amounts are frozen once the record has left
    /// `PENDING`, and any status change must follow the state machine.
    pub fn check_change(&self, next: &CoinTransaction) -> Result<(), LoyaltyError> {
        if next.id != self.id || next.user_id != self.user_id {
            return Err(LoyaltyError::ImmutableTransaction { tx: self.id });
        }
        if self.status != TransactionStatus::Pending && next.financials() != self.financials() {
            return Err(LoyaltyError::ImmutableTransaction { tx: self.id });
        }
        if next.status != self.status && !self.status.can_transition_to(next.status) {
            return Err(LoyaltyError::invalid_state_transition(
                self.id,
                self.status,
                "update",
            ));
        }
        Ok(())
    }
}
