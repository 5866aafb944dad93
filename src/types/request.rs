//! Strongly-typed request payloads
//!
//! Requests arrive from the upload flow, the admin dashboard, or the batch
//! driver. Field-level rules (non-negative coins, non-blank references) are
//! checked by `validate` at the function boundary; rules that need brand or
//! ledger state are checked by the processor.

use super::brand::BrandId;
use super::error::LoyaltyError;
use super::transaction::{Coins, PaymentMethod, TransactionId};
use super::user::{AdminId, UserId};
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// A receipt upload asking for coins to be earned and/or redeemed
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRewardRequest {
    pub tx: TransactionId,
    pub user: UserId,
    pub brand: BrandId,
    pub bill_amount: Decimal,
    pub receipt_url: Option<String>,
    pub coins_to_redeem: Coins,
    pub bill_date: Option<NaiveDate>,
}

impl SubmitRewardRequest {
    pub fn new(tx: TransactionId, user: UserId, brand: BrandId, bill_amount: Decimal) -> Self {
        SubmitRewardRequest {
            tx,
            user,
            brand,
            bill_amount,
            receipt_url: None,
            coins_to_redeem: 0,
            bill_date: None,
        }
    }

    pub fn with_redemption(mut self, coins: Coins) -> Self {
        self.coins_to_redeem = coins;
        self
    }

    pub fn with_receipt(mut self, url: impl Into<String>) -> Self {
        self.receipt_url = Some(url.into());
        self
    }

    pub fn validate(&self) -> Result<(), LoyaltyError> {
        if self.bill_amount <= Decimal::ZERO {
            return Err(LoyaltyError::invalid_amount(self.bill_amount));
        }
        if self.coins_to_redeem < 0 {
            return Err(LoyaltyError::invalid_request(
                "coins_to_redeem",
                "must not be negative",
            ));
        }
        if matches!(&self.receipt_url, Some(url) if blank(url)) {
            return Err(LoyaltyError::invalid_request(
                "receipt_url",
                "must not be blank",
            ));
        }
        Ok(())
    }
}

/// Payout details recorded when an approved redemption is paid
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentDetails {
    /// Reference issued by the payment provider
    pub reference: String,
    pub method: PaymentMethod,
    pub amount: Decimal,
    pub notes: Option<String>,
}

impl PaymentDetails {
    pub fn validate(&self) -> Result<(), LoyaltyError> {
        if blank(&self.reference) {
            return Err(LoyaltyError::invalid_request(
                "payment_transaction_id",
                "must not be blank",
            ));
        }
        if self.amount < Decimal::ZERO {
            return Err(LoyaltyError::invalid_request(
                "payment_amount",
                "must not be negative",
            ));
        }
        Ok(())
    }
}

/// A single command for the transaction processor
///
/// This is the unit the batch driver reads from its input and routes
/// through [`TransactionProcessor::execute`].
///
/// [`TransactionProcessor::execute`]: crate::core::TransactionProcessor::execute
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Submit(SubmitRewardRequest),
    Approve {
        tx: TransactionId,
        user: UserId,
        admin: AdminId,
        notes: Option<String>,
    },
    Reject {
        tx: TransactionId,
        user: UserId,
        admin: AdminId,
        reason: String,
    },
    Pay {
        tx: TransactionId,
        user: UserId,
        admin: AdminId,
        payment: PaymentDetails,
    },
    WelcomeBonus {
        tx: TransactionId,
        user: UserId,
        coins: Coins,
    },
    Adjust {
        tx: TransactionId,
        user: UserId,
        admin: AdminId,
        delta: Coins,
        notes: Option<String>,
    },
}

impl Operation {
    /// The user whose state the operation touches
    pub fn user(&self) -> UserId {
        match self {
            Operation::Submit(request) => request.user,
            Operation::Approve { user, .. }
            | Operation::Reject { user, .. }
            | Operation::Pay { user, .. }
            | Operation::WelcomeBonus { user, .. }
            | Operation::Adjust { user, .. } => *user,
        }
    }

    pub fn tx(&self) -> TransactionId {
        match self {
            Operation::Submit(request) => request.tx,
            Operation::Approve { tx, .. }
            | Operation::Reject { tx, .. }
            | Operation::Pay { tx, .. }
            | Operation::WelcomeBonus { tx, .. }
            | Operation::Adjust { tx, .. } => *tx,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Submit(_) => "submit",
            Operation::Approve { .. } => "approve",
            Operation::Reject { .. } => "reject",
            Operation::Pay { .. } => "pay",
            Operation::WelcomeBonus { .. } => "welcome",
            Operation::Adjust { .. } => "adjust",
        }
    }
}
