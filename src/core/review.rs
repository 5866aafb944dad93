//! Admin review surface
//!
//! A thin controller bound to one administrator. It lists the work queues
//! the dashboard shows and forwards review decisions to the processor, so
//! every decision is recorded with the acting admin's ID.

use crate::core::processor::TransactionProcessor;
use crate::core::traits::{BalanceLedger, TransactionStore};
use crate::types::{
    AdminId, CoinTransaction, LoyaltyError, PaymentDetails, TransactionId, TransactionStatus,
    UserId,
};

/// Review actions on behalf of a single admin
pub struct AdminReview<'a, L, S> {
    processor: &'a TransactionProcessor<L, S>,
    admin: AdminId,
}

impl<'a, L: BalanceLedger, S: TransactionStore> AdminReview<'a, L, S> {
    pub fn new(processor: &'a TransactionProcessor<L, S>, admin: AdminId) -> Self {
        Self { processor, admin }
    }

    pub fn admin(&self) -> AdminId {
        self.admin
    }

    /// Requests waiting for a decision, oldest ID first
    pub fn pending_queue(&self) -> Vec<CoinTransaction> {
        self.processor
            .transactions_where(|tx| tx.status == TransactionStatus::Pending)
    }

    /// Approved redemptions whose payout has not been recorded
    pub fn awaiting_payout(&self) -> Vec<CoinTransaction> {
        self.processor
            .transactions_where(CoinTransaction::payout_outstanding)
    }

    /// Every transaction of one user
    pub fn history(&self, user: UserId) -> Vec<CoinTransaction> {
        self.processor.transactions_where(|tx| tx.user_id == user)
    }

    pub fn approve(
        &self,
        tx: TransactionId,
        notes: Option<String>,
    ) -> Result<CoinTransaction, LoyaltyError> {
        self.processor.approve(tx, self.admin, notes)
    }

    pub fn reject(&self, tx: TransactionId, reason: &str) -> Result<CoinTransaction, LoyaltyError> {
        self.processor.reject(tx, self.admin, reason)
    }

    pub fn pay(
        &self,
        tx: TransactionId,
        payment: PaymentDetails,
    ) -> Result<CoinTransaction, LoyaltyError> {
        self.processor.process_payment(tx, self.admin, payment)
    }
}
