//! Per-user coin balance
//!
//! This module defines the ledger row held for every user who has ever had
//! a transaction finalized.

use super::transaction::Coins;
use super::user::UserId;

/// A user's running coin totals
///
/// Invariants, upheld by the ledger on every write:
/// - `balance == total_earned - total_redeemed`
/// - `balance >= 0`
/// - `total_earned` and `total_redeemed` never decrease
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinBalance {
    pub user_id: UserId,

    /// Current spendable coins
    pub balance: Coins,

    /// Lifetime coins credited
    pub total_earned: Coins,

    /// Lifetime coins debited
    pub total_redeemed: Coins,
}

impl CoinBalance {
    /// Create a zeroed ledger row
    pub fn new(user_id: UserId) -> Self {
        CoinBalance {
            user_id,
            balance: 0,
            total_earned: 0,
            total_redeemed: 0,
        }
    }

    /// Whether the row satisfies the ledger invariants
    pub fn is_consistent(&self) -> bool {
        self.balance >= 0
            && self.total_earned >= 0
            && self.total_redeemed >= 0
            && self.total_earned.checked_sub(self.total_redeemed) == Some(self.balance)
    }
}
