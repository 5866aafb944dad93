//! Thread-safe balance ledger
//!
//! This module provides the `InMemoryLedger` struct, the single source of truth
//! for every user's spendable coin balance.
//!
//! # Design
//!
//! The ledger uses `DashMap` (a concurrent HashMap) keyed by user ID. The
//! read-compute-write sequence of `apply_delta` runs while holding the entry
//! guard for the user's row, which plays the role of `SELECT ... FOR UPDATE`
//! in a relational store: two approvals for the same user are serialized,
//! approvals for different users proceed in parallel.
//!
//! # Invariants
//!
//! The balance is never written directly. It is recomputed from the
//! lifetime totals on every write, so `balance == total_earned - total_redeemed`
//! holds by construction, and a write that would make it negative is refused.

use crate::core::traits::BalanceLedger;
use crate::types::{CoinBalance, Coins, LoyaltyError, UserId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{error, trace};

/// Thread-safe per-user coin balances
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Ledger rows by user ID
    balances: DashMap<UserId, CoinBalance>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.balances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balances.is_empty()
    }
}

impl BalanceLedger for InMemoryLedger {
    fn get_or_create(&self, user: UserId) -> CoinBalance {
        self.balances
            .entry(user)
            .or_insert_with(|| CoinBalance::new(user))
            .clone()
    }

    fn get(&self, user: UserId) -> Result<CoinBalance, LoyaltyError> {
        self.balances
            .get(&user)
            .map(|entry| entry.value().clone())
            .ok_or(LoyaltyError::LedgerNotFound { user })
    }

    /// Apply a finalized transaction's effect to the user's row
    ///
    /// The row is created at zero if this is the user's first finalized
    /// transaction. Nothing is written unless every check passes.
    fn apply_delta(
        &self,
        user: UserId,
        earned_delta: Coins,
        redeemed_delta: Coins,
    ) -> Result<CoinBalance, LoyaltyError> {
        if earned_delta < 0 || redeemed_delta < 0 {
            return Err(LoyaltyError::InvalidDelta {
                user,
                earned: earned_delta,
                redeemed: redeemed_delta,
            });
        }

        let entry = self.balances.entry(user);
        let current = match &entry {
            Entry::Occupied(row) => row.get().clone(),
            Entry::Vacant(_) => CoinBalance::new(user),
        };

        let total_earned = current
            .total_earned
            .checked_add(earned_delta)
            .ok_or_else(|| LoyaltyError::arithmetic_overflow("credit", user))?;
        let total_redeemed = current
            .total_redeemed
            .checked_add(redeemed_delta)
            .ok_or_else(|| LoyaltyError::arithmetic_overflow("debit", user))?;
        let balance = total_earned
            .checked_sub(total_redeemed)
            .ok_or_else(|| LoyaltyError::arithmetic_overflow("balance", user))?;

        if balance < 0 {
            error!(
                user,
                balance,
                current = current.balance,
                earned_delta,
                redeemed_delta,
                "ledger write would leave a negative balance"
            );
            return Err(LoyaltyError::LedgerInconsistency { user, balance });
        }

        let row = CoinBalance {
            user_id: user,
            balance,
            total_earned,
            total_redeemed,
        };
        entry.insert(row.clone());
        trace!(user, balance, total_earned, total_redeemed, "ledger row updated");

        Ok(row)
    }

    fn all(&self) -> Vec<CoinBalance> {
        let mut rows: Vec<CoinBalance> = self
            .balances
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by_key(|row| row.user_id);
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_get_or_create_creates_zero_row() {
        let ledger = InMemoryLedger::new();

        let row = ledger.get_or_create(1);

        assert_eq!(row, CoinBalance::new(1));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_get_missing_row_is_ledger_not_found() {
        let ledger = InMemoryLedger::new();

        assert_eq!(ledger.get(9), Err(LoyaltyError::LedgerNotFound { user: 9 }));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_apply_delta_creates_row_on_first_write() {
        let ledger = InMemoryLedger::new();

        let row = ledger.apply_delta(1, 100, 0).unwrap();

        assert_eq!(row.balance, 100);
        assert_eq!(row.total_earned, 100);
        assert_eq!(row.total_redeemed, 0);
        assert_eq!(ledger.get(1).unwrap(), row);
    }

    #[test]
    fn test_apply_delta_nets_earned_and_redeemed() {
        let ledger = InMemoryLedger::new();
        ledger.apply_delta(1, 200, 0).unwrap();

        let row = ledger.apply_delta(1, 100, 50).unwrap();

        assert_eq!(row.balance, 250);
        assert_eq!(row.total_earned, 300);
        assert_eq!(row.total_redeemed, 50);
        assert!(row.is_consistent());
    }

    #[test]
    fn test_apply_delta_refuses_negative_balance_without_writing() {
        let ledger = InMemoryLedger::new();
        ledger.apply_delta(1, 30, 0).unwrap();

        let result = ledger.apply_delta(1, 0, 50);

        assert_eq!(
            result,
            Err(LoyaltyError::LedgerInconsistency {
                user: 1,
                balance: -20
            })
        );
        let row = ledger.get(1).unwrap();
        assert_eq!(row.balance, 30);
        assert_eq!(row.total_redeemed, 0);
    }

    #[test]
    fn test_refused_first_write_creates_no_row() {
        let ledger = InMemoryLedger::new();

        assert!(ledger.apply_delta(5, 0, 10).is_err());

        assert_eq!(ledger.get(5), Err(LoyaltyError::LedgerNotFound { user: 5 }));
        assert!(ledger.is_empty());
    }

    #[rstest]
    #[case::negative_earned(-1, 0)]
    #[case::negative_redeemed(0, -1)]
    fn test_apply_delta_rejects_negative_deltas(#[case] earned: Coins, #[case] redeemed: Coins) {
        let ledger = InMemoryLedger::new();

        let result = ledger.apply_delta(1, earned, redeemed);

        assert!(matches!(result, Err(LoyaltyError::InvalidDelta { user: 1, .. })));
    }

    #[test]
    fn test_apply_delta_overflow_is_rejected() {
        let ledger = InMemoryLedger::new();
        ledger.apply_delta(1, Coins::MAX, 0).unwrap();

        let result = ledger.apply_delta(1, 1, 0);

        assert!(matches!(
            result,
            Err(LoyaltyError::ArithmeticOverflow { user: 1, .. })
        ));
        assert_eq!(ledger.get(1).unwrap().balance, Coins::MAX);
    }

    #[test]
    fn test_all_is_sorted_by_user() {
        let ledger = InMemoryLedger::new();
        ledger.apply_delta(3, 1, 0).unwrap();
        ledger.apply_delta(1, 1, 0).unwrap();
        ledger.apply_delta(2, 1, 0).unwrap();

        let users: Vec<UserId> = ledger.all().iter().map(|row| row.user_id).collect();

        assert_eq!(users, vec![1, 2, 3]);
    }

    // Concurrent writers on the same row must not lose updates
    #[test]
    fn test_concurrent_apply_delta_same_user() {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut handles = vec![];

        for _ in 0..10 {
            let ledger_clone = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    ledger_clone.apply_delta(1, 2, 1).unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let row = ledger.get(1).unwrap();
        assert_eq!(row.total_earned, 2000);
        assert_eq!(row.total_redeemed, 1000);
        assert_eq!(row.balance, 1000);
    }

    #[test]
    fn test_concurrent_apply_delta_different_users() {
        let ledger = Arc::new(InMemoryLedger::new());
        let mut handles = vec![];

        for user in 0..10u64 {
            let ledger_clone = Arc::clone(&ledger);
            handles.push(thread::spawn(move || {
                ledger_clone.apply_delta(user, 50, 0).unwrap();
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(ledger.len(), 10);
        assert!(ledger.all().iter().all(|row| row.balance == 50));
    }
}
