//! Thread-safe transaction storage
//!
//! This module provides the `InMemoryTransactionStore` struct, which holds every
//! coin transaction record using concurrent data structures to enable safe
//! multi-threaded access.
//!
//! # Design
//!
//! The store uses `DashMap` (a concurrent HashMap) keyed by transaction ID.
//! Operations on the same transaction are serialized by the entry guard, which
//! stands in for a row lock: a closure passed to `update` runs while no other
//! thread can read or write that record, so two admins approving the same
//! request cannot both apply it to the ledger.
//!
//! # Atomicity
//!
//! `update` hands the closure a staged copy of the record. The copy replaces
//! the stored record only if the closure succeeds and
//! [`CoinTransaction::check_change`] accepts the result. A closure that fails
//! part-way therefore leaves the record exactly as it was.

use crate::core::traits::TransactionStore;
use crate::types::{CoinTransaction, LoyaltyError, TransactionId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::error;

/// Thread-safe coin transaction records
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    /// Records by transaction ID
    transactions: DashMap<TransactionId, CoinTransaction>,
}

impl InMemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn insert_with<F>(&self, tx: TransactionId, f: F) -> Result<CoinTransaction, LoyaltyError>
    where
        F: FnOnce() -> Result<CoinTransaction, LoyaltyError>,
    {
        match self.transactions.entry(tx) {
            Entry::Occupied(existing) => Err(LoyaltyError::DuplicateTransaction {
                tx,
                user: existing.get().user_id,
            }),
            Entry::Vacant(slot) => {
                let record = f()?;
                if record.id != tx {
                    error!(tx, built = record.id, "record built for another transaction ID");
                    return Err(LoyaltyError::ImmutableTransaction { tx });
                }
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    fn get(&self, tx: TransactionId) -> Option<CoinTransaction> {
        self.transactions
            .get(&tx)
            .map(|entry| entry.value().clone())
    }

    fn update<F, R>(&self, tx: TransactionId, f: F) -> Result<R, LoyaltyError>
    where
        F: FnOnce(&mut CoinTransaction) -> Result<R, LoyaltyError>,
    {
        let mut entry = self
            .transactions
            .get_mut(&tx)
            .ok_or_else(|| LoyaltyError::transaction_not_found(tx, "update"))?;

        let mut staged = entry.value().clone();
        let result = f(&mut staged)?;
        entry.value().check_change(&staged)?;
        *entry.value_mut() = staged;

        Ok(result)
    }

    fn find<P>(&self, predicate: P) -> Vec<CoinTransaction>
    where
        P: Fn(&CoinTransaction) -> bool,
    {
        let mut matches: Vec<CoinTransaction> = self
            .transactions
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by_key(|record| record.id);
        matches
    }
}
