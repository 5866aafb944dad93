//! Repository traits at the seams of the core
//!
//! The processor talks to its state and collaborators only through these
//! traits, so the in-memory implementations in this crate can be swapped for
//! relational ones without touching the transaction lifecycle.

use crate::types::{
    Brand, BrandId, CoinBalance, CoinTransaction, Coins, LoyaltyError, StatusChange,
    TransactionId, User, UserId,
};

/// Per-user running coin totals
///
/// `apply_delta` is the only write path and must serialize concurrent
/// writers for the same user (row-level lock or equivalent).
pub trait BalanceLedger: Send + Sync {
    /// Get the user's row, creating a zero row if absent
    fn get_or_create(&self, user: UserId) -> CoinBalance;

    /// Get the user's row
    fn get(&self, user: UserId) -> Result<CoinBalance, LoyaltyError>;

    /// Atomically add to the lifetime totals and recompute the balance
    ///
    /// Fails without writing if a delta is negative, arithmetic overflows,
    /// or the resulting balance would be negative.
    fn apply_delta(
        &self,
        user: UserId,
        earned_delta: Coins,
        redeemed_delta: Coins,
    ) -> Result<CoinBalance, LoyaltyError>;

    /// Snapshot of every row
    fn all(&self) -> Vec<CoinBalance>;
}

/// Coin transaction records
pub trait TransactionStore: Send + Sync {
    /// Insert the record built by `f` unless the ID is already taken
    ///
    /// `f` runs while the ID is reserved, so side effects it performs are
    /// never duplicated by a concurrent insert of the same ID.
    fn insert_with<F>(&self, tx: TransactionId, f: F) -> Result<CoinTransaction, LoyaltyError>
    where
        F: FnOnce() -> Result<CoinTransaction, LoyaltyError>;

    /// Get a transaction by ID
    fn get(&self, tx: TransactionId) -> Option<CoinTransaction>;

    /// Update a transaction using a closure
    ///
    /// The closure works on a staged copy which is committed only if the
    /// closure succeeds and the change respects the record invariants.
    fn update<F, R>(&self, tx: TransactionId, f: F) -> Result<R, LoyaltyError>
    where
        F: FnOnce(&mut CoinTransaction) -> Result<R, LoyaltyError>;

    /// All records matching `predicate`, ordered by ID
    fn find<P>(&self, predicate: P) -> Vec<CoinTransaction>
    where
        P: Fn(&CoinTransaction) -> bool;
}

/// Read-only view of partner brands
pub trait BrandDirectory: Send + Sync {
    /// The brand if it exists and is active
    fn get_active_brand(&self, brand: BrandId) -> Option<Brand>;
}

/// Read-only view of users
pub trait UserDirectory: Send + Sync {
    fn get_user(&self, user: UserId) -> Option<User>;
}

/// Fire-and-forget sink for status transitions
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: StatusChange);
}
