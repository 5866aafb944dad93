//! Coin transaction lifecycle
//!
//! This module provides the `TransactionProcessor` struct, the state machine
//! that validates reward requests against brand rules, moves transactions
//! through their statuses, and applies finalized transactions to the ledger.
//!
//! # Architecture
//!
//! ```text
//! TransactionProcessor
//!     ├── Arc<L: BalanceLedger>          (per-user balances)
//!     ├── Arc<S: TransactionStore>       (transaction records)
//!     ├── Arc<dyn BrandDirectory>        (brand rules, read-only)
//!     ├── Arc<dyn UserDirectory>         (user status, read-only)
//!     ├── Arc<dyn NotificationSink>      (status change events)
//!     └── PendingStaging                 (pre-authentication uploads)
//! ```
//!
//! # Atomicity
//!
//! A status write and its ledger delta happen inside one call to
//! [`TransactionStore::update`]. The delta is the last fallible step of the
//! closure, so either both are committed or neither is.
//!
//! # Lock order
//!
//! staging → welcome bonus registry → transaction → ledger. Every operation
//! acquires locks in this order, which rules out deadlocks between them.

use std::sync::Arc;

use chrono::{Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, field, info};

use crate::core::directory::{InMemoryBrandDirectory, InMemoryUserDirectory};
use crate::core::ledger::InMemoryLedger;
use crate::core::notify::TracingNotifier;
use crate::core::review::AdminReview;
use crate::core::rules;
use crate::core::staging::PendingStaging;
use crate::core::traits::{
    BalanceLedger, BrandDirectory, NotificationSink, TransactionStore, UserDirectory,
};
use crate::core::transaction_store::InMemoryTransactionStore;
use crate::types::{
    AdminId, BrandId, CoinBalance, CoinTransaction, Coins, LoyaltyError, Operation,
    PaymentDetails, PaymentRecord, PendingTransaction, RedemptionLimit, StatusChange,
    SubmitRewardRequest, TransactionId, TransactionStatus, TransactionType, User, UserId,
};

/// Tunables for the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// How long a pre-authentication upload may wait to be claimed
    pub pending_ttl: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            pending_ttl: Duration::hours(24),
        }
    }
}

/// Coin transaction state machine
///
/// The processor can be wrapped in an `Arc` and shared across threads or
/// async tasks. Transactions for the same user are serialized by the
/// ledger; transactions for different users proceed concurrently.
pub struct TransactionProcessor<L = InMemoryLedger, S = InMemoryTransactionStore> {
    ledger: Arc<L>,
    store: Arc<S>,
    brands: Arc<dyn BrandDirectory>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn NotificationSink>,
    staging: PendingStaging,

    /// Welcome bonus transaction granted to each user
    welcomed: DashMap<UserId, TransactionId>,
}

impl TransactionProcessor {
    /// Create a processor backed by in-memory storage
    ///
    /// Status changes are reported to the log until another sink is set with
    /// [`with_notifier`](Self::with_notifier).
    pub fn new(brands: Arc<dyn BrandDirectory>, users: Arc<dyn UserDirectory>) -> Self {
        Self::from_parts(
            Arc::new(InMemoryLedger::new()),
            Arc::new(InMemoryTransactionStore::new()),
            brands,
            users,
        )
    }

    /// Create an in-memory processor over the given directories
    pub fn in_memory(brands: InMemoryBrandDirectory, users: InMemoryUserDirectory) -> Self {
        Self::new(Arc::new(brands), Arc::new(users))
    }
}

impl<L: BalanceLedger, S: TransactionStore> TransactionProcessor<L, S> {
    /// Create a processor over existing storage
    ///
    /// # Arguments
    ///
    /// * `ledger` - Per-user balances
    /// * `store` - Transaction records
    /// * `brands` - Brand rules lookup
    /// * `users` - User status lookup
    pub fn from_parts(
        ledger: Arc<L>,
        store: Arc<S>,
        brands: Arc<dyn BrandDirectory>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            ledger,
            store,
            brands,
            users,
            notifier: Arc::new(TracingNotifier),
            staging: PendingStaging::new(ProcessorConfig::default().pending_ttl),
            welcomed: DashMap::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_config(mut self, config: ProcessorConfig) -> Self {
        self.staging = PendingStaging::new(config.pending_ttl);
        self
    }

    /// Create a PENDING reward request
    ///
    /// Checks, in order: request fields, bill amount, user status, brand
    /// availability, then the redemption limits. Coins earned and the net
    /// amount are computed from the brand rules. The ledger is not touched.
    ///
    /// # Errors
    ///
    /// * `InvalidAmount` - Bill amount is zero or negative
    /// * `UserNotFound` / `UserInactive` - The user may not transact
    /// * `BrandUnavailable` - Brand is missing or deactivated
    /// * `RedemptionLimitExceeded` - Above the brand cap, the bill share or the balance
    /// * `RedemptionBelowMinimum` - Below the brand minimum
    /// * `DuplicateTransaction` - The transaction ID is already taken
    pub fn submit_reward_request(
        &self,
        request: SubmitRewardRequest,
    ) -> Result<CoinTransaction, LoyaltyError> {
        request.validate()?;
        self.active_user(request.user)?;
        let brand = self
            .brands
            .get_active_brand(request.brand)
            .ok_or_else(|| LoyaltyError::brand_unavailable(request.brand))?;

        let record = self.store.insert_with(request.tx, || {
            let balance = self.ledger.get(request.user).map_or(0, |row| row.balance);
            rules::check_redemption(
                &brand.rules,
                request.bill_amount,
                request.coins_to_redeem,
                balance,
            )?;

            let coins_earned =
                rules::coins_earned(request.bill_amount, brand.rules.earning_percentage)
                    .ok_or_else(|| LoyaltyError::arithmetic_overflow("earn", request.user))?;
            let amount = coins_earned
                .checked_sub(request.coins_to_redeem)
                .ok_or_else(|| LoyaltyError::arithmetic_overflow("net amount", request.user))?;

            let now = Utc::now();
            Ok(CoinTransaction {
                id: request.tx,
                user_id: request.user,
                brand_id: Some(brand.id),
                tx_type: rules::transaction_type(coins_earned, request.coins_to_redeem),
                bill_amount: request.bill_amount,
                bill_date: request.bill_date,
                coins_earned,
                coins_redeemed: request.coins_to_redeem,
                amount,
                status: TransactionStatus::Pending,
                receipt_url: request.receipt_url.clone(),
                admin_notes: None,
                reviewed_by: None,
                payment: None,
                created_at: now,
                status_updated_at: now,
                processed_at: None,
                payment_processed_at: None,
            })
        })?;

        info!(
            tx = record.id,
            user = record.user_id,
            brand = request.brand,
            tx_type = %record.tx_type,
            coins_earned = record.coins_earned,
            coins_redeemed = record.coins_redeemed,
            "reward request submitted"
        );
        Ok(record)
    }

    /// Approve a PENDING transaction and apply it to the ledger
    ///
    /// Redemptions move to APPROVED and wait for a payout; everything else
    /// moves straight to PAID. Approving a transaction that is already
    /// APPROVED, REJECTED or PAID returns it unchanged.
    pub fn approve(
        &self,
        tx: TransactionId,
        admin: AdminId,
        notes: Option<String>,
    ) -> Result<CoinTransaction, LoyaltyError> {
        self.approve_for(tx, None, admin, notes)
    }

    /// Reject a PENDING transaction
    ///
    /// The reason is stored in the admin notes and must not be blank.
    /// Rejecting a REJECTED or PAID transaction returns it unchanged, with or
    /// without a reason; an APPROVED one has already touched the ledger and
    /// cannot be rejected.
    pub fn reject(
        &self,
        tx: TransactionId,
        admin: AdminId,
        reason: &str,
    ) -> Result<CoinTransaction, LoyaltyError> {
        self.reject_for(tx, None, admin, reason)
    }

    /// Record the payout of an APPROVED redemption, moving it to PAID
    ///
    /// Paying a REJECTED or PAID transaction returns it unchanged; a PENDING
    /// one must be approved first.
    pub fn process_payment(
        &self,
        tx: TransactionId,
        admin: AdminId,
        payment: PaymentDetails,
    ) -> Result<CoinTransaction, LoyaltyError> {
        self.pay_for(tx, None, admin, payment)
    }

    /// Credit the one-off welcome bonus
    ///
    /// The bonus is created PAID and credited immediately. A user receives
    /// at most one, whatever transaction ID the caller supplies.
    pub fn grant_welcome_bonus(
        &self,
        tx: TransactionId,
        user: UserId,
        coins: Coins,
    ) -> Result<CoinTransaction, LoyaltyError> {
        if coins <= 0 {
            return Err(LoyaltyError::invalid_request("coins", "must be positive"));
        }
        self.active_user(user)?;

        let record = match self.welcomed.entry(user) {
            Entry::Occupied(_) => return Err(LoyaltyError::WelcomeBonusAlreadyGranted { user }),
            Entry::Vacant(slot) => {
                let record = self.store.insert_with(tx, || {
                    let record = settled(tx, user, TransactionType::WelcomeBonus, coins, 0, None);
                    self.ledger.apply_delta(user, coins, 0)?;
                    Ok(record)
                })?;
                slot.insert(tx);
                record
            }
        };

        info!(tx, user, coins, "welcome bonus granted");
        self.emit(Some(status_change(&record, None)));
        Ok(record)
    }

    /// Post a manual credit (positive delta) or debit (negative delta)
    ///
    /// Adjustments are settled immediately. A debit larger than the current
    /// balance is refused before the ledger is written.
    pub fn adjust(
        &self,
        tx: TransactionId,
        user: UserId,
        admin: AdminId,
        delta: Coins,
        notes: Option<String>,
    ) -> Result<CoinTransaction, LoyaltyError> {
        if delta == 0 {
            return Err(LoyaltyError::invalid_request("delta", "must not be zero"));
        }
        self.known_user(user)?;

        let (earned, redeemed) = if delta > 0 {
            (delta, 0)
        } else {
            let debit = delta
                .checked_neg()
                .ok_or_else(|| LoyaltyError::arithmetic_overflow("adjust", user))?;
            (0, debit)
        };

        let record = self.store.insert_with(tx, || {
            if redeemed > 0 {
                let balance = self.ledger.get(user).map_or(0, |row| row.balance);
                if redeemed > balance {
                    return Err(LoyaltyError::redemption_limit_exceeded(
                        redeemed,
                        balance,
                        RedemptionLimit::Balance,
                    ));
                }
            }
            let mut record = settled(tx, user, TransactionType::Adjustment, earned, redeemed, notes);
            record.reviewed_by = Some(admin);
            self.ledger.apply_delta(user, earned, redeemed)?;
            Ok(record)
        })?;

        info!(tx, user, admin, delta, "balance adjusted");
        self.emit(Some(status_change(&record, None)));
        Ok(record)
    }

    /// Park an upload made before the session has authenticated
    pub fn stage_upload(
        &self,
        session: &str,
        brand: BrandId,
        bill_amount: Decimal,
        receipt_url: Option<String>,
    ) -> Result<PendingTransaction, LoyaltyError> {
        if self.brands.get_active_brand(brand).is_none() {
            return Err(LoyaltyError::brand_unavailable(brand));
        }
        let pending = self
            .staging
            .stage(session, brand, bill_amount, receipt_url, Utc::now())?;
        debug!(session, brand, "upload staged");
        Ok(pending)
    }

    /// Turn the upload staged under `session` into a PENDING earn request
    ///
    /// The upload is consumed only if the request is created.
    pub fn claim_pending(
        &self,
        session: &str,
        user: UserId,
        tx: TransactionId,
    ) -> Result<CoinTransaction, LoyaltyError> {
        self.staging.claim(session, Utc::now(), |pending| {
            let mut request =
                SubmitRewardRequest::new(tx, user, pending.brand_id, pending.bill_amount);
            request.receipt_url = pending.receipt_url.clone();
            self.submit_reward_request(request)
        })
    }

    /// Drop staged uploads whose TTL has passed
    pub fn purge_expired_uploads(&self) -> usize {
        self.staging.purge_expired(Utc::now())
    }

    /// Execute one operation from the batch driver
    ///
    /// Review operations name the user they act for; a mismatch with the
    /// transaction's owner is refused.
    pub fn execute(&self, operation: Operation) -> Result<CoinTransaction, LoyaltyError> {
        match operation {
            Operation::Submit(request) => self.submit_reward_request(request),
            Operation::Approve {
                tx,
                user,
                admin,
                notes,
            } => self.approve_for(tx, Some(user), admin, notes),
            Operation::Reject {
                tx,
                user,
                admin,
                reason,
            } => self.reject_for(tx, Some(user), admin, &reason),
            Operation::Pay {
                tx,
                user,
                admin,
                payment,
            } => self.pay_for(tx, Some(user), admin, payment),
            Operation::WelcomeBonus { tx, user, coins } => self.grant_welcome_bonus(tx, user, coins),
            Operation::Adjust {
                tx,
                user,
                admin,
                delta,
                notes,
            } => self.adjust(tx, user, admin, delta, notes),
        }
    }

    pub fn transaction(&self, tx: TransactionId) -> Option<CoinTransaction> {
        self.store.get(tx)
    }

    /// All transactions, ordered by ID
    pub fn transactions(&self) -> Vec<CoinTransaction> {
        self.store.find(|_| true)
    }

    /// Transactions matching `predicate`, ordered by ID
    pub fn transactions_where<P>(&self, predicate: P) -> Vec<CoinTransaction>
    where
        P: Fn(&CoinTransaction) -> bool,
    {
        self.store.find(predicate)
    }

    pub fn balance(&self, user: UserId) -> Result<CoinBalance, LoyaltyError> {
        self.ledger.get(user)
    }

    /// Every ledger row, ordered by user
    pub fn balances(&self) -> Vec<CoinBalance> {
        self.ledger.all()
    }

    /// Review surface acting as `admin`
    pub fn review(&self, admin: AdminId) -> AdminReview<'_, L, S> {
        AdminReview::new(self, admin)
    }

    fn approve_for(
        &self,
        tx: TransactionId,
        owner: Option<UserId>,
        admin: AdminId,
        notes: Option<String>,
    ) -> Result<CoinTransaction, LoyaltyError> {
        let current = self.owned(tx, owner, "approve")?;
        if current.status == TransactionStatus::Pending {
            self.active_user(current.user_id)?;
        }

        let now = Utc::now();
        let (record, change) = self.store.update(tx, |record| {
            if record.status != TransactionStatus::Pending {
                return Ok((record.clone(), None));
            }

            let before = record.clone();
            record.transition(TransactionStatus::on_approval(record.coins_redeemed), now);
            record.processed_at = Some(now);
            record.reviewed_by = Some(admin);
            if notes.is_some() {
                record.admin_notes = notes;
            }
            before.check_change(record)?;

            self.ledger
                .apply_delta(record.user_id, record.coins_earned, record.coins_redeemed)?;
            Ok((record.clone(), Some(status_change(record, Some(before.status)))))
        })?;

        self.log_outcome(&record, change.as_ref(), "approve");
        self.emit(change);
        Ok(record)
    }

    fn reject_for(
        &self,
        tx: TransactionId,
        owner: Option<UserId>,
        admin: AdminId,
        reason: &str,
    ) -> Result<CoinTransaction, LoyaltyError> {
        self.owned(tx, owner, "reject")?;

        let now = Utc::now();
        let (record, change) = self.store.update(tx, |record| {
            match record.status {
                TransactionStatus::Pending => {}
                TransactionStatus::Rejected | TransactionStatus::Paid => {
                    return Ok((record.clone(), None))
                }
                TransactionStatus::Approved => {
                    return Err(LoyaltyError::invalid_state_transition(
                        tx,
                        record.status,
                        "reject",
                    ))
                }
            }
            // Only a decision that actually rejects needs a reason
            if reason.trim().is_empty() {
                return Err(LoyaltyError::MissingReason { tx });
            }

            let before = record.status;
            record.transition(TransactionStatus::Rejected, now);
            record.processed_at = Some(now);
            record.reviewed_by = Some(admin);
            record.admin_notes = Some(reason.trim().to_string());
            Ok((record.clone(), Some(status_change(record, Some(before)))))
        })?;

        self.log_outcome(&record, change.as_ref(), "reject");
        self.emit(change);
        Ok(record)
    }

    fn pay_for(
        &self,
        tx: TransactionId,
        owner: Option<UserId>,
        admin: AdminId,
        payment: PaymentDetails,
    ) -> Result<CoinTransaction, LoyaltyError> {
        payment.validate()?;
        self.owned(tx, owner, "pay")?;

        let now = Utc::now();
        let (record, change) = self.store.update(tx, |record| {
            match record.status {
                TransactionStatus::Approved => {}
                TransactionStatus::Rejected | TransactionStatus::Paid => {
                    return Ok((record.clone(), None))
                }
                TransactionStatus::Pending => {
                    return Err(LoyaltyError::invalid_state_transition(
                        tx,
                        record.status,
                        "pay",
                    ))
                }
            }

            let before = record.status;
            record.transition(TransactionStatus::Paid, now);
            record.payment_processed_at = Some(now);
            record.payment = Some(PaymentRecord {
                reference: payment.reference.trim().to_string(),
                method: payment.method,
                amount: payment.amount,
            });
            if payment.notes.is_some() {
                record.admin_notes = payment.notes;
            }
            debug!(tx, admin, "payout recorded");
            Ok((record.clone(), Some(status_change(record, Some(before)))))
        })?;

        self.log_outcome(&record, change.as_ref(), "pay");
        self.emit(change);
        Ok(record)
    }

    /// Current record of `tx`, checking it belongs to `owner` when given
    fn owned(
        &self,
        tx: TransactionId,
        owner: Option<UserId>,
        operation: &str,
    ) -> Result<CoinTransaction, LoyaltyError> {
        let record = self
            .store
            .get(tx)
            .ok_or_else(|| LoyaltyError::transaction_not_found(tx, operation))?;
        match owner {
            Some(user) if user != record.user_id => Err(LoyaltyError::user_mismatch(
                tx,
                record.user_id,
                user,
                operation,
            )),
            _ => Ok(record),
        }
    }

    fn known_user(&self, user: UserId) -> Result<User, LoyaltyError> {
        self.users
            .get_user(user)
            .ok_or(LoyaltyError::UserNotFound { user })
    }

    fn active_user(&self, user: UserId) -> Result<User, LoyaltyError> {
        let found = self.known_user(user)?;
        if !found.is_active() {
            return Err(LoyaltyError::UserInactive {
                user,
                status: found.status,
            });
        }
        Ok(found)
    }

    fn log_outcome(&self, record: &CoinTransaction, change: Option<&StatusChange>, operation: &str) {
        match change {
            Some(change) => info!(
                tx = record.id,
                user = record.user_id,
                from = change.from.map(field::display),
                to = %change.to,
                operation,
                "transaction finalized"
            ),
            None => debug!(
                tx = record.id,
                status = %record.status,
                operation,
                "transaction already finalized, nothing to do"
            ),
        }
    }

    fn emit(&self, change: Option<StatusChange>) {
        if let Some(change) = change {
            self.notifier.notify(change);
        }
    }
}

/// A transaction created already settled
fn settled(
    tx: TransactionId,
    user: UserId,
    tx_type: TransactionType,
    coins_earned: Coins,
    coins_redeemed: Coins,
    notes: Option<String>,
) -> CoinTransaction {
    let now = Utc::now();
    CoinTransaction {
        id: tx,
        user_id: user,
        brand_id: None,
        tx_type,
        bill_amount: Decimal::ZERO,
        bill_date: None,
        coins_earned,
        coins_redeemed,
        amount: coins_earned - coins_redeemed,
        status: TransactionStatus::Paid,
        receipt_url: None,
        admin_notes: notes,
        reviewed_by: None,
        payment: None,
        created_at: now,
        status_updated_at: now,
        processed_at: Some(now),
        payment_processed_at: None,
    }
}

fn status_change(record: &CoinTransaction, from: Option<TransactionStatus>) -> StatusChange {
    StatusChange {
        tx: record.id,
        user: record.user_id,
        from,
        to: record.status,
        at: record.status_updated_at,
    }
}
