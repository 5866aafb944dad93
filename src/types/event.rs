//! Status change events emitted to the notification dispatcher

use super::transaction::{TransactionId, TransactionStatus};
use super::user::UserId;
use chrono::{DateTime, Utc};

/// A committed status transition of a coin transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub tx: TransactionId,
    pub user: UserId,
    /// Status before the change; `None` for records created already settled
    /// (welcome bonuses and adjustments)
    pub from: Option<TransactionStatus>,
    pub to: TransactionStatus,
    pub at: DateTime<Utc>,
}
