//! Pre-authentication upload staging
//!
//! An upload made before the user has verified their phone is parked under
//! the browser session until it is claimed or expires.

use super::brand::BrandId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Upload waiting for its session to authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTransaction {
    pub session_id: String,
    pub brand_id: BrandId,
    pub bill_amount: Decimal,
    pub receipt_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PendingTransaction {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
