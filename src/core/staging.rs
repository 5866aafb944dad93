//! Staging area for uploads made before authentication
//!
//! A receipt uploaded before the user has verified their phone is parked
//! here under the browser session. After login the session is claimed
//! exactly once and turned into a regular reward request; unclaimed uploads
//! expire after the configured TTL.

use crate::types::{BrandId, LoyaltyError, PendingTransaction};
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::debug;

/// Pending uploads keyed by session ID
#[derive(Debug)]
pub struct PendingStaging {
    uploads: DashMap<String, PendingTransaction>,
    ttl: Duration,
}

impl PendingStaging {
    pub fn new(ttl: Duration) -> Self {
        Self {
            uploads: DashMap::new(),
            ttl,
        }
    }

    /// Park an upload under `session`
    ///
    /// A later upload in the same session replaces the earlier one.
    pub fn stage(
        &self,
        session: &str,
        brand: BrandId,
        bill_amount: Decimal,
        receipt_url: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PendingTransaction, LoyaltyError> {
        if session.trim().is_empty() {
            return Err(LoyaltyError::invalid_request("session_id", "must not be blank"));
        }
        if bill_amount <= Decimal::ZERO {
            return Err(LoyaltyError::invalid_amount(bill_amount));
        }

        let pending = PendingTransaction {
            session_id: session.to_string(),
            brand_id: brand,
            bill_amount,
            receipt_url,
            created_at: now,
            expires_at: now + self.ttl,
        };
        if self
            .uploads
            .insert(session.to_string(), pending.clone())
            .is_some()
        {
            debug!(session, "replaced earlier staged upload");
        }

        Ok(pending)
    }

    /// Consume the upload staged under `session`
    ///
    /// `f` runs while the session is locked, and the upload is removed only
    /// if `f` succeeds, so a claim either fully happens or can be retried.
    /// An expired upload is removed and reported as `PendingExpired`.
    pub fn claim<F, R>(&self, session: &str, now: DateTime<Utc>, f: F) -> Result<R, LoyaltyError>
    where
        F: FnOnce(&PendingTransaction) -> Result<R, LoyaltyError>,
    {
        match self.uploads.entry(session.to_string()) {
            Entry::Vacant(_) => Err(LoyaltyError::PendingNotFound {
                session: session.to_string(),
            }),
            Entry::Occupied(entry) => {
                if entry.get().is_expired(now) {
                    entry.remove();
                    return Err(LoyaltyError::PendingExpired {
                        session: session.to_string(),
                    });
                }
                let result = f(entry.get())?;
                entry.remove();
                Ok(result)
            }
        }
    }

    /// Drop every expired upload, returning how many were removed
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.uploads.len();
        self.uploads.retain(|_, pending| !pending.is_expired(now));
        before.saturating_sub(self.uploads.len())
    }

    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn staging() -> PendingStaging {
        PendingStaging::new(Duration::hours(2))
    }

    #[test]
    fn test_stage_sets_expiry_from_ttl() {
        let staging = staging();

        let pending = staging
            .stage("sess-1", 3, Decimal::new(500, 0), None, at(10))
            .unwrap();

        assert_eq!(pending.expires_at, at(12));
        assert_eq!(staging.len(), 1);
    }

    #[test]
    fn test_stage_rejects_blank_session_and_bad_amount() {
        let staging = staging();

        assert!(matches!(
            staging.stage(" ", 3, Decimal::TEN, None, at(10)),
            Err(LoyaltyError::InvalidRequest { .. })
        ));
        assert!(matches!(
            staging.stage("sess-1", 3, Decimal::ZERO, None, at(10)),
            Err(LoyaltyError::InvalidAmount { .. })
        ));
        assert!(staging.is_empty());
    }

    #[test]
    fn test_latest_upload_wins() {
        let staging = staging();
        staging.stage("sess-1", 3, Decimal::TEN, None, at(10)).unwrap();
        staging
            .stage("sess-1", 4, Decimal::ONE_HUNDRED, None, at(10))
            .unwrap();

        let brand = staging.claim("sess-1", at(11), |p| Ok(p.brand_id)).unwrap();

        assert_eq!(brand, 4);
    }

    #[test]
    fn test_claim_consumes_upload_once() {
        let staging = staging();
        staging.stage("sess-1", 3, Decimal::TEN, None, at(10)).unwrap();

        assert!(staging.claim("sess-1", at(11), |_| Ok(())).is_ok());
        assert_eq!(
            staging.claim("sess-1", at(11), |_| Ok(())),
            Err(LoyaltyError::PendingNotFound {
                session: "sess-1".to_string()
            })
        );
    }

    #[test]
    fn test_failed_claim_keeps_upload() {
        let staging = staging();
        staging.stage("sess-1", 3, Decimal::TEN, None, at(10)).unwrap();

        let result: Result<(), _> =
            staging.claim("sess-1", at(11), |p| Err(LoyaltyError::brand_unavailable(p.brand_id)));

        assert_eq!(result, Err(LoyaltyError::brand_unavailable(3)));
        assert_eq!(staging.len(), 1);
    }

    #[test]
    fn test_expired_claim_is_removed() {
        let staging = staging();
        staging.stage("sess-1", 3, Decimal::TEN, None, at(10)).unwrap();

        let result = staging.claim("sess-1", at(12), |_| Ok(()));

        assert_eq!(
            result,
            Err(LoyaltyError::PendingExpired {
                session: "sess-1".to_string()
            })
        );
        assert!(staging.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let staging = staging();
        staging.stage("old", 3, Decimal::TEN, None, at(8)).unwrap();
        staging.stage("new", 3, Decimal::TEN, None, at(10)).unwrap();

        assert_eq!(staging.purge_expired(at(11)), 1);
        assert_eq!(staging.len(), 1);
        assert!(staging.claim("new", at(11), |_| Ok(())).is_ok());
    }
}
