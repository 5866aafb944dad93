//! Brand-related types
//!
//! A brand is a partner merchant. Its rule set decides how many coins a bill
//! earns and how many coins may be redeemed against it.

use super::error::LoyaltyError;
use super::transaction::Coins;
use rust_decimal::Decimal;

/// Brand identifier
pub type BrandId = u64;

/// Earning and redemption rules of a brand
///
/// The admin form historically kept `maxRedemptionAmount` and
/// `brandwiseMaxCap` as two always-equal fields; here they are one field,
/// `brandwise_max_cap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandRules {
    /// Share of the bill credited as coins, 0-100
    pub earning_percentage: Decimal,

    /// Share of the bill that may be paid with coins, 0-100
    pub redemption_percentage: Decimal,

    /// Smallest non-zero redemption accepted
    pub min_redemption_amount: Coins,

    /// Per-transaction absolute ceiling on redeemed coins
    pub brandwise_max_cap: Coins,
}

impl BrandRules {
    /// Build a rule set, rejecting out-of-range values
    pub fn new(
        brand: BrandId,
        earning_percentage: Decimal,
        redemption_percentage: Decimal,
        min_redemption_amount: Coins,
        brandwise_max_cap: Coins,
    ) -> Result<Self, LoyaltyError> {
        let invalid = |message: String| LoyaltyError::InvalidBrandRules { brand, message };
        let hundred = Decimal::ONE_HUNDRED;

        if earning_percentage < Decimal::ZERO || earning_percentage > hundred {
            return Err(invalid(format!(
                "earning percentage {} is outside 0-100",
                earning_percentage
            )));
        }
        if redemption_percentage < Decimal::ZERO || redemption_percentage > hundred {
            return Err(invalid(format!(
                "redemption percentage {} is outside 0-100",
                redemption_percentage
            )));
        }
        if min_redemption_amount < 0 {
            return Err(invalid(format!(
                "minimum redemption {} is negative",
                min_redemption_amount
            )));
        }
        if brandwise_max_cap < min_redemption_amount {
            return Err(invalid(format!(
                "max cap {} is below minimum redemption {}",
                brandwise_max_cap, min_redemption_amount
            )));
        }

        Ok(BrandRules {
            earning_percentage,
            redemption_percentage,
            min_redemption_amount,
            brandwise_max_cap,
        })
    }
}

/// A partner merchant
///
/// Brands are soft-deactivated through `is_active` and never removed while
/// transactions reference them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub is_active: bool,
    pub rules: BrandRules,
}
