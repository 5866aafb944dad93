//! Coin arithmetic and redemption checks
//!
//! Pure functions over a brand's rule set. The processor calls these while
//! building a new record; nothing here touches shared state.

use crate::types::{BrandRules, Coins, LoyaltyError, RedemptionLimit, TransactionType};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Coins credited for a bill
///
/// `bill × earning% / 100`, rounded half up, and never less than one coin
/// when the brand earns at all. Returns `None` if the result does not fit in
/// [`Coins`].
pub fn coins_earned(bill_amount: Decimal, earning_percentage: Decimal) -> Option<Coins> {
    if earning_percentage <= Decimal::ZERO || bill_amount <= Decimal::ZERO {
        return Some(0);
    }

    let coins = bill_amount
        .checked_mul(earning_percentage)?
        .checked_div(Decimal::ONE_HUNDRED)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()?;

    Some(coins.max(1))
}

/// Most coins the brand lets a bill of this size be paid with
///
/// `floor(bill × redemption% / 100)`, saturating at [`Coins::MAX`].
pub fn redeemable_share(bill_amount: Decimal, redemption_percentage: Decimal) -> Coins {
    if redemption_percentage <= Decimal::ZERO || bill_amount <= Decimal::ZERO {
        return 0;
    }

    bill_amount
        .checked_mul(redemption_percentage)
        .and_then(|product| product.checked_div(Decimal::ONE_HUNDRED))
        .map(|share| share.floor())
        .and_then(|share| share.to_i64())
        .unwrap_or(Coins::MAX)
}

/// Check a redemption request against the brand rules and the user's balance
///
/// The brand cap is checked first so an over-cap request is refused whatever
/// the balance. A zero request always passes.
pub fn check_redemption(
    rules: &BrandRules,
    bill_amount: Decimal,
    requested: Coins,
    balance: Coins,
) -> Result<(), LoyaltyError> {
    if requested <= 0 {
        return Ok(());
    }

    if requested > rules.brandwise_max_cap {
        return Err(LoyaltyError::redemption_limit_exceeded(
            requested,
            rules.brandwise_max_cap,
            RedemptionLimit::BrandCap,
        ));
    }

    if requested < rules.min_redemption_amount {
        return Err(LoyaltyError::RedemptionBelowMinimum {
            requested,
            minimum: rules.min_redemption_amount,
        });
    }

    let share = redeemable_share(bill_amount, rules.redemption_percentage);
    if requested > share {
        return Err(LoyaltyError::redemption_limit_exceeded(
            requested,
            share,
            RedemptionLimit::BillShare,
        ));
    }

    if requested > balance {
        return Err(LoyaltyError::redemption_limit_exceeded(
            requested,
            balance.max(0),
            RedemptionLimit::Balance,
        ));
    }

    Ok(())
}

/// Classify a bill by what it earns and redeems
pub fn transaction_type(coins_earned: Coins, coins_redeemed: Coins) -> TransactionType {
    match (coins_earned > 0, coins_redeemed > 0) {
        (true, true) => TransactionType::RewardRequest,
        (false, true) => TransactionType::Redeem,
        _ => TransactionType::Earn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn rules(redemption_pct: i64, min: Coins, cap: Coins) -> BrandRules {
        BrandRules::new(1, Decimal::TEN, Decimal::new(redemption_pct, 0), min, cap).unwrap()
    }

    #[rstest]
    #[case::ten_percent_of_1000(Decimal::new(1000, 0), Decimal::TEN, 100)]
    #[case::floor_to_one(Decimal::new(5, 0), Decimal::TEN, 1)]
    #[case::tiny_bill(Decimal::new(1, 2), Decimal::TEN, 1)]
    #[case::rounds_half_up(Decimal::new(1005, 0), Decimal::ONE, 10)]
    #[case::rounds_half_up_at_midpoint(Decimal::new(1050, 0), Decimal::ONE, 11)]
    #[case::rounds_down_below_midpoint(Decimal::new(1049, 0), Decimal::ONE, 10)]
    #[case::fractional_percentage(Decimal::new(200, 0), Decimal::new(25, 1), 5)]
    #[case::fractional_bill(Decimal::new(99999, 2), Decimal::TEN, 100)]
    #[case::zero_percent(Decimal::new(1000, 0), Decimal::ZERO, 0)]
    #[case::full_percent(Decimal::new(250, 0), Decimal::ONE_HUNDRED, 250)]
    fn test_coins_earned(
        #[case] bill: Decimal,
        #[case] percentage: Decimal,
        #[case] expected: Coins,
    ) {
        assert_eq!(coins_earned(bill, percentage), Some(expected));
    }

    #[test]
    fn test_coins_earned_overflow_is_none() {
        assert_eq!(coins_earned(Decimal::MAX, Decimal::ONE_HUNDRED), None);
    }

    #[rstest]
    #[case(Decimal::new(1000, 0), Decimal::new(50, 0), 500)]
    #[case(Decimal::new(999, 0), Decimal::new(50, 0), 499)]
    #[case(Decimal::new(1000, 0), Decimal::ZERO, 0)]
    fn test_redeemable_share(
        #[case] bill: Decimal,
        #[case] percentage: Decimal,
        #[case] expected: Coins,
    ) {
        assert_eq!(redeemable_share(bill, percentage), expected);
    }

    #[test]
    fn test_zero_redemption_always_passes() {
        assert!(check_redemption(&rules(0, 100, 100), Decimal::ONE, 0, 0).is_ok());
    }

    #[test]
    fn test_redemption_within_all_limits() {
        let result = check_redemption(&rules(50, 10, 2000), Decimal::new(1000, 0), 50, 200);
        assert!(result.is_ok());
    }

    #[test]
    fn test_cap_is_checked_regardless_of_balance() {
        let result = check_redemption(
            &rules(100, 0, 2000),
            Decimal::new(100_000, 0),
            2500,
            1_000_000,
        );

        assert_eq!(
            result,
            Err(LoyaltyError::redemption_limit_exceeded(
                2500,
                2000,
                RedemptionLimit::BrandCap
            ))
        );
    }

    #[rstest]
    #[case::below_minimum(5, 1000, 200, "below the brand minimum of 10")]
    #[case::above_bill_share(600, 1000, 2000, "redeemable share of bill of 500")]
    #[case::above_balance(300, 1000, 200, "available balance of 200")]
    fn test_redemption_limits(
        #[case] requested: Coins,
        #[case] bill: i64,
        #[case] balance: Coins,
        #[case] expected: &str,
    ) {
        let err = check_redemption(&rules(50, 10, 2000), Decimal::new(bill, 0), requested, balance)
            .unwrap_err();
        assert!(err.to_string().contains(expected), "got: {}", err);
    }

    #[rstest]
    #[case(100, 0, TransactionType::Earn)]
    #[case(0, 0, TransactionType::Earn)]
    #[case(0, 50, TransactionType::Redeem)]
    #[case(100, 50, TransactionType::RewardRequest)]
    fn test_transaction_type(
        #[case] earned: Coins,
        #[case] redeemed: Coins,
        #[case] expected: TransactionType,
    ) {
        assert_eq!(transaction_type(earned, redeemed), expected);
    }
}
