use rust_decimal::Decimal;

use crate::config::PolicyConfig;
use crate::decimal::{round_half_up, Money, Rate};

/// fixed monthly installment for an amortizing loan, rounded to currency
/// precision half-up
///
/// A non-positive term yields zero. A zero rate spreads the principal evenly.
/// Otherwise `EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)` with `r` the
/// monthly rate.
pub fn monthly_payment(principal: Money, annual_rate: Rate, months: i64) -> Money {
    if months <= 0 {
        return Money::ZERO;
    }

    let r = annual_rate.monthly_rate().as_decimal();
    if r.is_zero() {
        return (principal / Decimal::from(months)).round_currency();
    }

    // once (1 + r)^n overflows, r * c / (c - 1) has converged to r
    let factor = match checked_pow(Decimal::ONE + r, months.unsigned_abs()) {
        Some(c) if c == Decimal::ONE => {
            return (principal / Decimal::from(months)).round_currency();
        }
        Some(c) => r
            .checked_mul(c)
            .and_then(|rc| rc.checked_div(c - Decimal::ONE))
            .unwrap_or(r),
        None => r,
    };

    // saturates instead of overflowing for principals far outside currency range
    let payment = principal
        .as_decimal()
        .checked_mul(factor)
        .unwrap_or(Decimal::MAX);
    Money::from_decimal(payment).round_currency()
}

/// `base^exp` by repeated squaring; `None` on overflow
fn checked_pow(base: Decimal, mut exp: u64) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut square = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(square)?;
        }
        exp >>= 1;
        if exp > 0 {
            square = square.checked_mul(square)?;
        }
    }
    Some(result)
}

/// approved credit ceiling for a monthly income: income times the policy
/// multiplier, rounded half-up to the nearest rounding unit
pub fn approved_limit(monthly_income: Money, policy: &PolicyConfig) -> Money {
    let unit = policy.limit_rounding_unit.as_decimal();
    let units = monthly_income.as_decimal() * policy.limit_income_multiplier / unit;
    Money::from_decimal(round_half_up(units, 0) * unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_emi() {
        let emi = monthly_payment(Money::from_major(100_000), Rate::from_percentage(12), 12);
        assert_eq!(emi, Money::from_decimal(dec!(8884.88)));

        let emi = monthly_payment(Money::from_major(1_000_000), Rate::from_percentage(10), 24);
        assert_eq!(emi, Money::from_decimal(dec!(46144.93)));
    }

    #[test]
    fn test_zero_rate_spreads_principal() {
        let emi = monthly_payment(Money::from_major(1_000), Rate::ZERO, 3);
        assert_eq!(emi, Money::from_decimal(dec!(333.33)));

        let emi = monthly_payment(Money::from_major(48_000), Rate::ZERO, 12);
        assert_eq!(emi, Money::from_major(4_000));
    }

    #[test]
    fn test_zero_rate_rounds_half_up() {
        let emi = monthly_payment(Money::from_decimal(dec!(0.25)), Rate::ZERO, 2);
        assert_eq!(emi, Money::from_decimal(dec!(0.13)));
    }

    #[test]
    fn test_non_positive_term_is_zero() {
        let principal = Money::from_major(50_000);
        assert_eq!(monthly_payment(principal, Rate::from_percentage(9), 0), Money::ZERO);
        assert_eq!(monthly_payment(principal, Rate::from_percentage(9), -6), Money::ZERO);
        assert_eq!(monthly_payment(principal, Rate::ZERO, -1), Money::ZERO);
    }

    #[test]
    fn test_single_month_repays_principal_plus_interest() {
        let emi = monthly_payment(Money::from_major(1_200), Rate::from_percentage(12), 1);
        assert_eq!(emi, Money::from_major(1_212));
    }

    #[test]
    fn test_extreme_compounding_does_not_panic() {
        let emi = monthly_payment(Money::from_major(1_000), Rate::from_percentage(999), 6000);
        // converges to interest-only: 1000 * 9.99 / 12
        assert_eq!(emi, Money::from_decimal(dec!(832.50)));
    }

    #[test]
    fn test_rate_above_twelve_hundred_percent_near_overflow() {
        // r = 9 per month, (1 + r)^28 = 1e28 sits just under the decimal ceiling
        let emi = monthly_payment(Money::from_major(1_000), Rate::from_percentage(10_800), 28);
        assert_eq!(emi, Money::from_major(9_000));

        let emi = monthly_payment(Money::from_major(1_000), Rate::from_percentage(10_800), 29);
        assert_eq!(emi, Money::from_major(9_000));
    }

    #[test]
    fn test_long_tenure_with_tiny_rate_is_fast() {
        let emi = monthly_payment(
            Money::from_major(1_000),
            Rate::from_percent(dec!(0.0000001)),
            i64::from(u32::MAX),
        );
        assert!(!emi.is_negative());
        assert!(emi < Money::from_major(1));
    }

    #[test]
    fn test_checked_pow() {
        assert_eq!(checked_pow(dec!(1.01), 0), Some(Decimal::ONE));
        assert_eq!(checked_pow(dec!(2), 10), Some(dec!(1024)));
        assert_eq!(checked_pow(dec!(1.1), 3), Some(dec!(1.331)));
        assert_eq!(checked_pow(dec!(10), 29), None);
    }

    #[test]
    fn test_stored_repayment_is_reproducible() {
        let principal = Money::from_decimal(dec!(254_300.75));
        let rate = Rate::from_percent(dec!(13.45));
        let stored = monthly_payment(principal, rate, 57);
        assert_eq!(monthly_payment(principal, rate, 57), stored);
        assert_eq!(stored, stored.round_currency());
    }

    #[test]
    fn test_approved_limit_rounds_to_nearest_unit() {
        let policy = PolicyConfig::standard();

        assert_eq!(approved_limit(Money::from_major(100_000), &policy), Money::from_major(3_600_000));
        // 36 * 25_000 = 900_000
        assert_eq!(approved_limit(Money::from_major(25_000), &policy), Money::from_major(900_000));
        // 36 * 51_000 = 1_836_000 -> 1_800_000
        assert_eq!(approved_limit(Money::from_major(51_000), &policy), Money::from_major(1_800_000));
        // 36 * 4_250 = 153_000 -> 200_000 (half rounds up)
        assert_eq!(approved_limit(Money::from_major(4_250), &policy), Money::from_major(200_000));
        // 36 * 1_000 = 36_000 -> 0
        assert_eq!(approved_limit(Money::from_major(1_000), &policy), Money::ZERO);
    }

    proptest! {
        #[test]
        fn prop_zero_rate_is_even_split(cents in 0i64..10_000_000_000, months in 1i64..480) {
            let principal = Money::from_minor(cents);
            let expected = (principal / Decimal::from(months)).round_currency();
            prop_assert_eq!(monthly_payment(principal, Rate::ZERO, months), expected);
        }

        #[test]
        fn prop_non_positive_term_is_zero(cents in 0i64..10_000_000_000, bps in 0u32..5_000, months in -480i64..=0) {
            prop_assert_eq!(
                monthly_payment(Money::from_minor(cents), Rate::from_bps(bps), months),
                Money::ZERO
            );
        }

        #[test]
        fn prop_monotonic_in_principal(cents in 1i64..1_000_000_000, extra in 1i64..100_000_000, bps in 1u32..5_000, months in 1i64..360) {
            let rate = Rate::from_bps(bps);
            let lower = monthly_payment(Money::from_minor(cents), rate, months);
            let higher = monthly_payment(Money::from_minor(cents + extra), rate, months);
            prop_assert!(higher >= lower);
        }

        #[test]
        fn prop_monotonic_in_rate(cents in 1i64..1_000_000_000, bps in 1u32..5_000, step in 1u32..500, months in 1i64..360) {
            let principal = Money::from_minor(cents);
            let lower = monthly_payment(principal, Rate::from_bps(bps), months);
            let higher = monthly_payment(principal, Rate::from_bps(bps + step), months);
            prop_assert!(higher >= lower);
        }

        #[test]
        fn prop_payment_is_never_negative(cents in 0i64..10_000_000_000, bps in 0u32..99_999, months in -12i64..600) {
            prop_assert!(!monthly_payment(Money::from_minor(cents), Rate::from_bps(bps), months).is_negative());
        }

        #[test]
        fn prop_approved_limit_is_unit_multiple(cents in 0i64..100_000_000_000) {
            let policy = PolicyConfig::standard();
            let limit = approved_limit(Money::from_minor(cents), &policy);
            let units = limit.as_decimal() / policy.limit_rounding_unit.as_decimal();
            prop_assert_eq!(units, units.trunc());
        }
    }
}
