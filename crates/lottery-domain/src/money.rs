use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to two decimal places, half away from zero.
///
/// Every credited amount in the system passes through this before it is
/// persisted, so payout and rebate math stays stable across re-evaluation.
#[must_use]
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn leaves_two_dp_amounts_untouched() {
        assert_eq!(round2(dec!(989.00)), dec!(989.00));
    }
}
