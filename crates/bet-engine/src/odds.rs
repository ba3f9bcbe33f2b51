use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fallback odds used when a bet carries no locked-in odds. Versioned so a
/// settlement log can record exactly which table priced a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OddsTable {
    version: u32,
}

pub const ODDS_TABLE_V1: OddsTable = OddsTable { version: 1 };

impl OddsTable {
    #[must_use]
    pub fn version(self) -> u32 {
        self.version
    }

    /// Exact number at a position.
    #[must_use]
    pub fn number(self) -> Decimal {
        dec!(9.89)
    }

    /// Big/small/odd/even on a position or on the top-two sum.
    #[must_use]
    pub fn two_sides(self) -> Decimal {
        dec!(1.98)
    }

    #[must_use]
    pub fn dragon_tiger(self) -> Decimal {
        dec!(1.98)
    }

    /// Exact champion + runner-up sum. Sums outside 3..=19 are not
    /// representable by any draw and have no price.
    #[must_use]
    pub fn sum(self, sum: u8) -> Option<Decimal> {
        let odds = match sum {
            3 | 18 => dec!(44.51),
            4 | 17 => dec!(22.75),
            5 | 16 => dec!(14.84),
            6 | 15 => dec!(11.37),
            7 | 14 => dec!(8.90),
            8 | 13 => dec!(7.42),
            9 | 12 => dec!(6.43),
            10 | 11 => dec!(5.64),
            19 => dec!(89.02),
            _ => return None,
        };
        Some(odds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_odds_are_symmetric_around_the_midpoint_except_nineteen() {
        for low in 3..=10_u8 {
            let high = 21 - low;
            assert_eq!(ODDS_TABLE_V1.sum(low), ODDS_TABLE_V1.sum(high));
        }
        assert_eq!(ODDS_TABLE_V1.sum(19), Some(dec!(89.02)));
    }

    #[test]
    fn unreachable_sums_have_no_price() {
        assert_eq!(ODDS_TABLE_V1.sum(2), None);
        assert_eq!(ODDS_TABLE_V1.sum(20), None);
    }
}
