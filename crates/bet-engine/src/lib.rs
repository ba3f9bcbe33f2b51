pub mod engine;
pub mod odds;

pub use engine::{evaluate, payout, BetOutcome};
pub use odds::{OddsTable, ODDS_TABLE_V1};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lottery_domain::{BetSelection, DragonTigerSide, DrawResult, PeriodId, Position, TwoSides};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn pos(raw: u8) -> Position {
        Position::new(raw).expect("position")
    }

    fn draw(values: [u8; 10]) -> DrawResult {
        DrawResult::new(PeriodId::from("20250718493"), values, Utc::now()).expect("draw")
    }

    // Champion 7, runner-up 5, sum 12.
    fn reference_draw() -> DrawResult {
        draw([7, 5, 9, 1, 6, 2, 4, 10, 3, 8])
    }

    #[test]
    fn exact_number_wins_at_fallback_odds() {
        let outcome = evaluate(
            &BetSelection::NumberAtPosition {
                position: pos(1),
                number: 7,
            },
            None,
            &reference_draw(),
            ODDS_TABLE_V1,
        );
        assert!(outcome.won);
        assert_eq!(outcome.odds, dec!(9.89));
        assert_eq!(payout(dec!(100), outcome.odds), dec!(989.00));
    }

    #[test]
    fn locked_in_odds_beat_the_fallback_table() {
        let outcome = evaluate(
            &BetSelection::NumberAtPosition {
                position: pos(1),
                number: 7,
            },
            Some(dec!(9.50)),
            &reference_draw(),
            ODDS_TABLE_V1,
        );
        assert!(outcome.won);
        assert_eq!(outcome.odds, dec!(9.50));
    }

    #[test]
    fn position_two_sides_uses_big_at_six() {
        let draw = reference_draw();
        for (position, side, expect_win) in [
            (1, TwoSides::Big, true),
            (1, TwoSides::Odd, true),
            (2, TwoSides::Small, true),
            (2, TwoSides::Even, false),
            (8, TwoSides::Big, true),
            (4, TwoSides::Small, true),
        ] {
            let outcome = evaluate(
                &BetSelection::PositionTwoSides {
                    position: pos(position),
                    side,
                },
                None,
                &draw,
                ODDS_TABLE_V1,
            );
            assert_eq!(outcome.won, expect_win, "position {position} {side:?}");
            assert_eq!(outcome.odds, dec!(1.98));
        }
    }

    #[test]
    fn sum_twelve_is_big_and_even() {
        let draw = reference_draw();
        assert_eq!(draw.top_two_sum(), 12);

        let big = evaluate(
            &BetSelection::SumTwoSides {
                side: TwoSides::Big,
            },
            None,
            &draw,
            ODDS_TABLE_V1,
        );
        assert!(big.won);

        let odd = evaluate(
            &BetSelection::SumTwoSides {
                side: TwoSides::Odd,
            },
            None,
            &draw,
            ODDS_TABLE_V1,
        );
        assert!(!odd.won);
    }

    #[test]
    fn exact_sum_prices_from_the_versioned_table() {
        let outcome = evaluate(
            &BetSelection::SumValue { sum: 12 },
            None,
            &reference_draw(),
            ODDS_TABLE_V1,
        );
        assert!(outcome.won);
        assert_eq!(outcome.odds, dec!(6.43));

        let miss = evaluate(
            &BetSelection::SumValue { sum: 19 },
            None,
            &reference_draw(),
            ODDS_TABLE_V1,
        );
        assert!(!miss.won);
        assert_eq!(miss.odds, dec!(89.02));
    }

    #[test]
    fn unreachable_sum_loses_with_zero_odds() {
        let outcome = evaluate(
            &BetSelection::SumValue { sum: 2 },
            None,
            &reference_draw(),
            ODDS_TABLE_V1,
        );
        assert!(!outcome.won);
        assert_eq!(outcome.odds, Decimal::ZERO);
        assert!(outcome.reason.contains("3..=19"));
    }

    #[test]
    fn dragon_tiger_compares_two_distinct_positions() {
        // Position 3 drew 9, position 8 drew 10.
        let draw = reference_draw();
        let dragon = evaluate(
            &BetSelection::DragonTiger {
                first: pos(3),
                second: pos(8),
                side: DragonTigerSide::Dragon,
            },
            None,
            &draw,
            ODDS_TABLE_V1,
        );
        assert!(!dragon.won);

        let tiger = evaluate(
            &BetSelection::DragonTiger {
                first: pos(3),
                second: pos(8),
                side: DragonTigerSide::Tiger,
            },
            None,
            &draw,
            ODDS_TABLE_V1,
        );
        assert!(tiger.won);
        assert_eq!(tiger.odds, dec!(1.98));
    }

    #[test]
    fn equal_dragon_tiger_positions_lose_with_zero_odds() {
        let outcome = evaluate(
            &BetSelection::DragonTiger {
                first: pos(4),
                second: pos(4),
                side: DragonTigerSide::Dragon,
            },
            None,
            &reference_draw(),
            ODDS_TABLE_V1,
        );
        assert!(!outcome.won);
        assert_eq!(outcome.odds, Decimal::ZERO);
    }

    #[test]
    fn payout_includes_the_stake_and_rounds_to_two_dp() {
        assert_eq!(payout(dec!(100), dec!(9.89)), dec!(989.00));
        assert_eq!(payout(dec!(33.33), dec!(1.98)), dec!(65.99));
        assert_eq!(payout(dec!(10), dec!(0)), Decimal::ZERO);
        assert_eq!(payout(dec!(10), dec!(-1.5)), Decimal::ZERO);
    }

    #[test]
    fn re_evaluation_is_deterministic() {
        let draw = reference_draw();
        let selection = BetSelection::SumValue { sum: 12 };
        let first = evaluate(&selection, None, &draw, ODDS_TABLE_V1);
        let second = evaluate(&selection, None, &draw, ODDS_TABLE_V1);
        assert_eq!(first, second);
    }
}
