use lottery_domain::{BetSelection, DragonTigerSide, DrawResult};
use rust_decimal::Decimal;
use tracing::warn;

use crate::odds::OddsTable;

/// A position's drawn number counts as big at 6 or above.
const POSITION_BIG_AT: u8 = 6;
/// The champion + runner-up sum counts as big at 12 or above.
const SUM_BIG_AT: u8 = 12;

/// Result of evaluating one bet against a finalized draw. Pure data; the
/// orchestrator turns it into balance and ledger writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetOutcome {
    pub won: bool,
    pub reason: String,
    /// Odds the payout is priced at: the bet's locked-in odds when present,
    /// otherwise the fallback table. Zero for unrepresentable selections.
    pub odds: Decimal,
}

impl BetOutcome {
    fn won(reason: String, odds: Decimal) -> Self {
        Self {
            won: true,
            reason,
            odds,
        }
    }

    fn lost(reason: String, odds: Decimal) -> Self {
        Self {
            won: false,
            reason,
            odds,
        }
    }
}

/// Evaluate a bet selection against a draw. Never fails: selections that no
/// draw can satisfy lose with a diagnostic reason and zero odds.
#[must_use]
pub fn evaluate(
    selection: &BetSelection,
    locked_odds: Option<Decimal>,
    draw: &DrawResult,
    table: OddsTable,
) -> BetOutcome {
    match *selection {
        BetSelection::NumberAtPosition { position, number } => {
            if !(1..=10).contains(&number) {
                return BetOutcome::lost(
                    format!("number {number} can never be drawn"),
                    Decimal::ZERO,
                );
            }
            let drawn = draw.number_at(position);
            let odds = locked_odds.unwrap_or_else(|| table.number());
            let reason = format!("position {position} drew {drawn}, bet {number}");
            if drawn == number {
                BetOutcome::won(reason, odds)
            } else {
                BetOutcome::lost(reason, odds)
            }
        }
        BetSelection::PositionTwoSides { position, side } => {
            let drawn = draw.number_at(position);
            let odds = locked_odds.unwrap_or_else(|| table.two_sides());
            let reason = format!("position {position} drew {drawn}, bet {}", side.as_str());
            if side.matches(drawn, POSITION_BIG_AT) {
                BetOutcome::won(reason, odds)
            } else {
                BetOutcome::lost(reason, odds)
            }
        }
        BetSelection::SumValue { sum } => {
            let Some(table_odds) = table.sum(sum) else {
                return BetOutcome::lost(
                    format!("sum {sum} is outside the reachable range 3..=19"),
                    Decimal::ZERO,
                );
            };
            let drawn_sum = draw.top_two_sum();
            let odds = locked_odds.unwrap_or(table_odds);
            let reason = format!("top-two sum is {drawn_sum}, bet {sum}");
            if drawn_sum == sum {
                BetOutcome::won(reason, odds)
            } else {
                BetOutcome::lost(reason, odds)
            }
        }
        BetSelection::SumTwoSides { side } => {
            let drawn_sum = draw.top_two_sum();
            let odds = locked_odds.unwrap_or_else(|| table.two_sides());
            let reason = format!("top-two sum is {drawn_sum}, bet {}", side.as_str());
            if side.matches(drawn_sum, SUM_BIG_AT) {
                BetOutcome::won(reason, odds)
            } else {
                BetOutcome::lost(reason, odds)
            }
        }
        BetSelection::DragonTiger {
            first,
            second,
            side,
        } => {
            if first == second {
                return BetOutcome::lost(
                    format!("dragon/tiger positions must differ, got {first} and {first}"),
                    Decimal::ZERO,
                );
            }
            let first_number = draw.number_at(first);
            let second_number = draw.number_at(second);
            let odds = locked_odds.unwrap_or_else(|| table.dragon_tiger());
            let reason = format!(
                "position {first} drew {first_number} vs position {second} drew {second_number}, bet {}",
                side.as_str()
            );
            // The draw is a permutation, so the two numbers never tie.
            let won = match side {
                DragonTigerSide::Dragon => first_number > second_number,
                DragonTigerSide::Tiger => first_number < second_number,
            };
            if won {
                BetOutcome::won(reason, odds)
            } else {
                BetOutcome::lost(reason, odds)
            }
        }
    }
}

/// Payout for a winning bet, stake included: `round2(stake * odds)`.
/// Non-positive odds pay nothing and are logged; they indicate a corrupt
/// locked-in price or an unrepresentable selection.
#[must_use]
pub fn payout(stake: Decimal, odds: Decimal) -> Decimal {
    if odds <= Decimal::ZERO {
        warn!(%stake, %odds, "non-positive odds produce a zero payout");
        return Decimal::ZERO;
    }
    lottery_domain::round2(stake * odds)
}
