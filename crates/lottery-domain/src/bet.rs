use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A 1-indexed ranked outcome slot in a draw result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(u8);

impl Position {
    #[must_use]
    pub fn new(raw: u8) -> Option<Self> {
        (1..=10).contains(&raw).then_some(Self(raw))
    }

    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse binary property of a drawn number or a sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwoSides {
    Big,
    Small,
    Odd,
    Even,
}

impl TwoSides {
    /// Whether `value` satisfies this side given the big/small threshold
    /// (`>= threshold` counts as big).
    #[must_use]
    pub fn matches(self, value: u8, big_threshold: u8) -> bool {
        match self {
            Self::Big => value >= big_threshold,
            Self::Small => value < big_threshold,
            Self::Odd => value % 2 == 1,
            Self::Even => value % 2 == 0,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Big => "big",
            Self::Small => "small",
            Self::Odd => "odd",
            Self::Even => "even",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragonTigerSide {
    Dragon,
    Tiger,
}

impl DragonTigerSide {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dragon => "dragon",
            Self::Tiger => "tiger",
        }
    }
}

/// Structured bet selector, resolved once at placement time. Settlement never
/// re-parses string tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetSelection {
    /// A chosen number 1..=10 at a target position.
    NumberAtPosition { position: Position, number: u8 },
    /// Big/small/odd/even on a single position's drawn number.
    PositionTwoSides { position: Position, side: TwoSides },
    /// Exact champion + runner-up sum, 3..=19.
    SumValue { sum: u8 },
    /// Big/small/odd/even on the champion + runner-up sum (big at >= 12).
    SumTwoSides { side: TwoSides },
    /// Compare the numbers at two distinct positions.
    DragonTiger {
        first: Position,
        second: Position,
        side: DragonTigerSide,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BetParseError {
    #[error("unknown bet type tag: {0}")]
    UnknownBetType(String),
    #[error("unknown bet value {value} for type {bet_type}")]
    UnknownBetValue { bet_type: String, value: String },
    #[error("position {0} is out of range 1..=10")]
    PositionOutOfRange(u8),
    #[error("number bet requires a target position")]
    MissingPosition,
    #[error("dragon/tiger positions must be two distinct positions 1..=10: {0}")]
    InvalidDragonTiger(String),
}

impl BetSelection {
    /// Resolve the legacy string-tag wire format into a structured selection.
    ///
    /// This is the placement-time migration path for rows written by the old
    /// system: `number` + position column, `champion`..`tenth`,
    /// `two_sides` (`"3_big"`), `big_small`/`odd_even`, `sum`/`sumValue`,
    /// and `dragon_tiger` (`"dragon_1_10"`, `"tiger_4_7"`, legacy `"1_10"`).
    pub fn from_legacy_tags(
        bet_type: &str,
        bet_value: &str,
        position: Option<u8>,
    ) -> Result<Self, BetParseError> {
        let ranked_position = |raw: u8| Position::new(raw).ok_or(BetParseError::PositionOutOfRange(raw));

        if bet_type == "number" {
            let raw = position.ok_or(BetParseError::MissingPosition)?;
            let position = ranked_position(raw)?;
            let number = bet_value
                .parse::<u8>()
                .map_err(|_| BetParseError::UnknownBetValue {
                    bet_type: bet_type.to_string(),
                    value: bet_value.to_string(),
                })?;
            return Ok(Self::NumberAtPosition { position, number });
        }

        if let Some(raw) = ranked_name_to_position(bet_type) {
            let position = ranked_position(raw)?;
            return if let Ok(number) = bet_value.parse::<u8>() {
                Ok(Self::NumberAtPosition { position, number })
            } else {
                let side = parse_two_sides(bet_type, bet_value)?;
                Ok(Self::PositionTwoSides { position, side })
            };
        }

        match bet_type {
            "two_sides" => {
                let (raw_position, raw_side) =
                    bet_value
                        .split_once('_')
                        .ok_or_else(|| BetParseError::UnknownBetValue {
                            bet_type: bet_type.to_string(),
                            value: bet_value.to_string(),
                        })?;
                let raw = raw_position
                    .parse::<u8>()
                    .map_err(|_| BetParseError::UnknownBetValue {
                        bet_type: bet_type.to_string(),
                        value: bet_value.to_string(),
                    })?;
                Ok(Self::PositionTwoSides {
                    position: ranked_position(raw)?,
                    side: parse_two_sides(bet_type, raw_side)?,
                })
            }
            "big_small" | "odd_even" => Ok(Self::SumTwoSides {
                side: parse_two_sides(bet_type, bet_value)?,
            }),
            "sum" | "sumValue" => {
                if let Ok(sum) = bet_value.parse::<u8>() {
                    Ok(Self::SumValue { sum })
                } else {
                    Ok(Self::SumTwoSides {
                        side: parse_two_sides(bet_type, bet_value)?,
                    })
                }
            }
            "dragon_tiger" | "dragonTiger" => parse_dragon_tiger(bet_value),
            other => Err(BetParseError::UnknownBetType(other.to_string())),
        }
    }
}

fn ranked_name_to_position(bet_type: &str) -> Option<u8> {
    match bet_type {
        "champion" => Some(1),
        "runnerup" => Some(2),
        "third" => Some(3),
        "fourth" => Some(4),
        "fifth" => Some(5),
        "sixth" => Some(6),
        "seventh" => Some(7),
        "eighth" => Some(8),
        "ninth" => Some(9),
        "tenth" => Some(10),
        _ => None,
    }
}

fn parse_two_sides(bet_type: &str, value: &str) -> Result<TwoSides, BetParseError> {
    match value {
        "big" => Ok(TwoSides::Big),
        "small" => Ok(TwoSides::Small),
        "odd" => Ok(TwoSides::Odd),
        "even" => Ok(TwoSides::Even),
        other => Err(BetParseError::UnknownBetValue {
            bet_type: bet_type.to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_dragon_tiger(bet_value: &str) -> Result<BetSelection, BetParseError> {
    let invalid = || BetParseError::InvalidDragonTiger(bet_value.to_string());

    let (side, rest) = if let Some(rest) = bet_value.strip_prefix("dragon_") {
        (DragonTigerSide::Dragon, rest)
    } else if let Some(rest) = bet_value.strip_prefix("tiger_") {
        (DragonTigerSide::Tiger, rest)
    } else {
        // Legacy "p1_p2" rows defaulted to dragon.
        (DragonTigerSide::Dragon, bet_value)
    };

    let (raw_first, raw_second) = rest.split_once('_').ok_or_else(invalid)?;
    let first = raw_first
        .parse::<u8>()
        .ok()
        .and_then(Position::new)
        .ok_or_else(invalid)?;
    let second = raw_second
        .parse::<u8>()
        .ok()
        .and_then(Position::new)
        .ok_or_else(invalid)?;
    if first == second {
        return Err(invalid());
    }
    Ok(BetSelection::DragonTiger {
        first,
        second,
        side,
    })
}
