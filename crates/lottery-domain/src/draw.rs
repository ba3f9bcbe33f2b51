use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bet::Position;
use crate::ids::PeriodId;

pub const POSITION_COUNT: usize = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawResultError {
    #[error("draw result must contain exactly {POSITION_COUNT} positions, got {0}")]
    WrongLength(usize),
    #[error("draw value {0} is out of range 1..=10")]
    ValueOutOfRange(u8),
    #[error("draw value {0} appears more than once")]
    DuplicateValue(u8),
}

/// One finalized outcome per period: a permutation of the numbers 1..=10
/// across ten ranked positions. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResult {
    pub period: PeriodId,
    positions: [u8; POSITION_COUNT],
    pub finalized_at: DateTime<Utc>,
}

impl DrawResult {
    pub fn new(
        period: PeriodId,
        positions: [u8; POSITION_COUNT],
        finalized_at: DateTime<Utc>,
    ) -> Result<Self, DrawResultError> {
        let mut seen = [false; POSITION_COUNT];
        for &value in &positions {
            if !(1..=10).contains(&value) {
                return Err(DrawResultError::ValueOutOfRange(value));
            }
            let slot = usize::from(value) - 1;
            if seen[slot] {
                return Err(DrawResultError::DuplicateValue(value));
            }
            seen[slot] = true;
        }
        Ok(Self {
            period,
            positions,
            finalized_at,
        })
    }

    pub fn from_values(
        period: PeriodId,
        values: &[u8],
        finalized_at: DateTime<Utc>,
    ) -> Result<Self, DrawResultError> {
        let positions: [u8; POSITION_COUNT] = values
            .try_into()
            .map_err(|_| DrawResultError::WrongLength(values.len()))?;
        Self::new(period, positions, finalized_at)
    }

    /// The drawn number at a 1-indexed position.
    #[must_use]
    pub fn number_at(&self, position: Position) -> u8 {
        self.positions[usize::from(position.get()) - 1]
    }

    /// Champion + runner-up sum, range 3..=19.
    #[must_use]
    pub fn top_two_sum(&self) -> u8 {
        self.positions[0] + self.positions[1]
    }

    #[must_use]
    pub fn positions(&self) -> &[u8; POSITION_COUNT] {
        &self.positions
    }
}
