pub mod bet;
pub mod draw;
pub mod ids;
pub mod money;

pub use bet::{BetParseError, BetSelection, DragonTigerSide, Position, TwoSides};
pub use draw::{DrawResult, DrawResultError};
pub use ids::{AgentId, BetId, PeriodId, TraceId};
pub use money::round2;
