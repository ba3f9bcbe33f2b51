use chrono::{DateTime, Utc};
use lottery_domain::{AgentId, BetId, BetSelection, PeriodId, TraceId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One wager row. `settled`, `won` and `payout` are written exactly once by
/// a settlement commit and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub bet_id: BetId,
    pub member_username: String,
    pub period: PeriodId,
    pub selection: BetSelection,
    pub stake: Decimal,
    /// Odds locked in at placement time; `None` means price from the
    /// fallback table at settlement.
    pub locked_odds: Option<Decimal>,
    pub settled: bool,
    pub won: Option<bool>,
    pub payout: Option<Decimal>,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl BetRecord {
    /// A fresh unsettled bet.
    #[must_use]
    pub fn placed(
        member_username: impl Into<String>,
        period: PeriodId,
        selection: BetSelection,
        stake: Decimal,
        locked_odds: Option<Decimal>,
    ) -> Self {
        Self {
            bet_id: BetId::new(),
            member_username: member_username.into(),
            period,
            selection,
            stake,
            locked_odds,
            settled: false,
            won: None,
            payout: None,
            placed_at: Utc::now(),
            settled_at: None,
        }
    }
}

/// Per-bet result applied by a settlement commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSettlementUpdate {
    pub bet_id: BetId,
    pub won: bool,
    pub payout: Decimal,
    pub reason: String,
    pub settled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "actor_type", content = "actor_id")]
pub enum LedgerActor {
    Member(String),
    Agent(AgentId),
    Platform,
}

impl LedgerActor {
    /// Stable balance-account key for this actor.
    #[must_use]
    pub fn account_key(&self) -> String {
        match self {
            Self::Member(username) => format!("member:{username}"),
            Self::Agent(agent_id) => format!("agent:{}", agent_id.0),
            Self::Platform => "platform".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEntryKind {
    Win,
    Rebate,
    Adjustment,
    Refund,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntryInsert {
    pub actor: LedgerActor,
    pub kind: LedgerEntryKind,
    pub amount: Decimal,
    pub reason: String,
    pub period: PeriodId,
    pub trace_id: TraceId,
}

/// Persisted ledger row. `balance_after = balance_before + amount` holds for
/// every row; the store enforces it at insert time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntryRecord {
    pub actor: LedgerActor,
    pub kind: LedgerEntryKind,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub reason: String,
    pub period: PeriodId,
    pub trace_id: TraceId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementLogStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementLogInsert {
    pub period: PeriodId,
    pub status: SettlementLogStatus,
    pub settled_count: u64,
    pub won_count: u64,
    pub total_payout: Decimal,
    pub execution_ms: u64,
    pub odds_table_version: u32,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementLogRecord {
    pub period: PeriodId,
    pub status: SettlementLogStatus,
    pub settled_count: u64,
    pub won_count: u64,
    pub total_payout: Decimal,
    pub execution_ms: u64,
    pub odds_table_version: u32,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Everything a settlement applies in one atomic transaction: bet results,
/// member win credits, and the success log row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementCommit {
    pub period: PeriodId,
    pub bet_updates: Vec<BetSettlementUpdate>,
    pub credits: Vec<LedgerEntryInsert>,
    pub log: SettlementLogInsert,
}

/// Total stake a member had settled in a period, for rebate pooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberStakeTotal {
    pub member_username: String,
    pub total_stake: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodLockRecord {
    pub key: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
