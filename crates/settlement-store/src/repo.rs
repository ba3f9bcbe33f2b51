use async_trait::async_trait;
use lottery_domain::{BetId, PeriodId};
use std::time::Duration;
use thiserror::Error;

use crate::records::{
    BetRecord, LedgerEntryInsert, LedgerEntryRecord, MemberStakeTotal, SettlementCommit,
    SettlementLogInsert,
};

#[derive(Debug, Error)]
pub enum SettlementStoreError {
    #[error("store lock poisoned")]
    LockPoisoned,
    #[error("bet {0:?} not found")]
    BetNotFound(BetId),
    #[error("bet {0:?} is already settled")]
    BetAlreadySettled(BetId),
    #[error("bet {0:?} was not claimed before commit")]
    BetNotClaimed(BetId),
    #[error("period {0} already has a successful settlement log")]
    DuplicateSettlementLog(PeriodId),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Bet rows plus the atomic settlement transaction.
///
/// `claim_unsettled_bets` marks the returned rows as claimed so a concurrent
/// caller sees an empty set instead of the same rows, matching row-lock
/// skip semantics in a SQL backend. Claims are cleared by
/// `commit_settlement` or `release_claims`.
#[async_trait]
pub trait BetRepository: Send + Sync {
    async fn insert_bet(&self, bet: BetRecord) -> Result<(), SettlementStoreError>;

    async fn claim_unsettled_bets(
        &self,
        period: &PeriodId,
    ) -> Result<Vec<BetRecord>, SettlementStoreError>;

    async fn release_claims(&self, period: &PeriodId) -> Result<(), SettlementStoreError>;

    async fn has_settled_bets(&self, period: &PeriodId) -> Result<bool, SettlementStoreError>;

    /// Settled stake totals per member, ordered by username.
    async fn settled_stakes_by_member(
        &self,
        period: &PeriodId,
    ) -> Result<Vec<MemberStakeTotal>, SettlementStoreError>;

    /// Apply bet results, member credits and the settlement log as one
    /// transaction. Either everything lands or nothing does.
    async fn commit_settlement(
        &self,
        commit: &SettlementCommit,
    ) -> Result<(), SettlementStoreError>;
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Append entries, stamping balance-before/after per actor account.
    async fn insert_entries(
        &self,
        entries: &[LedgerEntryInsert],
    ) -> Result<Vec<LedgerEntryRecord>, SettlementStoreError>;

    async fn has_rebate_entries(&self, period: &PeriodId) -> Result<bool, SettlementStoreError>;
}

#[async_trait]
pub trait SettlementLogRepository: Send + Sync {
    async fn has_success_log(&self, period: &PeriodId) -> Result<bool, SettlementStoreError>;

    /// Record a log row outside the settlement transaction. Used for failure
    /// rows; success rows land through `commit_settlement`.
    async fn insert_log(&self, log: &SettlementLogInsert) -> Result<(), SettlementStoreError>;
}

#[async_trait]
pub trait PeriodLockRepository: Send + Sync {
    /// Single atomic insert-or-steal-if-expired. Returns false when another
    /// holder owns an unexpired lock on `key`.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool, SettlementStoreError>;

    async fn release(&self, key: &str) -> Result<(), SettlementStoreError>;
}
