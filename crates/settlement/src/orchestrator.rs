use async_trait::async_trait;
use bet_engine::{evaluate, payout, OddsTable};
use chrono::Utc;
use lottery_domain::{DrawResult, PeriodId, TraceId};
use rust_decimal::Decimal;
use settlement_store::{
    BetRepository, BetSettlementUpdate, LedgerActor, LedgerEntryInsert, LedgerEntryKind,
    LedgerRepository, PeriodLockRepository, SettlementCommit, SettlementLogInsert,
    SettlementLogRepository, SettlementLogStatus, SettlementStoreError,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use crate::guard::IdempotencyGuard;
use crate::lock::LockManager;

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("store error: {0}")]
    Store(#[from] SettlementStoreError),
}

/// Lifecycle of one settlement attempt, recorded in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementPhase {
    Pending,
    Locked,
    Evaluating,
    Committed,
    RebateProcessing,
    Done,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    /// Another invocation holds the period lock.
    LockDenied,
    /// The period already settled; `rebate_caught_up` marks whether this
    /// attempt distributed a rebate the earlier run left behind.
    AlreadySettled { rebate_caught_up: bool },
    /// Nothing to do for this period.
    NoBets,
    Settled {
        settled_count: u64,
        won_count: u64,
        total_payout: Decimal,
        rebate_distributed: bool,
    },
}

/// Rebate entry point as the orchestrator sees it. Failures are reported as
/// strings because they never roll back a settlement.
#[async_trait]
pub trait RebateRunner: Send + Sync {
    async fn run_rebate(&self, period: &PeriodId) -> Result<(), String>;
}

#[async_trait]
impl<B, L, R, C> RebateRunner for rebate::RebateDistributor<B, L, R, C>
where
    B: BetRepository,
    L: LedgerRepository,
    R: agent_chain::AgentChainResolver,
    C: rebate::RebateCreditPort,
{
    async fn run_rebate(&self, period: &PeriodId) -> Result<(), String> {
        self.distribute(period)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

pub struct SettlementConfig {
    pub lock_ttl: Duration,
    pub odds_table: OddsTable,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(300),
            odds_table: bet_engine::ODDS_TABLE_V1,
        }
    }
}

/// Drives one period through `Pending -> Locked -> Evaluating -> Committed ->
/// RebateProcessing -> Done`. Safe to invoke concurrently for the same
/// period from many tasks; exactly one invocation commits.
pub struct SettlementOrchestrator<B, S, L, P, R> {
    bet_repo: B,
    log_repo: S,
    guard: IdempotencyGuard<S, L>,
    locks: LockManager<P>,
    rebate: R,
    odds_table: OddsTable,
}

impl<B, S, L, P, R> SettlementOrchestrator<B, S, L, P, R>
where
    B: BetRepository,
    S: SettlementLogRepository + Clone,
    L: LedgerRepository,
    P: PeriodLockRepository,
    R: RebateRunner,
{
    #[must_use]
    pub fn new(
        bet_repo: B,
        log_repo: S,
        ledger_repo: L,
        lock_repo: P,
        rebate: R,
        config: SettlementConfig,
    ) -> Self {
        Self {
            bet_repo,
            log_repo: log_repo.clone(),
            guard: IdempotencyGuard::new(log_repo, ledger_repo),
            locks: LockManager::new(lock_repo, config.lock_ttl),
            rebate,
            odds_table: config.odds_table,
        }
    }

    /// Settle every outstanding bet for the draw's period. The draw is
    /// already validated as a permutation; no mutation happens before the
    /// period lock is held.
    pub async fn settle(&self, draw: &DrawResult) -> Result<SettlementOutcome, SettlementError> {
        let period = &draw.period;
        if !self.locks.acquire(period).await? {
            return Ok(SettlementOutcome::LockDenied);
        }
        let result = self.settle_locked(draw).await;
        if let Err(release_err) = self.locks.release(period).await {
            warn!(period = %period, error = %release_err, "settlement lock release failed");
        }
        result
    }

    async fn settle_locked(
        &self,
        draw: &DrawResult,
    ) -> Result<SettlementOutcome, SettlementError> {
        let period = &draw.period;

        // Re-validate under the lock; a racing invocation may have finished
        // between our lock attempt and theirs.
        if self.guard.already_settled(period).await? {
            return self.catch_up_rebate(period).await;
        }

        let claimed = self.bet_repo.claim_unsettled_bets(period).await?;
        if claimed.is_empty() {
            if self.bet_repo.has_settled_bets(period).await? {
                return self.catch_up_rebate(period).await;
            }
            info!(period = %period, "no outstanding bets for period");
            return Ok(SettlementOutcome::NoBets);
        }

        info!(
            period = %period,
            bets = claimed.len(),
            phase = ?SettlementPhase::Evaluating,
            "evaluating claimed bets"
        );
        let started = Instant::now();
        let settled_at = Utc::now();
        let trace_id = TraceId::new();

        let mut updates = Vec::with_capacity(claimed.len());
        let mut details = Vec::with_capacity(claimed.len());
        let mut payout_by_member: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut won_count = 0_u64;
        let mut total_payout = Decimal::ZERO;
        for bet in &claimed {
            let outcome = evaluate(&bet.selection, bet.locked_odds, draw, self.odds_table);
            let amount = if outcome.won {
                payout(bet.stake, outcome.odds)
            } else {
                Decimal::ZERO
            };
            if outcome.won {
                won_count += 1;
                total_payout += amount;
                *payout_by_member
                    .entry(bet.member_username.clone())
                    .or_insert(Decimal::ZERO) += amount;
            }
            details.push(serde_json::json!({
                "betId": bet.bet_id,
                "member": bet.member_username,
                "won": outcome.won,
                "payout": amount,
                "reason": outcome.reason,
            }));
            updates.push(BetSettlementUpdate {
                bet_id: bet.bet_id,
                won: outcome.won,
                payout: amount,
                reason: outcome.reason,
                settled_at,
            });
        }

        let credits = payout_by_member
            .into_iter()
            .filter(|(_, amount)| *amount > Decimal::ZERO)
            .map(|(member, amount)| LedgerEntryInsert {
                actor: LedgerActor::Member(member),
                kind: LedgerEntryKind::Win,
                amount,
                reason: format!("winnings for period {period}"),
                period: period.clone(),
                trace_id,
            })
            .collect();

        let settled_count = claimed.len() as u64;
        let commit = SettlementCommit {
            period: period.clone(),
            bet_updates: updates,
            credits,
            log: SettlementLogInsert {
                period: period.clone(),
                status: SettlementLogStatus::Success,
                settled_count,
                won_count,
                total_payout,
                execution_ms: started.elapsed().as_millis() as u64,
                odds_table_version: self.odds_table.version(),
                details: serde_json::Value::Array(details),
            },
        };

        if let Err(err) = self.bet_repo.commit_settlement(&commit).await {
            warn!(period = %period, error = %err, "settlement commit failed, releasing claims");
            self.bet_repo.release_claims(period).await?;
            let failed_log = SettlementLogInsert {
                period: period.clone(),
                status: SettlementLogStatus::Failed,
                settled_count: 0,
                won_count: 0,
                total_payout: Decimal::ZERO,
                execution_ms: started.elapsed().as_millis() as u64,
                odds_table_version: self.odds_table.version(),
                details: serde_json::json!({ "error": err.to_string() }),
            };
            if let Err(log_err) = self.log_repo.insert_log(&failed_log).await {
                warn!(period = %period, error = %log_err, "failed settlement log insert failed");
            }
            return Err(err.into());
        }

        info!(
            period = %period,
            settled_count,
            won_count,
            total_payout = %total_payout,
            phase = ?SettlementPhase::Committed,
            "period settled"
        );

        let rebate_distributed = match self.rebate.run_rebate(period).await {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    period = %period,
                    error = %err,
                    "rebate distribution failed, settlement stands"
                );
                false
            }
        };

        Ok(SettlementOutcome::Settled {
            settled_count,
            won_count,
            total_payout,
            rebate_distributed,
        })
    }

    async fn catch_up_rebate(
        &self,
        period: &PeriodId,
    ) -> Result<SettlementOutcome, SettlementError> {
        if self.guard.already_rebated(period).await? {
            return Ok(SettlementOutcome::AlreadySettled {
                rebate_caught_up: false,
            });
        }
        match self.rebate.run_rebate(period).await {
            Ok(()) => {
                info!(period = %period, phase = ?SettlementPhase::RebateProcessing, "rebate caught up for settled period");
                Ok(SettlementOutcome::AlreadySettled {
                    rebate_caught_up: true,
                })
            }
            Err(err) => {
                warn!(period = %period, error = %err, "rebate catch-up failed");
                Ok(SettlementOutcome::AlreadySettled {
                    rebate_caught_up: false,
                })
            }
        }
    }
}
