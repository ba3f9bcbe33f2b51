use agent_chain::{AgentChainError, AgentChainResolver};
use lottery_domain::{PeriodId, TraceId};
use rust_decimal::Decimal;
use settlement_store::{
    BetRepository, LedgerActor, LedgerEntryInsert, LedgerEntryKind, LedgerRepository,
    SettlementStoreError,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::plan::{plan_for_member, MemberRebatePlan, RebatePolicy};
use crate::port::{RebateCreditPort, RebateCreditRequest};

#[derive(Debug, Error)]
pub enum RebateError {
    #[error("agent chain error: {0}")]
    Chain(#[from] AgentChainError),
    #[error("store error: {0}")]
    Store(#[from] SettlementStoreError),
    #[error("credit port error for agent {agent}: {detail}")]
    CreditPort { agent: String, detail: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RebateOutcome {
    /// The period already has rebate ledger entries.
    AlreadyRebated,
    /// No settled turnover or no pool to distribute.
    NoPool,
    Distributed {
        credited_count: usize,
        total_credited: Decimal,
        platform_retained: Decimal,
    },
}

pub struct RebateDistributor<B, L, R, C> {
    bet_repo: B,
    ledger_repo: L,
    chain_resolver: R,
    credit_port: C,
    policy: RebatePolicy,
}

impl<B, L, R, C> RebateDistributor<B, L, R, C>
where
    B: BetRepository,
    L: LedgerRepository,
    R: AgentChainResolver,
    C: RebateCreditPort,
{
    #[must_use]
    pub fn new(
        bet_repo: B,
        ledger_repo: L,
        chain_resolver: R,
        credit_port: C,
        policy: RebatePolicy,
    ) -> Self {
        Self {
            bet_repo,
            ledger_repo,
            chain_resolver,
            credit_port,
            policy,
        }
    }

    /// Distribute the rebate pool for a settled period.
    ///
    /// Chain resolution is two-phase: every member's chain resolves and the
    /// full credit plan is computed before any credit is issued, so a
    /// resolution failure defers the whole period and leaves it eligible for
    /// a later retry.
    pub async fn distribute(&self, period: &PeriodId) -> Result<RebateOutcome, RebateError> {
        if self.ledger_repo.has_rebate_entries(period).await? {
            info!(period = %period, "rebate already distributed, skipping");
            return Ok(RebateOutcome::AlreadyRebated);
        }

        let stakes = self.bet_repo.settled_stakes_by_member(period).await?;
        let mut plans: Vec<MemberRebatePlan> = Vec::with_capacity(stakes.len());
        for stake in &stakes {
            let chain = self
                .chain_resolver
                .resolve_chain(&stake.member_username)
                .await?;
            plans.push(plan_for_member(
                self.policy,
                &stake.member_username,
                stake.total_stake,
                &chain,
            ));
        }

        let total_pool: Decimal = plans.iter().map(|p| p.pool).sum();
        if total_pool <= Decimal::ZERO {
            info!(period = %period, "no rebate pool for period");
            return Ok(RebateOutcome::NoPool);
        }

        let trace_id = TraceId::new();
        let mut credited_count = 0_usize;
        let mut total_credited = Decimal::ZERO;
        let mut platform_retained = Decimal::ZERO;
        for plan in &plans {
            for credit in &plan.credits {
                let request = RebateCreditRequest {
                    agent_id: credit.agent_id,
                    amount: credit.amount,
                    member_username: credit.member_username.clone(),
                    period: period.clone(),
                    reason: format!("rebate for period {period}"),
                };
                self.credit_port.credit(&request).await.map_err(|detail| {
                    warn!(
                        period = %period,
                        agent = %credit.agent_username,
                        error = %detail,
                        "rebate credit failed"
                    );
                    RebateError::CreditPort {
                        agent: credit.agent_username.clone(),
                        detail,
                    }
                })?;
                self.ledger_repo
                    .insert_entries(&[LedgerEntryInsert {
                        actor: LedgerActor::Agent(credit.agent_id),
                        kind: LedgerEntryKind::Rebate,
                        amount: credit.amount,
                        reason: format!(
                            "rebate from member {} turnover",
                            credit.member_username
                        ),
                        period: period.clone(),
                        trace_id,
                    }])
                    .await?;
                credited_count += 1;
                total_credited += credit.amount;
            }
            platform_retained += plan.platform_retained;
        }

        // Retained remainder is booked explicitly so every pool unit is
        // accounted for: credits + retention == pool.
        if platform_retained > Decimal::ZERO {
            self.ledger_repo
                .insert_entries(&[LedgerEntryInsert {
                    actor: LedgerActor::Platform,
                    kind: LedgerEntryKind::Rebate,
                    amount: platform_retained,
                    reason: "undistributed rebate pool remainder".to_string(),
                    period: period.clone(),
                    trace_id,
                }])
                .await?;
        }

        info!(
            period = %period,
            credited_count,
            total_credited = %total_credited,
            platform_retained = %platform_retained,
            "rebate distributed"
        );
        Ok(RebateOutcome::Distributed {
            credited_count,
            total_credited,
            platform_retained,
        })
    }
}
