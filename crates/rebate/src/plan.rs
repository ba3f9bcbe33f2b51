use agent_chain::AgentChainNode;
use lottery_domain::{round2, AgentId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How a member's rebate pool is split across their agent chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebatePolicy {
    /// Each agent earns the difference between their configured percentage
    /// and what lower levels already took, capped by the remaining pool.
    CascadingDifference,
    /// The entire pool goes to the top-most agent in the chain.
    TopAgentOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateCredit {
    pub agent_id: AgentId,
    pub agent_username: String,
    pub member_username: String,
    pub amount: Decimal,
}

/// The full rebate split for one member's turnover. `credits` plus
/// `platform_retained` always equals `pool` exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRebatePlan {
    pub member_username: String,
    pub total_stake: Decimal,
    pub pool: Decimal,
    pub credits: Vec<RebateCredit>,
    pub platform_retained: Decimal,
}

impl MemberRebatePlan {
    #[must_use]
    pub fn credited_total(&self) -> Decimal {
        self.credits.iter().map(|c| c.amount).sum()
    }
}

/// Compute the credit split for one member. Pure; the chain must already be
/// resolved bottom-up (direct agent first). An empty chain yields an empty
/// plan with a zero pool.
#[must_use]
pub fn plan_for_member(
    policy: RebatePolicy,
    member_username: &str,
    total_stake: Decimal,
    chain: &[AgentChainNode],
) -> MemberRebatePlan {
    let Some(direct) = chain.first() else {
        return MemberRebatePlan {
            member_username: member_username.to_string(),
            total_stake,
            pool: Decimal::ZERO,
            credits: Vec::new(),
            platform_retained: Decimal::ZERO,
        };
    };

    let market_rate = direct.market_type.market_rate();
    let pool = round2(total_stake * market_rate);
    let mut credits = Vec::new();
    let mut remaining = pool;

    match policy {
        RebatePolicy::CascadingDifference => {
            let mut distributed_pct = Decimal::ZERO;
            for node in chain {
                if remaining <= Decimal::ZERO {
                    break;
                }
                let amount = if node.rebate_pct >= market_rate {
                    remaining
                } else {
                    let diff = node.rebate_pct - distributed_pct;
                    if diff <= Decimal::ZERO {
                        continue;
                    }
                    round2(total_stake * diff).min(remaining)
                };
                if amount <= Decimal::ZERO {
                    continue;
                }
                remaining -= amount;
                if node.rebate_pct > distributed_pct {
                    distributed_pct = node.rebate_pct;
                }
                credits.push(RebateCredit {
                    agent_id: node.agent_id,
                    agent_username: node.username.clone(),
                    member_username: member_username.to_string(),
                    amount,
                });
            }
        }
        RebatePolicy::TopAgentOnly => {
            if let Some(top) = chain.last() {
                if remaining > Decimal::ZERO {
                    credits.push(RebateCredit {
                        agent_id: top.agent_id,
                        agent_username: top.username.clone(),
                        member_username: member_username.to_string(),
                        amount: remaining,
                    });
                    remaining = Decimal::ZERO;
                }
            }
        }
    }

    MemberRebatePlan {
        member_username: member_username.to_string(),
        total_stake,
        pool,
        credits,
        platform_retained: remaining,
    }
}
