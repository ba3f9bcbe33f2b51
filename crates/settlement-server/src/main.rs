use agent_chain::{AgentChainNode, InMemoryAgentDirectory, MarketType};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use lottery_domain::{AgentId, BetSelection, DrawResult, PeriodId, Position, TwoSides};
use observability::init_tracing;
use platform_core::{AppConfig, RebatePolicyName};
use rebate::{RebateCreditPort, RebateCreditRequest, RebateDistributor, RebatePolicy};
use rust_decimal_macros::dec;
use settlement::{SettlementConfig, SettlementOrchestrator};
use settlement_store::{BetRecord, BetRepository, InMemoryBettingStore};
use std::time::Duration;
use tracing::info;

/// Logs each credit instead of calling the agent service; the demo wiring
/// has no live agent system behind it.
#[derive(Debug, Clone)]
struct LoggingCreditPort;

#[async_trait::async_trait]
impl RebateCreditPort for LoggingCreditPort {
    async fn credit(&self, request: &RebateCreditRequest) -> Result<(), String> {
        info!(
            agent_id = %request.agent_id.0,
            amount = %request.amount,
            member = %request.member_username,
            period = %request.period,
            "rebate credit issued"
        );
        Ok(())
    }
}

fn parse_draw_args() -> Result<DrawResult> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 11 {
        bail!("usage: settlement-server <period> <n1> .. <n10>");
    }
    let period = PeriodId::new(args[0].clone());
    let values = args[1..]
        .iter()
        .map(|raw| raw.parse::<u8>().with_context(|| format!("invalid draw value {raw}")))
        .collect::<Result<Vec<u8>>>()?;
    DrawResult::from_values(period, &values, Utc::now()).context("invalid draw result")
}

async fn seed_demo_data(store: &InMemoryBettingStore, period: &PeriodId) -> Result<InMemoryAgentDirectory> {
    let bets = [
        BetRecord::placed(
            "alice",
            period.clone(),
            BetSelection::NumberAtPosition {
                position: Position::new(1).context("position")?,
                number: 7,
            },
            dec!(100),
            None,
        ),
        BetRecord::placed(
            "alice",
            period.clone(),
            BetSelection::SumTwoSides {
                side: TwoSides::Big,
            },
            dec!(50),
            None,
        ),
        BetRecord::placed(
            "bob",
            period.clone(),
            BetSelection::DragonTiger {
                first: Position::new(1).context("position")?,
                second: Position::new(10).context("position")?,
                side: lottery_domain::DragonTigerSide::Dragon,
            },
            dec!(20),
            None,
        ),
    ];
    for bet in bets {
        store.insert_bet(bet).await?;
    }

    let directory = InMemoryAgentDirectory::new();
    let top = AgentChainNode {
        agent_id: AgentId::new(),
        username: "top-agent".to_string(),
        parent_id: None,
        rebate_pct: dec!(0.041),
        market_type: MarketType::D,
    };
    let direct = AgentChainNode {
        agent_id: AgentId::new(),
        username: "direct-agent".to_string(),
        parent_id: Some(top.agent_id),
        rebate_pct: dec!(0.01),
        market_type: MarketType::D,
    };
    let direct_id = direct.agent_id;
    directory.upsert_agent(top)?;
    directory.upsert_agent(direct)?;
    directory.assign_member("alice", direct_id)?;
    Ok(directory)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.app.service_name, &config.observability.log_filter);

    let draw = parse_draw_args()?;
    let store = InMemoryBettingStore::new();
    let directory = seed_demo_data(&store, &draw.period).await?;

    let policy = match config.rebate.policy {
        RebatePolicyName::CascadingDifference => RebatePolicy::CascadingDifference,
        RebatePolicyName::TopAgentOnly => RebatePolicy::TopAgentOnly,
    };
    let distributor = RebateDistributor::new(
        store.clone(),
        store.clone(),
        directory,
        LoggingCreditPort,
        policy,
    );
    let orchestrator = SettlementOrchestrator::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        distributor,
        SettlementConfig {
            lock_ttl: Duration::from_secs(config.settlement.lock_ttl_secs),
            odds_table: bet_engine::ODDS_TABLE_V1,
        },
    );

    let outcome = orchestrator.settle(&draw).await?;
    info!(period = %draw.period, outcome = ?outcome, "settlement run finished");

    for entry in store.entries_snapshot()? {
        info!(
            actor = ?entry.actor,
            kind = ?entry.kind,
            amount = %entry.amount,
            balance_after = %entry.balance_after,
            "ledger entry"
        );
    }
    Ok(())
}
