use async_trait::async_trait;
use lottery_domain::DrawResult;
use settlement_store::{
    BetRepository, LedgerRepository, PeriodLockRepository, SettlementLogRepository,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::orchestrator::{RebateRunner, SettlementOrchestrator};

/// Source of finalized draws awaiting settlement. Returning the same period
/// on consecutive polls is fine; the orchestrator is idempotent.
#[async_trait]
pub trait DrawFeed: Send + Sync {
    async fn next_finalized_draws(&self) -> Result<Vec<DrawResult>, String>;
}

pub struct SettlementLoopConfig {
    pub poll_interval: Duration,
}

impl Default for SettlementLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

pub fn spawn_settlement_loop<B, S, L, P, R, F>(
    orchestrator: Arc<SettlementOrchestrator<B, S, L, P, R>>,
    feed: Arc<F>,
    cfg: SettlementLoopConfig,
    mut shutdown_rx: oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()>
where
    B: BetRepository + 'static,
    S: SettlementLogRepository + Clone + 'static,
    L: LedgerRepository + 'static,
    P: PeriodLockRepository + 'static,
    R: RebateRunner + 'static,
    F: DrawFeed + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.poll_interval);
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("settlement loop shutdown");
                    break;
                }
                _ = ticker.tick() => {
                    let draws = match feed.next_finalized_draws().await {
                        Ok(draws) => draws,
                        Err(err) => {
                            warn!(error = %err, "draw feed poll failed");
                            continue;
                        }
                    };
                    for draw in draws {
                        if let Err(err) = orchestrator.settle(&draw).await {
                            warn!(period = %draw.period, error = %err, "settlement attempt failed");
                        }
                    }
                }
            }
        }
    })
}
