pub mod auto_settle;
pub mod guard;
pub mod lock;
pub mod orchestrator;

pub use auto_settle::{spawn_settlement_loop, DrawFeed, SettlementLoopConfig};
pub use guard::IdempotencyGuard;
pub use lock::{settlement_lock_key, LockManager};
pub use orchestrator::{
    RebateRunner, SettlementConfig, SettlementError, SettlementOrchestrator, SettlementOutcome,
    SettlementPhase,
};

#[cfg(test)]
mod tests {
    use super::*;
    use agent_chain::{AgentChainNode, InMemoryAgentDirectory, MarketType};
    use async_trait::async_trait;
    use chrono::Utc;
    use lottery_domain::{
        AgentId, BetSelection, DrawResult, PeriodId, Position, TwoSides,
    };
    use rebate::{RebateCreditPort, RebateCreditRequest, RebateDistributor, RebatePolicy};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use settlement_store::{
        BetRecord, BetRepository, InMemoryBettingStore, LedgerEntryKind, PeriodLockRepository,
    };
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn period() -> PeriodId {
        PeriodId::from("20250718493")
    }

    fn draw() -> DrawResult {
        DrawResult::new(period(), [7, 5, 9, 1, 6, 2, 4, 10, 3, 8], Utc::now()).expect("draw")
    }

    #[derive(Debug, Default, Clone)]
    struct RecordingCreditPort {
        calls: Arc<Mutex<Vec<RebateCreditRequest>>>,
    }

    #[async_trait]
    impl RebateCreditPort for RecordingCreditPort {
        async fn credit(&self, request: &RebateCreditRequest) -> Result<(), String> {
            self.calls
                .lock()
                .map_err(|_| "lock poisoned".to_string())?
                .push(request.clone());
            Ok(())
        }
    }

    #[derive(Debug, Clone)]
    struct NoopRebate;

    #[async_trait]
    impl RebateRunner for NoopRebate {
        async fn run_rebate(&self, _period: &PeriodId) -> Result<(), String> {
            Ok(())
        }
    }

    #[derive(Debug, Clone)]
    struct FailingRebate;

    #[async_trait]
    impl RebateRunner for FailingRebate {
        async fn run_rebate(&self, _period: &PeriodId) -> Result<(), String> {
            Err("agent service down".to_string())
        }
    }

    async fn seed_bets(store: &InMemoryBettingStore) {
        // alice: exact champion number, wins 100 * 9.89 = 989.00.
        store
            .insert_bet(BetRecord::placed(
                "alice",
                period(),
                BetSelection::NumberAtPosition {
                    position: Position::new(1).expect("pos"),
                    number: 7,
                },
                dec!(100),
                None,
            ))
            .await
            .expect("insert");
        // bob: sum small, loses against a top-two sum of 12.
        store
            .insert_bet(BetRecord::placed(
                "bob",
                period(),
                BetSelection::SumTwoSides {
                    side: TwoSides::Small,
                },
                dec!(50),
                None,
            ))
            .await
            .expect("insert");
    }

    fn directory_for_alice() -> InMemoryAgentDirectory {
        let directory = InMemoryAgentDirectory::new();
        let top = AgentChainNode {
            agent_id: AgentId::new(),
            username: "top".to_string(),
            parent_id: None,
            rebate_pct: dec!(0.041),
            market_type: MarketType::D,
        };
        let direct = AgentChainNode {
            agent_id: AgentId::new(),
            username: "direct".to_string(),
            parent_id: Some(top.agent_id),
            rebate_pct: dec!(0.01),
            market_type: MarketType::D,
        };
        let direct_id = direct.agent_id;
        directory.upsert_agent(top).expect("upsert");
        directory.upsert_agent(direct).expect("upsert");
        directory.assign_member("alice", direct_id).expect("assign");
        directory
    }

    fn orchestrator_with<R: RebateRunner>(
        store: &InMemoryBettingStore,
        rebate: R,
    ) -> SettlementOrchestrator<
        InMemoryBettingStore,
        InMemoryBettingStore,
        InMemoryBettingStore,
        InMemoryBettingStore,
        R,
    > {
        SettlementOrchestrator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            rebate,
            SettlementConfig::default(),
        )
    }

    #[tokio::test]
    async fn settles_a_period_end_to_end_with_rebate() {
        let store = InMemoryBettingStore::new();
        seed_bets(&store).await;
        let port = RecordingCreditPort::default();
        let distributor = RebateDistributor::new(
            store.clone(),
            store.clone(),
            directory_for_alice(),
            port.clone(),
            RebatePolicy::CascadingDifference,
        );
        let orchestrator = orchestrator_with(&store, distributor);

        let outcome = orchestrator.settle(&draw()).await.expect("settle");
        assert_eq!(
            outcome,
            SettlementOutcome::Settled {
                settled_count: 2,
                won_count: 1,
                total_payout: dec!(989.00),
                rebate_distributed: true,
            }
        );

        assert_eq!(store.balance("member:alice").expect("bal"), dec!(989.00));
        assert_eq!(store.balance("member:bob").expect("bal"), Decimal::ZERO);

        let logs = store.logs_snapshot().expect("logs");
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].settled_count, 2);
        assert_eq!(logs[0].odds_table_version, 1);

        // Rebate: alice's 100 turnover at market D pools 4.10;
        // direct takes 1.00, top takes the remaining 3.10.
        let calls = port.calls.lock().expect("calls");
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].amount, dec!(1.00));
        assert_eq!(calls[1].amount, dec!(3.10));

        // Second invocation is a pure no-op.
        drop(calls);
        let again = orchestrator.settle(&draw()).await.expect("again");
        assert_eq!(
            again,
            SettlementOutcome::AlreadySettled {
                rebate_caught_up: false
            }
        );
        assert_eq!(store.balance("member:alice").expect("bal"), dec!(989.00));
        assert_eq!(port.calls.lock().expect("calls").len(), 2);
    }

    #[tokio::test]
    async fn concurrent_invocations_settle_each_bet_exactly_once() {
        let store = InMemoryBettingStore::new();
        seed_bets(&store).await;
        let orchestrator = Arc::new(orchestrator_with(&store, NoopRebate));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let orchestrator = Arc::clone(&orchestrator);
            handles.push(tokio::spawn(
                async move { orchestrator.settle(&draw()).await },
            ));
        }

        let mut settled_runs = 0;
        for handle in handles {
            let outcome = handle.await.expect("join").expect("settle");
            if matches!(outcome, SettlementOutcome::Settled { .. }) {
                settled_runs += 1;
            }
        }
        assert_eq!(settled_runs, 1);
        assert_eq!(store.balance("member:alice").expect("bal"), dec!(989.00));
        assert_eq!(store.logs_snapshot().expect("logs").len(), 1);
    }

    #[tokio::test]
    async fn held_lock_denies_the_attempt_without_touching_bets() {
        let store = InMemoryBettingStore::new();
        seed_bets(&store).await;
        store
            .try_acquire(&settlement_lock_key(&period()), Duration::from_secs(60))
            .await
            .expect("pre-hold");

        let orchestrator = orchestrator_with(&store, NoopRebate);
        let outcome = orchestrator.settle(&draw()).await.expect("settle");
        assert_eq!(outcome, SettlementOutcome::LockDenied);
        assert!(!store.has_settled_bets(&period()).await.expect("settled"));
    }

    #[tokio::test]
    async fn period_without_bets_is_a_no_op() {
        let store = InMemoryBettingStore::new();
        let orchestrator = orchestrator_with(&store, NoopRebate);
        let outcome = orchestrator.settle(&draw()).await.expect("settle");
        assert_eq!(outcome, SettlementOutcome::NoBets);
        assert!(store.logs_snapshot().expect("logs").is_empty());
    }

    #[tokio::test]
    async fn rebate_failure_never_rolls_back_settlement_and_catches_up_later() {
        let store = InMemoryBettingStore::new();
        seed_bets(&store).await;

        let failing = orchestrator_with(&store, FailingRebate);
        let outcome = failing.settle(&draw()).await.expect("settle");
        assert_eq!(
            outcome,
            SettlementOutcome::Settled {
                settled_count: 2,
                won_count: 1,
                total_payout: dec!(989.00),
                rebate_distributed: false,
            }
        );
        assert_eq!(store.balance("member:alice").expect("bal"), dec!(989.00));
        assert!(!store
            .entries_snapshot()
            .expect("entries")
            .iter()
            .any(|e| e.kind == LedgerEntryKind::Rebate));

        // A later invocation distributes the missing rebate.
        let port = RecordingCreditPort::default();
        let distributor = RebateDistributor::new(
            store.clone(),
            store.clone(),
            directory_for_alice(),
            port.clone(),
            RebatePolicy::CascadingDifference,
        );
        let catching_up = orchestrator_with(&store, distributor);
        let outcome = catching_up.settle(&draw()).await.expect("catch up");
        assert_eq!(
            outcome,
            SettlementOutcome::AlreadySettled {
                rebate_caught_up: true
            }
        );
        assert_eq!(port.calls.lock().expect("calls").len(), 2);
        assert!(store
            .entries_snapshot()
            .expect("entries")
            .iter()
            .any(|e| e.kind == LedgerEntryKind::Rebate));
        // Balances from settlement are untouched by the catch-up.
        assert_eq!(store.balance("member:alice").expect("bal"), dec!(989.00));
    }

    struct EmptyFeed;

    #[async_trait]
    impl DrawFeed for EmptyFeed {
        async fn next_finalized_draws(&self) -> Result<Vec<DrawResult>, String> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn settlement_loop_ticks_and_shuts_down() {
        let store = InMemoryBettingStore::new();
        let orchestrator = Arc::new(orchestrator_with(&store, NoopRebate));
        let (tx, rx) = oneshot::channel();

        let handle = spawn_settlement_loop(
            orchestrator,
            Arc::new(EmptyFeed),
            SettlementLoopConfig {
                poll_interval: Duration::from_millis(10),
            },
            rx,
        );

        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = tx.send(());
        handle.await.expect("join");
    }
}
