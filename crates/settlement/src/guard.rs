use lottery_domain::PeriodId;
use settlement_store::{LedgerRepository, SettlementLogRepository, SettlementStoreError};

/// Period-level idempotency checks shared by the orchestrator and the rebate
/// catch-up path. Both are re-validated after the settlement lock is held.
pub struct IdempotencyGuard<S, L> {
    log_repo: S,
    ledger_repo: L,
}

impl<S, L> IdempotencyGuard<S, L>
where
    S: SettlementLogRepository,
    L: LedgerRepository,
{
    #[must_use]
    pub fn new(log_repo: S, ledger_repo: L) -> Self {
        Self {
            log_repo,
            ledger_repo,
        }
    }

    /// A period is settled once a successful settlement log row exists.
    pub async fn already_settled(&self, period: &PeriodId) -> Result<bool, SettlementStoreError> {
        self.log_repo.has_success_log(period).await
    }

    /// A period is rebated once any rebate ledger entry exists for it.
    pub async fn already_rebated(&self, period: &PeriodId) -> Result<bool, SettlementStoreError> {
        self.ledger_repo.has_rebate_entries(period).await
    }
}
