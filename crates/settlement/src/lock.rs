use lottery_domain::PeriodId;
use settlement_store::{PeriodLockRepository, SettlementStoreError};
use std::time::Duration;
use tracing::info;

/// Lock key for a period's settlement run.
#[must_use]
pub fn settlement_lock_key(period: &PeriodId) -> String {
    format!("settle_period_{period}")
}

/// Period-scoped mutual exclusion over a `PeriodLockRepository`. The TTL is
/// a crash backstop; a healthy run always releases explicitly.
pub struct LockManager<P> {
    repo: P,
    ttl: Duration,
}

impl<P> LockManager<P>
where
    P: PeriodLockRepository,
{
    #[must_use]
    pub fn new(repo: P, ttl: Duration) -> Self {
        Self { repo, ttl }
    }

    pub async fn acquire(&self, period: &PeriodId) -> Result<bool, SettlementStoreError> {
        let acquired = self
            .repo
            .try_acquire(&settlement_lock_key(period), self.ttl)
            .await?;
        if !acquired {
            info!(period = %period, "settlement lock held elsewhere");
        }
        Ok(acquired)
    }

    pub async fn release(&self, period: &PeriodId) -> Result<(), SettlementStoreError> {
        self.repo.release(&settlement_lock_key(period)).await
    }
}
