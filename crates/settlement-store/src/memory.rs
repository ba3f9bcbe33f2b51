use async_trait::async_trait;
use chrono::Utc;
use lottery_domain::{BetId, PeriodId};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::records::{
    BetRecord, LedgerEntryInsert, LedgerEntryRecord, MemberStakeTotal, PeriodLockRecord,
    SettlementCommit, SettlementLogInsert, SettlementLogRecord, SettlementLogStatus,
};
use crate::repo::{
    BetRepository, LedgerRepository, PeriodLockRepository, SettlementLogRepository,
    SettlementStoreError,
};

#[derive(Debug, Default)]
struct Inner {
    bets: HashMap<BetId, BetRecord>,
    claimed: HashSet<BetId>,
    balances: HashMap<String, Decimal>,
    ledger: Vec<LedgerEntryRecord>,
    logs: Vec<SettlementLogRecord>,
    locks: HashMap<String, PeriodLockRecord>,
}

impl Inner {
    fn append_entries(&mut self, entries: &[LedgerEntryInsert]) -> Vec<LedgerEntryRecord> {
        let now = Utc::now();
        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let key = entry.actor.account_key();
            let balance_before = self.balances.get(&key).copied().unwrap_or(Decimal::ZERO);
            let balance_after = balance_before + entry.amount;
            self.balances.insert(key, balance_after);
            let record = LedgerEntryRecord {
                actor: entry.actor.clone(),
                kind: entry.kind,
                amount: entry.amount,
                balance_before,
                balance_after,
                reason: entry.reason.clone(),
                period: entry.period.clone(),
                trace_id: entry.trace_id,
                created_at: now,
            };
            self.ledger.push(record.clone());
            records.push(record);
        }
        records
    }

    fn has_success_log(&self, period: &PeriodId) -> bool {
        self.logs
            .iter()
            .any(|log| log.period == *period && log.status == SettlementLogStatus::Success)
    }

    fn push_log(&mut self, log: &SettlementLogInsert) {
        self.logs.push(SettlementLogRecord {
            period: log.period.clone(),
            status: log.status,
            settled_count: log.settled_count,
            won_count: log.won_count,
            total_payout: log.total_payout,
            execution_ms: log.execution_ms,
            odds_table_version: log.odds_table_version,
            details: log.details.clone(),
            created_at: Utc::now(),
        });
    }
}

/// One shared mutex models the database: every operation that holds the
/// guard is a transaction.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBettingStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryBettingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, SettlementStoreError> {
        self.inner
            .lock()
            .map_err(|_| SettlementStoreError::LockPoisoned)
    }

    pub fn bet(&self, bet_id: BetId) -> Result<Option<BetRecord>, SettlementStoreError> {
        Ok(self.lock()?.bets.get(&bet_id).cloned())
    }

    pub fn balance(&self, account_key: &str) -> Result<Decimal, SettlementStoreError> {
        Ok(self
            .lock()?
            .balances
            .get(account_key)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    pub fn entries_snapshot(&self) -> Result<Vec<LedgerEntryRecord>, SettlementStoreError> {
        Ok(self.lock()?.ledger.clone())
    }

    pub fn logs_snapshot(&self) -> Result<Vec<SettlementLogRecord>, SettlementStoreError> {
        Ok(self.lock()?.logs.clone())
    }
}

#[async_trait]
impl BetRepository for InMemoryBettingStore {
    async fn insert_bet(&self, bet: BetRecord) -> Result<(), SettlementStoreError> {
        self.lock()?.bets.insert(bet.bet_id, bet);
        Ok(())
    }

    async fn claim_unsettled_bets(
        &self,
        period: &PeriodId,
    ) -> Result<Vec<BetRecord>, SettlementStoreError> {
        let mut inner = self.lock()?;
        let mut claimed: Vec<BetRecord> = inner
            .bets
            .values()
            .filter(|bet| bet.period == *period && !bet.settled)
            .filter(|bet| !inner.claimed.contains(&bet.bet_id))
            .cloned()
            .collect();
        claimed.sort_by(|a, b| {
            a.placed_at
                .cmp(&b.placed_at)
                .then_with(|| a.bet_id.0.cmp(&b.bet_id.0))
        });
        for bet in &claimed {
            inner.claimed.insert(bet.bet_id);
        }
        Ok(claimed)
    }

    async fn release_claims(&self, period: &PeriodId) -> Result<(), SettlementStoreError> {
        let mut inner = self.lock()?;
        let in_period: HashSet<BetId> = inner
            .bets
            .values()
            .filter(|bet| bet.period == *period)
            .map(|bet| bet.bet_id)
            .collect();
        inner.claimed.retain(|bet_id| !in_period.contains(bet_id));
        Ok(())
    }

    async fn has_settled_bets(&self, period: &PeriodId) -> Result<bool, SettlementStoreError> {
        Ok(self
            .lock()?
            .bets
            .values()
            .any(|bet| bet.period == *period && bet.settled))
    }

    async fn settled_stakes_by_member(
        &self,
        period: &PeriodId,
    ) -> Result<Vec<MemberStakeTotal>, SettlementStoreError> {
        let inner = self.lock()?;
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for bet in inner.bets.values() {
            if bet.period == *period && bet.settled {
                *totals
                    .entry(bet.member_username.clone())
                    .or_insert(Decimal::ZERO) += bet.stake;
            }
        }
        Ok(totals
            .into_iter()
            .map(|(member_username, total_stake)| MemberStakeTotal {
                member_username,
                total_stake,
            })
            .collect())
    }

    async fn commit_settlement(
        &self,
        commit: &SettlementCommit,
    ) -> Result<(), SettlementStoreError> {
        let mut inner = self.lock()?;

        // Validate everything before touching any row.
        if inner.has_success_log(&commit.period) {
            return Err(SettlementStoreError::DuplicateSettlementLog(
                commit.period.clone(),
            ));
        }
        for update in &commit.bet_updates {
            let bet = inner
                .bets
                .get(&update.bet_id)
                .ok_or(SettlementStoreError::BetNotFound(update.bet_id))?;
            if bet.settled {
                return Err(SettlementStoreError::BetAlreadySettled(update.bet_id));
            }
            if !inner.claimed.contains(&update.bet_id) {
                return Err(SettlementStoreError::BetNotClaimed(update.bet_id));
            }
        }

        for update in &commit.bet_updates {
            if let Some(bet) = inner.bets.get_mut(&update.bet_id) {
                bet.settled = true;
                bet.won = Some(update.won);
                bet.payout = Some(update.payout);
                bet.settled_at = Some(update.settled_at);
            }
            inner.claimed.remove(&update.bet_id);
        }
        inner.append_entries(&commit.credits);
        inner.push_log(&commit.log);
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for InMemoryBettingStore {
    async fn insert_entries(
        &self,
        entries: &[LedgerEntryInsert],
    ) -> Result<Vec<LedgerEntryRecord>, SettlementStoreError> {
        Ok(self.lock()?.append_entries(entries))
    }

    async fn has_rebate_entries(&self, period: &PeriodId) -> Result<bool, SettlementStoreError> {
        Ok(self.lock()?.ledger.iter().any(|entry| {
            entry.period == *period && entry.kind == crate::records::LedgerEntryKind::Rebate
        }))
    }
}

#[async_trait]
impl SettlementLogRepository for InMemoryBettingStore {
    async fn has_success_log(&self, period: &PeriodId) -> Result<bool, SettlementStoreError> {
        Ok(self.lock()?.has_success_log(period))
    }

    async fn insert_log(&self, log: &SettlementLogInsert) -> Result<(), SettlementStoreError> {
        let mut inner = self.lock()?;
        if log.status == SettlementLogStatus::Success && inner.has_success_log(&log.period) {
            return Err(SettlementStoreError::DuplicateSettlementLog(
                log.period.clone(),
            ));
        }
        inner.push_log(log);
        Ok(())
    }
}

#[async_trait]
impl PeriodLockRepository for InMemoryBettingStore {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool, SettlementStoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SettlementStoreError::Backend(e.to_string()))?;
        let now = Utc::now();
        let mut inner = self.lock()?;
        if let Some(existing) = inner.locks.get(key) {
            if existing.expires_at > now {
                return Ok(false);
            }
        }
        inner.locks.insert(
            key.to_string(),
            PeriodLockRecord {
                key: key.to_string(),
                acquired_at: now,
                expires_at: now + ttl,
            },
        );
        Ok(true)
    }

    async fn release(&self, key: &str) -> Result<(), SettlementStoreError> {
        self.lock()?.locks.remove(key);
        Ok(())
    }
}
