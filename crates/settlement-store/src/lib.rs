pub mod memory;
pub mod records;
pub mod repo;

pub use memory::InMemoryBettingStore;
pub use records::{
    BetRecord, BetSettlementUpdate, LedgerActor, LedgerEntryInsert, LedgerEntryKind,
    LedgerEntryRecord, MemberStakeTotal, PeriodLockRecord, SettlementCommit, SettlementLogInsert,
    SettlementLogRecord, SettlementLogStatus,
};
pub use repo::{
    BetRepository, LedgerRepository, PeriodLockRepository, SettlementLogRepository,
    SettlementStoreError,
};
