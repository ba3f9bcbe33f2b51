pub mod distributor;
pub mod plan;
pub mod port;

pub use distributor::{RebateDistributor, RebateError, RebateOutcome};
pub use plan::{plan_for_member, MemberRebatePlan, RebateCredit, RebatePolicy};
pub use port::{HttpRebateCreditAdapter, RebateCreditPort, RebateCreditRequest};
