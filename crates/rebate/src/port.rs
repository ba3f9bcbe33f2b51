use async_trait::async_trait;
use lottery_domain::{AgentId, PeriodId};
use rust_decimal::Decimal;
use serde::Serialize;

/// One credit instruction for the agent-balance subsystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RebateCreditRequest {
    pub agent_id: AgentId,
    pub amount: Decimal,
    pub member_username: String,
    pub period: PeriodId,
    pub reason: String,
}

/// Pushes rebate credits to wherever agent balances live. Settlement only
/// mirrors the credit in its own ledger.
#[async_trait]
pub trait RebateCreditPort: Send + Sync {
    async fn credit(&self, request: &RebateCreditRequest) -> Result<(), String>;
}

/// HTTP adapter for the agent-management service.
#[derive(Debug, Clone)]
pub struct HttpRebateCreditAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRebateCreditAdapter {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl RebateCreditPort for HttpRebateCreditAdapter {
    async fn credit(&self, request: &RebateCreditRequest) -> Result<(), String> {
        let url = format!("{}/agents/credits", self.base_url);
        self.client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| e.to_string())?
            .error_for_status()
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
