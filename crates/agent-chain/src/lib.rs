use async_trait::async_trait;
use lottery_domain::AgentId;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Upper bound on agent hierarchy depth. Chains longer than this indicate
/// corrupt parent links and abort resolution.
pub const MAX_CHAIN_DEPTH: usize = 10;

#[derive(Debug, Error)]
pub enum AgentChainError {
    #[error("directory lock poisoned")]
    LockPoisoned,
    #[error("agent {0:?} referenced as parent but not found")]
    AgentNotFound(AgentId),
    #[error("agent chain for member {0} contains a cycle")]
    CycleDetected(String),
    #[error("agent chain for member {member} exceeds {MAX_CHAIN_DEPTH} levels")]
    DepthExceeded { member: String },
    #[error("transport error: {0}")]
    Transport(String),
}

/// Commission market an agent trades under. Determines the rebate pool rate
/// applied to member turnover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketType {
    A,
    D,
}

impl MarketType {
    /// Fraction of settled stake that forms the rebate pool.
    #[must_use]
    pub fn market_rate(self) -> Decimal {
        match self {
            Self::A => dec!(0.011),
            Self::D => dec!(0.041),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentChainNode {
    pub agent_id: AgentId,
    pub username: String,
    /// `None` marks the top of the hierarchy.
    pub parent_id: Option<AgentId>,
    /// Configured rebate percentage in 0..=1.
    pub rebate_pct: Decimal,
    pub market_type: MarketType,
}

/// Resolves a member's agent hierarchy bottom-up: direct agent first, top
/// agent last. A member without an agent resolves to an empty chain.
#[async_trait]
pub trait AgentChainResolver: Send + Sync {
    async fn resolve_chain(
        &self,
        member_username: &str,
    ) -> Result<Vec<AgentChainNode>, AgentChainError>;
}

#[derive(Debug, Default)]
struct DirectoryInner {
    agents: HashMap<AgentId, AgentChainNode>,
    direct_agent_by_member: HashMap<String, AgentId>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAgentDirectory {
    inner: Arc<Mutex<DirectoryInner>>,
}

impl InMemoryAgentDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_agent(&self, node: AgentChainNode) -> Result<(), AgentChainError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| AgentChainError::LockPoisoned)?;
        inner.agents.insert(node.agent_id, node);
        Ok(())
    }

    pub fn assign_member(
        &self,
        member_username: impl Into<String>,
        agent_id: AgentId,
    ) -> Result<(), AgentChainError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| AgentChainError::LockPoisoned)?;
        inner
            .direct_agent_by_member
            .insert(member_username.into(), agent_id);
        Ok(())
    }
}

#[async_trait]
impl AgentChainResolver for InMemoryAgentDirectory {
    async fn resolve_chain(
        &self,
        member_username: &str,
    ) -> Result<Vec<AgentChainNode>, AgentChainError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| AgentChainError::LockPoisoned)?;
        let Some(&direct) = inner.direct_agent_by_member.get(member_username) else {
            return Ok(Vec::new());
        };

        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        let mut cursor = Some(direct);
        while let Some(agent_id) = cursor {
            if !visited.insert(agent_id) {
                return Err(AgentChainError::CycleDetected(member_username.to_string()));
            }
            if chain.len() >= MAX_CHAIN_DEPTH {
                return Err(AgentChainError::DepthExceeded {
                    member: member_username.to_string(),
                });
            }
            let node = inner
                .agents
                .get(&agent_id)
                .ok_or(AgentChainError::AgentNotFound(agent_id))?;
            chain.push(node.clone());
            cursor = node.parent_id;
        }
        Ok(chain)
    }
}

/// Agent directory lookup against the agent-management service.
#[derive(Debug, Clone)]
pub struct HttpAgentChainResolver {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAgentChainResolver {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChainNode {
    agent_id: AgentId,
    username: String,
    parent_id: Option<AgentId>,
    rebate_percentage: Decimal,
    market_type: MarketType,
}

#[async_trait]
impl AgentChainResolver for HttpAgentChainResolver {
    async fn resolve_chain(
        &self,
        member_username: &str,
    ) -> Result<Vec<AgentChainNode>, AgentChainError> {
        let url = format!("{}/agents/chain", self.base_url);
        let nodes: Vec<WireChainNode> = self
            .client
            .get(url)
            .query(&[("member", member_username)])
            .send()
            .await
            .map_err(|e| AgentChainError::Transport(e.to_string()))?
            .error_for_status()
            .map_err(|e| AgentChainError::Transport(e.to_string()))?
            .json()
            .await
            .map_err(|e| AgentChainError::Transport(e.to_string()))?;

        if nodes.len() > MAX_CHAIN_DEPTH {
            return Err(AgentChainError::DepthExceeded {
                member: member_username.to_string(),
            });
        }
        Ok(nodes
            .into_iter()
            .map(|node| AgentChainNode {
                agent_id: node.agent_id,
                username: node.username,
                parent_id: node.parent_id,
                rebate_pct: node.rebate_percentage,
                market_type: node.market_type,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(username: &str, parent_id: Option<AgentId>, rebate_pct: Decimal) -> AgentChainNode {
        AgentChainNode {
            agent_id: AgentId::new(),
            username: username.to_string(),
            parent_id,
            rebate_pct,
            market_type: MarketType::D,
        }
    }

    #[tokio::test]
    async fn resolves_bottom_up_to_the_top_agent() {
        let directory = InMemoryAgentDirectory::new();
        let top = agent("top", None, dec!(0.041));
        let mid = agent("mid", Some(top.agent_id), dec!(0.02));
        let direct = agent("direct", Some(mid.agent_id), dec!(0.01));
        for node in [&top, &mid, &direct] {
            directory.upsert_agent((*node).clone()).expect("upsert");
        }
        directory
            .assign_member("alice", direct.agent_id)
            .expect("assign");

        let chain = directory.resolve_chain("alice").await.expect("chain");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].username, "direct");
        assert_eq!(chain[2].username, "top");
        assert_eq!(chain[2].parent_id, None);
    }

    #[tokio::test]
    async fn member_without_an_agent_has_an_empty_chain() {
        let directory = InMemoryAgentDirectory::new();
        let chain = directory.resolve_chain("loner").await.expect("chain");
        assert!(chain.is_empty());
    }

    #[tokio::test]
    async fn cyclic_parent_links_are_detected() {
        let directory = InMemoryAgentDirectory::new();
        let a_id = AgentId::new();
        let b_id = AgentId::new();
        directory
            .upsert_agent(AgentChainNode {
                agent_id: a_id,
                username: "a".to_string(),
                parent_id: Some(b_id),
                rebate_pct: dec!(0.01),
                market_type: MarketType::D,
            })
            .expect("upsert");
        directory
            .upsert_agent(AgentChainNode {
                agent_id: b_id,
                username: "b".to_string(),
                parent_id: Some(a_id),
                rebate_pct: dec!(0.02),
                market_type: MarketType::D,
            })
            .expect("upsert");
        directory.assign_member("alice", a_id).expect("assign");

        let err = directory.resolve_chain("alice").await.expect_err("cycle");
        assert!(matches!(err, AgentChainError::CycleDetected(_)));
    }

    #[tokio::test]
    async fn chains_deeper_than_the_bound_are_rejected() {
        let directory = InMemoryAgentDirectory::new();
        let mut parent: Option<AgentId> = None;
        let mut bottom = AgentId::new();
        for level in 0..(MAX_CHAIN_DEPTH + 1) {
            let node = AgentChainNode {
                agent_id: AgentId::new(),
                username: format!("agent{level}"),
                parent_id: parent,
                rebate_pct: dec!(0.001),
                market_type: MarketType::A,
            };
            bottom = node.agent_id;
            parent = Some(node.agent_id);
            directory.upsert_agent(node).expect("upsert");
        }
        directory.assign_member("alice", bottom).expect("assign");

        let err = directory.resolve_chain("alice").await.expect_err("depth");
        assert!(matches!(err, AgentChainError::DepthExceeded { .. }));
    }

    #[test]
    fn market_rates_match_the_commission_schedule() {
        assert_eq!(MarketType::A.market_rate(), dec!(0.011));
        assert_eq!(MarketType::D.market_rate(), dec!(0.041));
    }
}
