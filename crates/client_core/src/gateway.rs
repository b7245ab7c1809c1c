//! Boundary to the remote reasoning services (tutor and evaluator).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::AgentId,
    protocol::{AgentReply, AgentRequest},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("agent gateway unreachable: {0}")]
    Transport(String),
    #[error("agent gateway returned HTTP {0}")]
    Status(u16),
    #[error("agent gateway response could not be decoded: {0}")]
    Decode(String),
}

#[async_trait]
pub trait AgentGateway: Send + Sync {
    async fn invoke(&self, prompt: &str, agent_id: &AgentId) -> Result<AgentReply, GatewayError>;
}

/// Posts `{ message, agent_id }` to a single HTTP endpoint.
pub struct HttpAgentGateway {
    http: Client,
    endpoint: Url,
}

impl HttpAgentGateway {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("invalid agent gateway url '{endpoint}'"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build agent gateway http client")?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl AgentGateway for HttpAgentGateway {
    async fn invoke(&self, prompt: &str, agent_id: &AgentId) -> Result<AgentReply, GatewayError> {
        let request_id = Uuid::new_v4();
        debug!(%request_id, agent = %agent_id, "invoking agent");

        let res = self
            .http
            .post(self.endpoint.clone())
            .header(REQUEST_ID_HEADER, request_id.to_string())
            .json(&AgentRequest {
                message: prompt.to_string(),
                agent_id: agent_id.clone(),
            })
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            warn!(%request_id, agent = %agent_id, status = status.as_u16(), "agent call rejected");
            return Err(GatewayError::Status(status.as_u16()));
        }

        let body = res
            .bytes()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let reply: AgentReply =
            serde_json::from_slice(&body).map_err(|err| GatewayError::Decode(err.to_string()))?;
        debug!(%request_id, success = reply.success, "agent replied");
        Ok(reply)
    }
}

/// Gateway for sessions started without a reasoning service.
pub struct MissingAgentGateway;

#[async_trait]
impl AgentGateway for MissingAgentGateway {
    async fn invoke(&self, _prompt: &str, agent_id: &AgentId) -> Result<AgentReply, GatewayError> {
        Err(GatewayError::Transport(format!(
            "no agent gateway configured for agent {agent_id}"
        )))
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
