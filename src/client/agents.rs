//! Agent resolution and creation
//!
//! Agents are addressed by name. Resolution is a `GET /v1/agents?name=`
//! lookup; the service answers 404 when no agent has that name. Creation is
//! not idempotent at this layer: concurrent first use of the same name can
//! create the agent twice, and the service is the source of truth for which
//! record wins.

use reqwest::StatusCode;

use super::types::{AgentState, CreateAgentRequest};
use super::{bearer_token, AsyncRecallClient, RecallClient};
use crate::core::{RecallError, RecallResult};

impl AsyncRecallClient {
    /// Resolve an agent by name. Returns `None` when the service has no
    /// agent with that name.
    pub async fn get_agent_by_name(&self, name: &str) -> RecallResult<Option<AgentState>> {
        let url = format!("{}/v1/agents", self.base_url());
        tracing::debug!(name, "resolving agent by name");

        let mut request = self.http.get(&url).query(&[("name", name)]);
        if let Some(token) = bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RecallError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Create an agent with the given memory blocks and model hint.
    pub async fn create_agent(
        &self,
        name: &str,
        memory_blocks: &[String],
        model: &str,
    ) -> RecallResult<AgentState> {
        let url = format!("{}/v1/agents", self.base_url());
        tracing::debug!(name, model, "creating agent");

        let payload = CreateAgentRequest {
            name: name.to_string(),
            memory_blocks: memory_blocks.to_vec(),
            model: model.to_string(),
        };

        let mut request = self.http.post(&url).json(&payload);
        if let Some(token) = bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RecallError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl RecallClient {
    /// Resolve an agent by name. Returns `None` when the service has no
    /// agent with that name.
    pub fn get_agent_by_name(&self, name: &str) -> RecallResult<Option<AgentState>> {
        let url = format!("{}/v1/agents", self.base_url());
        tracing::debug!(name, "resolving agent by name");

        let mut request = self.http.get(&url).query(&[("name", name)]);
        if let Some(token) = bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(RecallError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Create an agent with the given memory blocks and model hint.
    pub fn create_agent(
        &self,
        name: &str,
        memory_blocks: &[String],
        model: &str,
    ) -> RecallResult<AgentState> {
        let url = format!("{}/v1/agents", self.base_url());
        tracing::debug!(name, model, "creating agent");

        let payload = CreateAgentRequest {
            name: name.to_string(),
            memory_blocks: memory_blocks.to_vec(),
            model: model.to_string(),
        };

        let mut request = self.http.post(&url).json(&payload);
        if let Some(token) = bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            return Err(RecallError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
