//! Message capture and listing

use serde_json::Value;

use super::types::CapturePayload;
use super::{bearer_token, AsyncRecallClient, RecallClient};
use crate::core::{RecallError, RecallResult};

impl AsyncRecallClient {
    /// Submit a captured turn to the agent's capture endpoint.
    pub async fn capture_turn(&self, agent_id: &str, payload: &CapturePayload) -> RecallResult<()> {
        let url = format!("{}/v1/agents/{}/messages/capture", self.base_url(), agent_id);
        tracing::debug!(agent_id, provider = %payload.provider, "capturing turn");

        let mut request = self.http.post(&url).json(payload);
        if let Some(token) = bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RecallError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// List an agent's message history, paginated by message-id cursors.
    pub async fn list_messages(
        &self,
        agent_id: &str,
        before: Option<&str>,
        after: Option<&str>,
        limit: u32,
    ) -> RecallResult<Vec<Value>> {
        let url = format!("{}/v1/agents/{}/messages", self.base_url(), agent_id);

        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let mut request = self.http.get(&url).query(&query);
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
    /// Submit a captured turn to the agent's capture endpoint.
    pub fn capture_turn(&self, agent_id: &str, payload: &CapturePayload) -> RecallResult<()> {
        let url = format!("{}/v1/agents/{}/messages/capture", self.base_url(), agent_id);
        tracing::debug!(agent_id, provider = %payload.provider, "capturing turn");

        let mut request = self.http.post(&url).json(payload);
        if let Some(token) = bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(RecallError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// List an agent's message history, paginated by message-id cursors.
    pub fn list_messages(
        &self,
        agent_id: &str,
        before: Option<&str>,
        after: Option<&str>,
        limit: u32,
    ) -> RecallResult<Vec<Value>> {
        let url = format!("{}/v1/agents/{}/messages", self.base_url(), agent_id);

        let mut query: Vec<(&str, String)> = vec![("limit", limit.to_string())];
        if let Some(before) = before {
            query.push(("before", before.to_string()));
        }
        if let Some(after) = after {
            query.push(("after", after.to_string()));
        }

        let mut request = self.http.get(&url).query(&query);
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
