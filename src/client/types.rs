//! Wire types for the remote memory service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::interceptors::{Provider, TurnMessage};

/// A remote agent record.
///
/// Only the fields this SDK needs; the service may return more.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// Opaque agent identifier assigned by the service
    pub id: String,

    /// Agent name used for resolution
    pub name: String,

    /// When the agent was created (if the service reports it)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request body for `POST /v1/agents`
#[derive(Debug, Clone, Serialize)]
pub struct CreateAgentRequest {
    /// Agent name
    pub name: String,

    /// Memory blocks to provision
    pub memory_blocks: Vec<String>,

    /// Model the remote agent should use
    pub model: String,
}

/// Request body for `POST /v1/agents/{id}/messages/capture`
#[derive(Debug, Clone, Serialize)]
pub struct CapturePayload {
    /// Provider that produced the turn
    pub provider: Provider,

    /// Ordered request messages
    pub request_messages: Vec<TurnMessage>,

    /// Normalized response payload
    pub response_dict: Value,

    /// Model that produced the response
    pub model: String,
}
