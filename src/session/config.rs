//! Session configuration
//!
//! A [`SessionConfig`] describes where captured turns go: which remote agent
//! records them, through which client, and whether stored memory is injected
//! back into outgoing prompts. One config is active per scope; see
//! [`super::context`] for scope mechanics.

use std::sync::{Arc, Mutex};

use crate::client::{AsyncRecallClient, RecallClient};
use crate::core::RecallResult;
use crate::interceptors::TurnMessage;
use crate::session::context::{self, SessionGuard};

/// Default memory blocks provisioned when a remote agent is created
pub const DEFAULT_MEMORY_BLOCKS: &[&str] = &["human"];

/// Default model hint used when a remote agent is created
pub const DEFAULT_AGENT_MODEL: &str = "anthropic/claude-sonnet-4-20250514";

/// Handle to the remote-service client carried by a session.
///
/// Sync call trees carry a blocking client; async call trees carry an async
/// one. The persistence pipeline checks the flavor at use time and treats a
/// mismatch as an ordinary (swallowed) capture failure.
#[derive(Clone)]
pub enum ServiceHandle {
    /// Blocking client for synchronous call trees
    Blocking(Arc<RecallClient>),
    /// Async client for tokio-driven call trees
    Async(Arc<AsyncRecallClient>),
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceHandle::Blocking(_) => f.write_str("ServiceHandle::Blocking"),
            ServiceHandle::Async(_) => f.write_str("ServiceHandle::Async"),
        }
    }
}

/// Capture/injection configuration for one session scope.
///
/// Immutable for the lifetime of the scope, apart from the pending-message
/// slot used to batch a user turn with its eventual assistant response.
#[derive(Debug)]
pub struct SessionConfig {
    /// Name of the remote agent that records this session's turns
    pub agent_name: String,

    /// Client used to reach the remote service
    pub client: ServiceHandle,

    /// When true, turns are recorded but no memory is injected into prompts
    pub capture_only: bool,

    /// Memory blocks provisioned if the remote agent has to be created
    pub memory: Vec<String>,

    /// Model hint used only when creating the remote agent
    pub model: String,

    pending_user_message: Mutex<Option<TurnMessage>>,
}

impl SessionConfig {
    /// Start building a config for the named remote agent
    pub fn builder(agent: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(agent)
    }

    /// Enter a synchronous session scope on the current thread.
    ///
    /// The returned guard restores the previously active config (possibly
    /// none) when dropped. Scopes nest.
    pub fn enter(self: &Arc<Self>) -> SessionGuard {
        context::enter(self.clone())
    }

    /// Stage a user message to be prepended to the next captured turn.
    ///
    /// Used by prompt-style providers whose requests carry only the newest
    /// prompt, so the user turn and the assistant response land together.
    pub fn buffer_user_message(&self, message: TurnMessage) {
        let mut slot = self
            .pending_user_message
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *slot = Some(message);
    }

    /// Take the staged user message, leaving the slot empty
    pub fn take_pending_user_message(&self) -> Option<TurnMessage> {
        self.pending_user_message
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
    }
}

/// Builder for [`SessionConfig`]
pub struct SessionConfigBuilder {
    agent_name: String,
    client: Option<ServiceHandle>,
    capture_only: bool,
    memory: Vec<String>,
    model: String,
}

impl SessionConfigBuilder {
    fn new(agent: impl Into<String>) -> Self {
        Self {
            agent_name: agent.into(),
            client: None,
            capture_only: false,
            memory: DEFAULT_MEMORY_BLOCKS.iter().map(|s| s.to_string()).collect(),
            model: DEFAULT_AGENT_MODEL.to_string(),
        }
    }

    /// Use a specific remote-service client
    pub fn client(mut self, client: ServiceHandle) -> Self {
        self.client = Some(client);
        self
    }

    /// Record turns without injecting memory into prompts
    pub fn capture_only(mut self, capture_only: bool) -> Self {
        self.capture_only = capture_only;
        self
    }

    /// Memory blocks to provision on agent creation
    pub fn memory(mut self, blocks: Vec<String>) -> Self {
        self.memory = blocks;
        self
    }

    /// Model hint for agent creation
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Build the config.
    ///
    /// If no client was supplied, a default async client is created from the
    /// environment.
    pub fn build(self) -> RecallResult<Arc<SessionConfig>> {
        let client = match self.client {
            Some(client) => client,
            None => ServiceHandle::Async(Arc::new(AsyncRecallClient::from_env()?)),
        };

        Ok(Arc::new(SessionConfig {
            agent_name: self.agent_name,
            client,
            capture_only: self.capture_only,
            memory: self.memory,
            model: self.model,
            pending_user_message: Mutex::new(None),
        }))
    }
}
