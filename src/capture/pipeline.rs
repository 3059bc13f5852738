//! Turn persistence pipeline
//!
//! Takes a [`CapturedTurn`] and pushes it to the remote service: resolve the
//! session's agent by name, create it on first use, then POST the capture
//! payload. Every step is best-effort: a failure is logged and counted, but
//! never raised into the caller's control flow. The capture side channel
//! must be invisible when it fails.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::client::{AgentState, CapturePayload};
use crate::core::{RecallError, RecallResult};
use crate::interceptors::CapturedTurn;
use crate::session::{self, ServiceHandle, SessionConfig};

/// Process-wide persistence counters.
///
/// Dropped turns are observable only out-of-band; these counters are that
/// band. `attempted == persisted + failed` once all in-flight work settles.
#[derive(Debug)]
pub struct CaptureStats {
    attempted: AtomicU64,
    persisted: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of [`CaptureStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStatsSnapshot {
    pub attempted: u64,
    pub persisted: u64,
    pub failed: u64,
}

impl CaptureStats {
    const fn new() -> Self {
        Self {
            attempted: AtomicU64::new(0),
            persisted: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Read the current counter values
    pub fn snapshot(&self) -> CaptureStatsSnapshot {
        CaptureStatsSnapshot {
            attempted: self.attempted.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

static STATS: CaptureStats = CaptureStats::new();

/// Process-wide persistence counters
pub fn stats() -> &'static CaptureStats {
    &STATS
}

/// Persist a turn against the currently active session, if any.
///
/// No active session is a silent no-op, not an error.
pub async fn persist_turn(turn: CapturedTurn) {
    let Some(config) = session::current() else {
        return;
    };
    persist_with_config(&config, turn).await;
}

/// Persist a turn against an explicit session config.
///
/// The wrappers capture the config at call-issue time and use this entry
/// point, so a scope exited by an unrelated overlapping task cannot redirect
/// the turn.
pub async fn persist_with_config(config: &SessionConfig, turn: CapturedTurn) {
    STATS.attempted.fetch_add(1, Ordering::Relaxed);
    let provider = turn.provider;
    match try_persist(config, turn).await {
        Ok(()) => {
            STATS.persisted.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            STATS.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                agent = %config.agent_name,
                %provider,
                error = %err,
                "turn capture failed; dropping turn"
            );
        }
    }
}

async fn try_persist(config: &SessionConfig, turn: CapturedTurn) -> RecallResult<()> {
    let ServiceHandle::Async(client) = &config.client else {
        return Err(RecallError::HandleMismatch {
            expected: "async",
            found: "blocking",
        });
    };

    // Re-resolved every turn; no local cache to go stale.
    let agent: AgentState = match client.get_agent_by_name(&config.agent_name).await? {
        Some(agent) => agent,
        None => {
            client
                .create_agent(&config.agent_name, &config.memory, &config.model)
                .await?
        }
    };

    let payload = CapturePayload {
        provider: turn.provider,
        request_messages: turn.request_messages,
        response_dict: turn.response_dict,
        model: turn.model,
    };
    client.capture_turn(&agent.id, &payload).await
}

/// Blocking variant of [`persist_turn`]
pub fn persist_turn_blocking(turn: CapturedTurn) {
    let Some(config) = session::current() else {
        return;
    };
    persist_with_config_blocking(&config, turn);
}

/// Blocking variant of [`persist_with_config`]
pub fn persist_with_config_blocking(config: &SessionConfig, turn: CapturedTurn) {
    STATS.attempted.fetch_add(1, Ordering::Relaxed);
    let provider = turn.provider;
    match try_persist_blocking(config, turn) {
        Ok(()) => {
            STATS.persisted.fetch_add(1, Ordering::Relaxed);
        }
        Err(err) => {
            STATS.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                agent = %config.agent_name,
                %provider,
                error = %err,
                "turn capture failed; dropping turn"
            );
        }
    }
}

fn try_persist_blocking(config: &SessionConfig, turn: CapturedTurn) -> RecallResult<()> {
    let ServiceHandle::Blocking(client) = &config.client else {
        return Err(RecallError::HandleMismatch {
            expected: "blocking",
            found: "async",
        });
    };

    let agent: AgentState = match client.get_agent_by_name(&config.agent_name)? {
        Some(agent) => agent,
        None => client.create_agent(&config.agent_name, &config.memory, &config.model)?,
    };

    let payload = CapturePayload {
        provider: turn.provider,
        request_messages: turn.request_messages,
        response_dict: turn.response_dict,
        model: turn.model,
    };
    client.capture_turn(&agent.id, &payload)
}

/// Handoff point between the capturing wrappers and the pipeline.
///
/// `submit` is synchronous and must not block on network work; production
/// sinks schedule the actual persistence. Tests substitute recording spies.
pub trait CaptureSink: Send + Sync {
    /// Accept a turn captured under the given session config
    fn submit(&self, config: Arc<SessionConfig>, turn: CapturedTurn);
}

/// Production sink for async call trees: spawns the persistence task on the
/// current tokio runtime.
pub struct PipelineSink;

impl CaptureSink for PipelineSink {
    fn submit(&self, config: Arc<SessionConfig>, turn: CapturedTurn) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    persist_with_config(&config, turn).await;
                });
            }
            Err(_) => {
                STATS.attempted.fetch_add(1, Ordering::Relaxed);
                STATS.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    agent = %config.agent_name,
                    "no tokio runtime available; dropping captured turn"
                );
            }
        }
    }
}

/// Production sink for synchronous call trees: persists inline through the
/// blocking client.
pub struct BlockingPipelineSink;

impl CaptureSink for BlockingPipelineSink {
    fn submit(&self, config: Arc<SessionConfig>, turn: CapturedTurn) {
        persist_with_config_blocking(&config, turn);
    }
}
