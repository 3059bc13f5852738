//! Side-channel capture of LLM provider calls.
//!
//! Wrap a provider client in a capturing decorator, open a session scope,
//! and every request/response exchange inside that scope is recorded to a
//! remote memory service, without changing what the provider returns.
//! Optionally, stored memory is injected back into outgoing prompts.
//!
//! ```no_run
//! use std::sync::Arc;
//! use recall_sdk::interceptors::{InterceptorRegistry, Provider, ProviderClient};
//! use recall_sdk::session::SessionConfig;
//!
//! # async fn run(anthropic: Arc<dyn ProviderClient>) -> anyhow::Result<()> {
//! let registry = InterceptorRegistry::with_defaults();
//! registry.install();
//!
//! let client = registry.wrap(Provider::Anthropic, anthropic)?;
//!
//! let session = SessionConfig::builder("my-agent").build()?;
//! recall_sdk::session::scope(session, async {
//!     // Calls through `client` here are captured.
//!     # let _ = &client;
//! })
//! .await;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod client;
pub mod core;
pub mod interceptors;
pub mod logging;
pub mod session;

pub use crate::capture::{stats, CaptureSink, CaptureStatsSnapshot};
pub use crate::client::{AsyncRecallClient, RecallClient};
pub use crate::core::{RecallError, RecallResult};
pub use crate::interceptors::{
    CapturedTurn, CapturingClient, Interceptor, InterceptorRegistry, Provider, ProviderClient,
    TurnMessage,
};
pub use crate::session::{ServiceHandle, SessionConfig};
