//! Session scoping
//!
//! Entering a session scope activates a [`SessionConfig`]; every intercepted
//! provider call issued inside the scope is captured against that config.
//! Outside any scope, intercepted clients behave exactly like the unwrapped
//! originals.

pub mod config;
pub mod context;

pub use config::{
    SessionConfig, SessionConfigBuilder, ServiceHandle, DEFAULT_AGENT_MODEL,
    DEFAULT_MEMORY_BLOCKS,
};
pub use context::{current, enter, scope, SessionGuard};
