//! Session context store
//!
//! Holds the active [`SessionConfig`] for the current logical call tree.
//! Propagation follows causal lineage, not wall-clock overlap:
//!
//! - Synchronous code enters a scope with [`enter`] (or
//!   [`SessionConfig::enter`]); the config is pushed onto a thread-local
//!   stack and popped when the returned guard drops. Independent worker
//!   threads never observe each other's scopes.
//! - Async code wraps a future with [`scope`]; the config rides a tokio
//!   task-local, so it stays visible across every suspension point of that
//!   future and is invisible to unrelated concurrent tasks.
//!
//! Scopes nest; exiting an inner scope restores the exact outer value,
//! including "no active scope".

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use super::config::SessionConfig;

thread_local! {
    static SYNC_STACK: RefCell<Vec<Arc<SessionConfig>>> = RefCell::new(Vec::new());
}

tokio::task_local! {
    static TASK_SESSION: Arc<SessionConfig>;
}

/// Get the currently active session config, if any.
///
/// Checks the async task-local first, then the thread-local stack. Returns
/// `None` outside any scope; callers treat that as "behave as if the SDK
/// were not installed".
pub fn current() -> Option<Arc<SessionConfig>> {
    if let Ok(config) = TASK_SESSION.try_with(|c| c.clone()) {
        return Some(config);
    }
    SYNC_STACK.with(|stack| stack.borrow().last().cloned())
}

/// Enter a synchronous session scope on the current thread.
///
/// Dropping the returned guard restores whatever config was active before
/// entry. Guards must be dropped in reverse entry order; holding them across
/// `.await` points is not supported (use [`scope`] for async code).
pub fn enter(config: Arc<SessionConfig>) -> SessionGuard {
    SYNC_STACK.with(|stack| stack.borrow_mut().push(config));
    SessionGuard {
        _not_send: PhantomData,
    }
}

/// Run a future inside an async session scope.
///
/// The config is visible to `current()` from anywhere inside `fut`,
/// including after suspension points, and is restored (shadow-popped) when
/// the future completes. Nested calls shadow the outer config.
pub async fn scope<F>(config: Arc<SessionConfig>, fut: F) -> F::Output
where
    F: Future,
{
    TASK_SESSION.scope(config, fut).await
}

/// RAII guard for a synchronous session scope.
///
/// Pops the thread-local stack on drop, restoring the prior config.
pub struct SessionGuard {
    // Pinned to the entering thread; popping from another thread would
    // corrupt that thread's stack.
    _not_send: PhantomData<*const ()>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        SYNC_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
