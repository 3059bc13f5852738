//! Interceptor registry
//!
//! Tracks which interceptors exist and which are installed. Installation
//! does not mutate third-party state: it flips a per-provider flag that
//! every wrapped client shares, so capture can be enabled and disabled for
//! clients that already exist. Uninstalling restores exactly the original
//! (pass-through) behavior.
//!
//! `install`/`uninstall_all` are setup/teardown operations, expected to run
//! once each per process; they are not designed for concurrent use against
//! each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::wrapped::{
    BlockingCapturingClient, BlockingProviderClient, CapturingClient, ProviderClient,
};
use super::{
    AnthropicInterceptor, ClaudeInterceptor, GeminiInterceptor, Interceptor, OpenAiInterceptor,
    Provider,
};
use crate::core::{RecallError, RecallResult};

struct Entry {
    interceptor: Arc<dyn Interceptor>,
    installed: Arc<AtomicBool>,
}

#[derive(Default)]
struct RegistryState {
    entries: HashMap<Provider, Entry>,
    registration_order: Vec<Provider>,
    install_order: Vec<Provider>,
}

/// Outcome of an [`InterceptorRegistry::install`] pass.
///
/// A provider failing to install never blocks the others; failures are
/// collected here instead of raised.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Providers whose interceptor is installed after this pass
    pub installed: Vec<Provider>,
    /// Providers silently skipped because they are not available here
    pub skipped: Vec<Provider>,
    /// Providers whose installation failed, with the failure message
    pub failed: Vec<(Provider, String)>,
}

impl InstallReport {
    /// True when no provider failed to install
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Catalog of interceptors and their installed state.
#[derive(Default)]
pub struct InterceptorRegistry {
    state: Mutex<RegistryState>,
}

impl InterceptorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with all built-in interceptors registered
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(GeminiInterceptor::new()));
        registry.register(Arc::new(ClaudeInterceptor::new()));
        registry.register(Arc::new(AnthropicInterceptor::new()));
        registry.register(Arc::new(OpenAiInterceptor::new()));
        registry
    }

    /// Add an interceptor to the catalog. Does not install anything.
    ///
    /// Idempotent per provider: registering a provider twice keeps the first
    /// registration.
    pub fn register(&self, interceptor: Arc<dyn Interceptor>) {
        let provider = interceptor.provider();
        let mut state = self.lock();
        if state.entries.contains_key(&provider) {
            tracing::debug!(%provider, "interceptor already registered");
            return;
        }
        state.entries.insert(
            provider,
            Entry {
                interceptor,
                installed: Arc::new(AtomicBool::new(false)),
            },
        );
        state.registration_order.push(provider);
    }

    /// Providers currently in the catalog, in registration order
    pub fn registered(&self) -> Vec<Provider> {
        self.lock().registration_order.clone()
    }

    /// Whether a provider's interceptor is currently installed
    pub fn is_installed(&self, provider: Provider) -> bool {
        self.lock()
            .entries
            .get(&provider)
            .map(|e| e.installed.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Install every registered interceptor whose provider is available.
    ///
    /// Unavailable providers are silently skipped; a probe failure is
    /// recorded and the remaining providers still install. Installing an
    /// already-installed provider is a no-op.
    pub fn install(&self) -> InstallReport {
        let mut state = self.lock();
        let mut report = InstallReport::default();

        for provider in state.registration_order.clone() {
            let entry = match state.entries.get(&provider) {
                Some(entry) => entry,
                None => continue,
            };

            if entry.installed.load(Ordering::Relaxed) {
                report.installed.push(provider);
                continue;
            }

            match entry.interceptor.probe() {
                Ok(true) => {
                    entry.installed.store(true, Ordering::Relaxed);
                    if !state.install_order.contains(&provider) {
                        state.install_order.push(provider);
                    }
                    tracing::debug!(%provider, "interceptor installed");
                    report.installed.push(provider);
                }
                Ok(false) => {
                    tracing::debug!(%provider, "provider not available; skipping");
                    report.skipped.push(provider);
                }
                Err(err) => {
                    tracing::warn!(%provider, error = %err, "interceptor installation failed");
                    report.failed.push((provider, err.to_string()));
                }
            }
        }

        report
    }

    /// Revert every installed interceptor, in reverse installation order.
    pub fn uninstall_all(&self) {
        let mut state = self.lock();
        let order: Vec<Provider> = state.install_order.drain(..).rev().collect();
        for provider in order {
            if let Some(entry) = state.entries.get(&provider) {
                entry.installed.store(false, Ordering::Relaxed);
                tracing::debug!(%provider, "interceptor uninstalled");
            }
        }
    }

    /// Wrap an async provider client in a capturing decorator.
    ///
    /// The decorator shares this registry's installed flag: while the
    /// provider is uninstalled, calls pass through untouched.
    pub fn wrap(
        &self,
        provider: Provider,
        inner: Arc<dyn ProviderClient>,
    ) -> RecallResult<CapturingClient> {
        let state = self.lock();
        let entry = state
            .entries
            .get(&provider)
            .ok_or(RecallError::NotRegistered(provider))?;
        Ok(CapturingClient::new(
            inner,
            entry.interceptor.clone(),
            entry.installed.clone(),
        ))
    }

    /// Wrap a blocking provider client in a capturing decorator.
    pub fn wrap_blocking(
        &self,
        provider: Provider,
        inner: Arc<dyn BlockingProviderClient>,
    ) -> RecallResult<BlockingCapturingClient> {
        let state = self.lock();
        let entry = state
            .entries
            .get(&provider)
            .ok_or(RecallError::NotRegistered(provider))?;
        Ok(BlockingCapturingClient::new(
            inner,
            entry.interceptor.clone(),
            entry.installed.clone(),
        ))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
