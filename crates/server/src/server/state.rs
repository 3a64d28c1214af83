//! Shared application state injected into every Axum handler.

use super::middleware::RateLimiter;
use crate::secret::SecretEngine;

/// Application state shared across all request handlers.
///
/// Both fields are `Arc`-backed, so Axum can clone the state per request.
#[derive(Clone)]
pub struct AppState {
    /// Secret lifecycle orchestration.
    pub engine: SecretEngine,
    /// Per-client request cap shared by every route.
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(engine: SecretEngine, rate_limiter: RateLimiter) -> Self {
        Self {
            engine,
            rate_limiter,
        }
    }
}

#[cfg(test)]
impl Default for AppState {
    /// In-memory store, system clock, and a 60/minute limit.
    fn default() -> Self {
        use std::sync::Arc;

        use crate::secret::SystemClock;
        use crate::store::MemorySecretStore;

        let engine = SecretEngine::new(
            Arc::new(MemorySecretStore::new()),
            Arc::new(SystemClock),
            "http://localhost:8080",
        );
        Self::new(engine, RateLimiter::per_minute(60))
    }
}
