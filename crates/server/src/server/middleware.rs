//! Axum middleware applied to the router.
//!
//! Request tracing, timeouts and compression come from `tower-http`; the
//! per-client rate limiter lives here.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use ots_common::{protocol::ErrorResponse, ServiceError};
use tracing::debug;

use super::state::AppState;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Client count above which stale windows are swept, at most once per window.
const SWEEP_THRESHOLD: usize = 10_000;

const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
struct Buckets {
    windows: HashMap<IpAddr, Window>,
    last_sweep: Instant,
}

/// Outcome of counting one request against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Fixed-window request counter keyed by client IP.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    buckets: Arc<Mutex<Buckets>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Arc::new(Mutex::new(Buckets {
                windows: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, RATE_WINDOW)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Count one request from `ip` at `now`.
    pub fn check(&self, ip: IpAddr, now: Instant) -> Decision {
        let mut buckets = self.buckets.lock().unwrap_or_else(|e| e.into_inner());
        let window = self.window;

        if buckets.windows.len() >= SWEEP_THRESHOLD
            && now.duration_since(buckets.last_sweep) >= window
        {
            buckets
                .windows
                .retain(|_, w| now.duration_since(w.started) < window);
            buckets.last_sweep = now;
        }

        let entry = buckets.windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(entry.started) >= window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.limit {
            let elapsed = now.duration_since(entry.started);
            return Decision::Limited {
                retry_after: window.saturating_sub(elapsed),
            };
        }

        entry.count += 1;
        Decision::Allowed {
            remaining: self.limit - entry.count,
        }
    }
}

/// Reject clients that exceed the configured request rate with 429.
///
/// Peers are identified by the socket address from [`ConnectInfo`]; requests
/// without one (in-process test transports) share a single bucket.
pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    let limit = HeaderValue::from(state.rate_limiter.limit());

    match state.rate_limiter.check(ip, Instant::now()) {
        Decision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(X_RATELIMIT_LIMIT, limit);
            headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
            response
        }
        Decision::Limited { retry_after } => {
            debug!(client = %ip, "rate limit exceeded");
            let err = ServiceError::RateLimited;
            // Round up so clients never retry inside the window.
            let retry_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            (
                StatusCode::TOO_MANY_REQUESTS,
                [
                    (X_RATELIMIT_LIMIT, limit),
                    (X_RATELIMIT_REMAINING, HeaderValue::from(0u32)),
                    (header::RETRY_AFTER, HeaderValue::from(retry_secs.max(1))),
                ],
                Json(ErrorResponse::from(&err)),
            )
                .into_response()
        }
    }
}
