//! Fixed-window attempt counter for the auth endpoints.
//!
//! Counters live in process memory, so each instance limits independently.
//! Running several instances behind a load balancer needs a shared counter
//! store to enforce one global limit.
//!
//! Clients are keyed by socket peer address. `X-Forwarded-For` is honoured
//! only when the limiter is told a trusted proxy sets it; otherwise any
//! client could pick a fresh bucket per request.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Duration, Utc};

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
struct Window {
    attempts: u32,
    reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: u64 },
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    trust_proxy: bool,
    entries: Arc<Mutex<HashMap<String, Window>>>,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration, trust_proxy: bool) -> Self {
        Self {
            max_attempts,
            window,
            trust_proxy,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one attempt for `key`.
    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Utc::now())
    }

    fn check_at(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let window = entries
            .entry(key.to_owned())
            .and_modify(|w| {
                if w.reset_at <= now {
                    w.attempts = 1;
                    w.reset_at = now + self.window;
                } else {
                    w.attempts = w.attempts.saturating_add(1);
                }
            })
            .or_insert_with(|| Window {
                attempts: 1,
                reset_at: now + self.window,
            });

        if window.attempts > self.max_attempts {
            let wait = (window.reset_at - now).num_seconds().max(1);
            RateLimitDecision::Limited {
                retry_after: u64::try_from(wait).unwrap_or(1),
            }
        } else {
            RateLimitDecision::Allowed {
                remaining: self.max_attempts - window.attempts,
            }
        }
    }

    /// Forgets windows that have already closed.
    pub fn cleanup_expired(&self) {
        let now = Utc::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, w| w.reset_at > now);
    }
}

/// First `X-Forwarded-For` hop when a trusted proxy sets it, else the socket
/// peer, else a shared bucket.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .filter(|_| trust_proxy)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned);

    forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_owned())
}

pub async fn limit_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer, state.limiter.trust_proxy);
    let key = format!("{}:{}", request.uri().path(), client);

    match state.limiter.check(&key) {
        RateLimitDecision::Allowed { .. } => Ok(next.run(request).await),
        RateLimitDecision::Limited { retry_after } => {
            tracing::warn!(%key, retry_after, "auth rate limit hit");
            Err(AppError::RateLimited { retry_after })
        }
    }
}
