//! Per-client rate limiting for login and student uploads.

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::{
    collections::HashMap,
    net::SocketAddr,
    num::NonZeroU32,
    sync::{Arc, RwLock},
    time::Duration,
};

/// Limiter for one client.
type ClientLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;
type LimiterMap = RwLock<HashMap<String, Arc<ClientLimiter>>>;

/// Limiter buckets keyed by client address.
#[derive(Clone)]
pub struct RateLimitState {
    /// Per-client limiters for the login endpoint.
    login_limiters: Arc<LimiterMap>,
    /// Per-client limiters for anonymous student uploads.
    upload_limiters: Arc<LimiterMap>,
    /// Login rate limit (requests per minute).
    login_rate_limit: u32,
    /// Upload rate limit (requests per minute).
    upload_rate_limit: u32,
}

impl RateLimitState {
    /// Create a new rate limit state. Limits are requests per minute.
    pub fn new(login_rate_limit: u32, upload_rate_limit: u32) -> Self {
        Self {
            login_limiters: Arc::new(RwLock::new(HashMap::new())),
            upload_limiters: Arc::new(RwLock::new(HashMap::new())),
            login_rate_limit,
            upload_rate_limit,
        }
    }

    /// Get or create the limiter for `client`.
    fn get_or_create_limiter(
        limiters: &LimiterMap,
        client: &str,
        requests_per_minute: u32,
    ) -> Arc<ClientLimiter> {
        {
            let read_guard = limiters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(limiter) = read_guard.get(client) {
                return limiter.clone();
            }
        }

        let mut write_guard = limiters.write().unwrap_or_else(|e| e.into_inner());
        write_guard
            .entry(client.to_string())
            .or_insert_with(|| {
                let quota = Quota::per_minute(
                    NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN),
                );
                Arc::new(RateLimiter::direct(quota))
            })
            .clone()
    }

    /// Check if a login request from `client` is allowed.
    pub fn check_login(&self, client: &str) -> bool {
        Self::get_or_create_limiter(&self.login_limiters, client, self.login_rate_limit)
            .check()
            .is_ok()
    }

    /// Check if a student upload from `client` is allowed.
    pub fn check_upload(&self, client: &str) -> bool {
        Self::get_or_create_limiter(&self.upload_limiters, client, self.upload_rate_limit)
            .check()
            .is_ok()
    }

    /// Drop buckets no request is currently holding.
    pub fn cleanup(&self) {
        for map in [&self.login_limiters, &self.upload_limiters] {
            map.write()
                .unwrap_or_else(|e| e.into_inner())
                .retain(|_, v| Arc::strong_count(v) > 1);
        }
    }

    /// Start a background task running [`Self::cleanup`] every five minutes.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            interval.tick().await;
            loop {
                interval.tick().await;
                self.cleanup();
            }
        });
    }
}

/// Client address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer.
fn client_key(req: &Request<Body>) -> String {
    if let Some(forwarded) = req
        .headers()
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next() {
            return ip.trim().to_string();
        }
    }

    if let Some(real_ip) = req
        .headers()
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
    {
        return real_ip.to_string();
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Rate limiting middleware for the login endpoint.
pub async fn login_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&req);

    if !state.check_login(&client) {
        tracing::warn!(client = %client, "Login rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many login attempts. Please try again later.",
        )
            .into_response();
    }

    next.run(req).await
}

/// Rate limiting middleware for student uploads.
pub async fn upload_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&req);

    if !state.check_upload(&client) {
        tracing::warn!(client = %client, "Upload rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many uploads. Please try again later.",
        )
            .into_response();
    }

    next.run(req).await
}
