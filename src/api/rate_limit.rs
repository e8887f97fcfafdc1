use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};

use super::ApiError;
use crate::config::RateLimitConfig;
use crate::state::AppState;

/// Per-IP fixed-window request counter.
#[derive(Clone)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    hits: Arc<Mutex<HashMap<IpAddr, (Instant, u32)>>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_seconds),
            hits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Records a hit and reports whether the caller is still within quota.
    pub fn check(&self, addr: IpAddr) -> bool {
        let now = Instant::now();
        let Ok(mut hits) = self.hits.lock() else {
            // A poisoned counter should not take the API down.
            return true;
        };

        let entry = hits.entry(addr).or_insert((now, 0));
        if now.duration_since(entry.0) >= self.window {
            *entry = (now, 0);
        }
        entry.1 += 1;

        let allowed = entry.1 <= self.max_requests;
        if hits.len() > 10_000 {
            let window = self.window;
            hits.retain(|_, (start, _)| now.duration_since(*start) < window);
        }
        allowed
    }
}

pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |info| info.0.ip());

    if state.limiter.check(addr) {
        Ok(next.run(request).await)
    } else {
        Err(ApiError::TooManyRequests(
            "Too many requests from this IP, please try again in an hour!".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_is_enforced_per_window() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 3,
            window_seconds: 3600,
        });
        let addr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

        assert!(limiter.check(addr));
        assert!(limiter.check(addr));
        assert!(limiter.check(addr));
        assert!(!limiter.check(addr));
    }

    #[test]
    fn addresses_are_tracked_independently() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            max_requests: 1,
            window_seconds: 3600,
        });
        let first = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let second = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));

        assert!(limiter.check(first));
        assert!(!limiter.check(first));
        assert!(limiter.check(second));
    }
}
