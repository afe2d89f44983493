//! Per-client request throttling.
//!
//! [`InMemoryRateLimiter`] keeps its counters inside this process only. Every
//! server instance counts separately and restarts forget everything, so it is
//! a single-instance fallback; a shared store belongs behind [`RateLimiter`]
//! when running more than one instance.

use std::{net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use anyhow::anyhow;
use axum::{
    Json,
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{DefaultKeyedRateLimiter, Quota};
use serde_json::json;
use tracing::warn;

use crate::config::RateLimitConfig;

pub trait RateLimiter: Send + Sync + 'static {
    /// Records a request for `key`, returning whether it may proceed.
    fn allow(&self, key: &str) -> bool;
}

pub struct InMemoryRateLimiter {
    inner: DefaultKeyedRateLimiter<String>,
}

impl InMemoryRateLimiter {
    /// `requests` per `period`, all of which may arrive as one burst.
    /// `None` when `period` is zero.
    pub fn new(requests: NonZeroU32, period: Duration) -> Option<Self> {
        let quota = Quota::with_period(period / requests.get())?.allow_burst(requests);
        Some(Self {
            inner: governor::RateLimiter::keyed(quota),
        })
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn allow(&self, key: &str) -> bool {
        self.inner.check_key(&key.to_owned()).is_ok()
    }
}

/// The limiter installed on the router; empty when throttling is off.
#[derive(Clone, Default)]
pub struct Limiter(Option<Arc<dyn RateLimiter>>);

impl Limiter {
    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn new(limiter: impl RateLimiter) -> Self {
        Self(Some(Arc::new(limiter)))
    }

    pub fn from_config(config: &RateLimitConfig) -> anyhow::Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let requests = NonZeroU32::new(config.requests)
            .ok_or_else(|| anyhow!("RATE_LIMIT_REQUESTS must be greater than zero"))?;
        let limiter = InMemoryRateLimiter::new(requests, Duration::from_secs(config.period_secs))
            .ok_or_else(|| anyhow!("RATE_LIMIT_PERIOD_SECS must be greater than zero"))?;
        Ok(Self::new(limiter))
    }

    #[cfg(test)]
    pub fn is_enabled(&self) -> bool {
        self.0.is_some()
    }
}

pub async fn limit(State(limiter): State<Limiter>, request: Request, next: Next) -> Response {
    if let Some(limiter) = &limiter.0 {
        let key = client_key(&request);
        if !limiter.allow(&key) {
            warn!(client = %key, "rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "Too many requests" })),
            )
                .into_response();
        }
    }

    next.run(request).await
}

fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttles_per_key() {
        let limiter = InMemoryRateLimiter::new(NonZeroU32::new(2).unwrap(), Duration::from_secs(60)).unwrap();

        assert!(limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.1"));
        assert!(!limiter.allow("10.0.0.1"));
        assert!(limiter.allow("10.0.0.2"));
    }

    #[test]
    fn config_switches() {
        let mut config = RateLimitConfig {
            enabled: false,
            requests: 10,
            period_secs: 60,
        };
        assert!(!Limiter::from_config(&config).unwrap().is_enabled());

        config.enabled = true;
        assert!(Limiter::from_config(&config).unwrap().is_enabled());

        config.requests = 0;
        assert!(Limiter::from_config(&config).is_err());

        config.requests = 10;
        config.period_secs = 0;
        assert!(Limiter::from_config(&config).is_err());
    }
}
