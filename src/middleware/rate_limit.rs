//! Per-client request throttle: a sliding-window log keyed by client IP and
//! route. Protective only; payment correctness never depends on it.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::extract::connect_info::ConnectInfo;
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use dashmap::DashMap;
use tower::{Layer, Service};

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub remaining: u64,
    pub retry_after_secs: u64,
}

/// Sliding-window log. Timestamps outside the window are evicted lazily on
/// access, so idle keys cost nothing until they are touched again.
pub struct SlidingWindow {
    max_requests: u64,
    window: Duration,
    log: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindow {
    pub fn new(max_requests: u64, window: Duration) -> Self {
        assert!(max_requests > 0, "max_requests must be greater than 0");
        assert!(!window.is_zero(), "window must be non-zero");

        Self {
            max_requests,
            window,
            log: DashMap::new(),
        }
    }

    pub fn limit(&self) -> u64 {
        self.max_requests
    }

    pub fn try_acquire(&self, key: &str) -> Decision {
        let now = Instant::now();
        let mut entry = self.log.entry(key.to_string()).or_default();

        while let Some(front) = entry.front() {
            if now.duration_since(*front) >= self.window {
                entry.pop_front();
            } else {
                break;
            }
        }

        let current = entry.len() as u64;
        if current < self.max_requests {
            entry.push_back(now);
            Decision {
                allowed: true,
                remaining: self.max_requests - current - 1,
                retry_after_secs: 0,
            }
        } else {
            let until_free = entry
                .front()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            Decision {
                allowed: false,
                remaining: 0,
                retry_after_secs: until_free.as_secs().max(1),
            }
        }
    }
}

#[derive(Clone)]
pub struct ThrottleLayer {
    limiter: Arc<SlidingWindow>,
}

impl ThrottleLayer {
    pub fn new(max_requests: u64, window: Duration) -> Self {
        Self {
            limiter: Arc::new(SlidingWindow::new(max_requests, window)),
        }
    }
}

impl<S> Layer<S> for ThrottleLayer {
    type Service = ThrottleService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ThrottleService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

#[derive(Clone)]
pub struct ThrottleService<S> {
    inner: S,
    limiter: Arc<SlidingWindow>,
}

impl<S, B> Service<Request<B>> for ThrottleService<S>
where
    S: Service<Request<B>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = futures_util::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<B>) -> Self::Future {
        let key = format!(
            "{}:{}",
            client_ip(req.headers(), req.extensions())
                .map(|ip| ip.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            req.uri().path()
        );
        let decision = self.limiter.try_acquire(&key);
        let limit = self.limiter.limit();

        if !decision.allowed {
            tracing::warn!(key = %key, "request throttled");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate limit exceeded",
                    "retry_after": decision.retry_after_secs,
                })),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&decision.retry_after_secs.to_string()) {
                response.headers_mut().insert("retry-after", value);
            }
            return Box::pin(async move { Ok(response) });
        }

        let mut inner = self.inner.clone();
        Box::pin(async move {
            let mut response = inner.call(req).await?;
            let headers = response.headers_mut();
            if let Ok(value) = HeaderValue::from_str(&limit.to_string()) {
                headers.insert("x-ratelimit-limit", value);
            }
            if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
                headers.insert("x-ratelimit-remaining", value);
            }
            Ok(response)
        })
    }
}

fn client_ip(headers: &HeaderMap, extensions: &axum::http::Extensions) -> Option<IpAddr> {
    if let Some(raw) = headers.get("x-forwarded-for").and_then(|h| h.to_str().ok()) {
        if let Some(ip) = raw.split(',').next().map(str::trim).and_then(parse_ip) {
            return Some(ip);
        }
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip())
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    if let Ok(ip) = IpAddr::from_str(value) {
        return Some(ip);
    }

    if let Ok(addr) = SocketAddr::from_str(value) {
        return Some(addr.ip());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit() {
        let window = SlidingWindow::new(3, Duration::from_secs(60));

        for expected_remaining in [2, 1, 0] {
            let decision = window.try_acquire("10.0.0.1:/api/payments/initialize");
            assert!(decision.allowed);
            assert_eq!(decision.remaining, expected_remaining);
        }

        let decision = window.try_acquire("10.0.0.1:/api/payments/initialize");
        assert!(!decision.allowed);
        assert!(decision.retry_after_secs >= 1);
    }

    #[test]
    fn keys_are_independent() {
        let window = SlidingWindow::new(1, Duration::from_secs(60));

        assert!(window.try_acquire("10.0.0.1:/a").allowed);
        assert!(window.try_acquire("10.0.0.2:/a").allowed);
        assert!(window.try_acquire("10.0.0.1:/b").allowed);
        assert!(!window.try_acquire("10.0.0.1:/a").allowed);
    }

    #[test]
    fn window_expiry_readmits() {
        let window = SlidingWindow::new(1, Duration::from_millis(30));

        assert!(window.try_acquire("k").allowed);
        assert!(!window.try_acquire("k").allowed);
        std::thread::sleep(Duration::from_millis(40));
        assert!(window.try_acquire("k").allowed);
    }

    #[test]
    fn forwarded_header_beats_connect_info() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.10, 198.51.100.7"),
        );
        let extensions = axum::http::Extensions::new();

        assert_eq!(
            client_ip(&headers, &extensions),
            Some(IpAddr::from([203, 0, 113, 10]))
        );
    }
}
