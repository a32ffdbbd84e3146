use crate::error::AppError;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Duration,
};
use tokio::time::Instant;

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests, please try again later.";

/// Expired windows are swept once the table grows past this many clients.
const PRUNE_THRESHOLD: usize = 10_000;

/// Requests seen from one client in its current window.
#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client IP address.
///
/// A client's window opens on its first request and lasts `window_seconds`;
/// at most `max_requests` are admitted inside it.
#[derive(Clone)]
pub struct IpRateLimit {
    windows: Arc<DashMap<IpAddr, Window>>,
    max_requests: u32,
    window: Duration,
    trust_forwarded_for: bool,
}

impl IpRateLimit {
    pub fn new(max_requests: u32, window_seconds: u64) -> Self {
        Self {
            windows: Arc::new(DashMap::new()),
            max_requests: max_requests.max(1),
            window: Duration::from_secs(window_seconds.max(1)),
            trust_forwarded_for: false,
        }
    }

    /// Key clients by the first `X-Forwarded-For` hop. Only safe behind a
    /// proxy that overwrites the header.
    pub fn trust_forwarded_for(mut self, trust: bool) -> Self {
        self.trust_forwarded_for = trust;
        self
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count one request from `ip`. On rejection returns the time left until
    /// the client's window closes.
    fn check(&self, ip: IpAddr) -> Result<(), Duration> {
        let now = Instant::now();
        if self.windows.len() > PRUNE_THRESHOLD {
            self.windows
                .retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let mut entry = self.windows.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });
        let elapsed = now.duration_since(entry.started);
        if elapsed >= self.window {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        if entry.count >= self.max_requests {
            return Err(self.window.saturating_sub(now.duration_since(entry.started)));
        }
        entry.count += 1;
        Ok(())
    }

    fn client_ip(&self, request: &Request) -> Option<IpAddr> {
        let forwarded_ip = self
            .trust_forwarded_for
            .then(|| {
                request
                    .headers()
                    .get("x-forwarded-for")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.split(',').next())
                    .and_then(|s| s.trim().parse::<IpAddr>().ok())
            })
            .flatten();

        forwarded_ip.or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
    }
}

/// Whole seconds until retry, rounded up and never zero.
fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

/// Middleware for IP-based rate limiting
pub async fn ip_rate_limit_middleware(
    State(rate_limit): State<IpRateLimit>,
    request: Request,
    next: Next,
) -> Response {
    let Some(ip) = rate_limit.client_ip(&request) else {
        tracing::warn!("Could not determine IP for rate limiting");
        return next.run(request).await;
    };

    match rate_limit.check(ip) {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            let retry_after = retry_after_secs(wait);
            tracing::warn!(client_ip = %ip, retry_after, "Rate limit exceeded");

            let mut res =
                AppError::TooManyRequests(RATE_LIMIT_MESSAGE.to_string(), Some(retry_after))
                    .into_response();
            res.headers_mut().insert(
                "x-ratelimit-limit",
                HeaderValue::from(rate_limit.max_requests),
            );
            res
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
    };
    use tower::util::ServiceExt;

    fn app(rate_limit: IpRateLimit) -> Router {
        Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(from_fn_with_state(rate_limit, ip_rate_limit_middleware))
    }

    fn request_from(ip: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(ip) = ip {
            builder = builder.header("x-forwarded-for", ip);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn request_from_peer(peer: &str, forwarded: &str) -> HttpRequest<Body> {
        let mut req = request_from(Some(forwarded));
        let addr: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[tokio::test]
    async fn test_rejects_after_budget_is_spent() {
        let app = app(IpRateLimit::new(2, 900).trust_forwarded_for(true));

        for _ in 0..2 {
            let res = app.clone().oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = app.oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(res.headers().contains_key("retry-after"));
        assert_eq!(
            res.headers()
                .get("x-ratelimit-limit")
                .unwrap()
                .to_str()
                .unwrap(),
            "2"
        );
    }

    #[tokio::test]
    async fn test_budget_is_per_client() {
        let app = app(IpRateLimit::new(1, 900).trust_forwarded_for(true));

        let res = app.clone().oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app
            .clone()
            .oneshot(request_from(Some("10.0.0.2, 172.16.0.1")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let res = app.oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_unknown_client_passes_through() {
        let app = app(IpRateLimit::new(1, 900));

        for _ in 0..3 {
            let res = app.clone().oneshot(request_from(None)).await.unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_caps_requests_until_it_closes() {
        let app = app(IpRateLimit::new(2, 4).trust_forwarded_for(true));

        // one request every 100ms for 3.9s, all inside the first window
        let mut accepted = 0;
        for _ in 0..40 {
            let res = app.clone().oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
            if res.status() == StatusCode::OK {
                accepted += 1;
            }
            tokio::time::advance(Duration::from_millis(100)).await;
        }
        assert_eq!(accepted, 2);

        let res = app.clone().oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let res = app.clone().oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let res = app.oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_counts_down_to_window_end() {
        let app = app(IpRateLimit::new(1, 60).trust_forwarded_for(true));

        let res = app.clone().oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        tokio::time::advance(Duration::from_millis(45_500)).await;

        let res = app.oneshot(request_from(Some("10.0.0.1"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            res.headers().get("retry-after").unwrap().to_str().unwrap(),
            "15"
        );
    }

    #[tokio::test]
    async fn test_forwarded_header_ignored_unless_trusted() {
        let app = app(IpRateLimit::new(1, 900));

        let res = app
            .clone()
            .oneshot(request_from_peer("192.0.2.10:5000", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        // a fresh header value does not buy a fresh budget
        let res = app
            .oneshot(request_from_peer("192.0.2.10:5001", "10.0.0.2"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_large_window_does_not_overflow() {
        let limit = IpRateLimit::new(100, u64::MAX);
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(limit.check(ip).is_ok());
    }

    #[test]
    fn test_retry_after_rounds_up() {
        assert_eq!(retry_after_secs(Duration::from_millis(1)), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(14_500)), 15);
        assert_eq!(retry_after_secs(Duration::from_secs(3)), 3);
    }
}
