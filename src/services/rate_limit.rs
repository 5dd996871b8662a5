use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::{future::Future, net::SocketAddr, num::NonZeroU32, pin::Pin, sync::Arc};
use tower::{Layer, Service};

use crate::error::ErrorResponse;

pub type ClientRateLimiter = Arc<RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>>;

/// `burst` requests per minute per client, refilled continuously.
pub fn create_rate_limiter(burst: u32) -> ClientRateLimiter {
    let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::keyed(Quota::per_minute(burst).allow_burst(burst)))
}

/// Tracked clients above which idle entries are pruned.
const MAX_TRACKED_CLIENTS: usize = 10_000;

/// The peer address. With `trust_proxy` set, the address the proxy reports in
/// `X-Real-IP` or as the last `X-Forwarded-For` hop takes precedence.
fn client_key(request: &Request<Body>, trust_proxy: bool) -> String {
    let header = |name: &str| {
        request
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let forwarded = if trust_proxy {
        header("x-real-ip").or_else(|| header("x-forwarded-for"))
    } else {
        None
    };

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn prune(limiter: &ClientRateLimiter) {
    if limiter.len() > MAX_TRACKED_CLIENTS {
        limiter.retain_recent();
        limiter.shrink_to_fit();
        tracing::debug!("Pruned rate limiter to {} clients", limiter.len());
    }
}

#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: ClientRateLimiter,
    trust_proxy: bool,
}

impl RateLimitLayer {
    pub fn new(limiter: ClientRateLimiter, trust_proxy: bool) -> Self {
        Self { limiter, trust_proxy }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            trust_proxy: self.trust_proxy,
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: ClientRateLimiter,
    trust_proxy: bool,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let key = client_key(&request, self.trust_proxy);
        let allowed = self.limiter.check_key(&key).is_ok();
        prune(&self.limiter);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !allowed {
                tracing::warn!("Rate limit exceeded for client {}", key);
                let body = ErrorResponse {
                    error: "too_many_requests",
                    message: "Too many requests, slow down".to_string(),
                    errors: Vec::new(),
                    retry_after_secs: None,
                };
                return Ok((StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response());
            }
            inner.call(request).await
        })
    }
}
