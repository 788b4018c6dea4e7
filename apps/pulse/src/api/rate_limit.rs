//! Login throttling with a `governor` token bucket per client IP, shared by
//! both login routes.
//!
//! The client address comes from `ConnectInfo`, so the router must be served
//! with `into_make_service_with_connect_info::<SocketAddr>()`. Requests
//! without it (in-process test transports) all share one bucket.

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::{debug, warn};

use super::ApiError;
use crate::config::RateLimitConfig;

pub type LoginLimiter = DefaultKeyedRateLimiter<IpAddr>;

/// Tracked clients above which idle buckets are dropped.
const PRUNE_ABOVE: usize = 10_000;

pub fn login_limiter(config: RateLimitConfig) -> Arc<LoginLimiter> {
    let quota = Quota::per_second(config.per_second).allow_burst(config.burst);
    Arc::new(RateLimiter::keyed(quota))
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |ConnectInfo(addr)| addr.ip())
}

pub async fn limit_logins(
    State(limiter): State<Arc<LoginLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let ip = client_ip(&request);
    if limiter.check_key(&ip).is_err() {
        warn!(%ip, path = %request.uri().path(), "login rate limit hit");
        return ApiError::RateLimited.into_response();
    }

    if limiter.len() > PRUNE_ABOVE {
        limiter.retain_recent();
        debug!(clients = limiter.len(), "pruned idle login buckets");
    }
    next.run(request).await
}
