use crate::error::AppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

/// Process-wide limiter guarding the upstream completion quota.
pub type UnkeyedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a limiter that admits `requests` calls per `window_seconds`, allowing
/// the whole allowance as a burst.
pub fn create_unkeyed_rate_limiter(requests: u32, window_seconds: u64) -> UnkeyedRateLimiter {
    let requests = NonZeroU32::new(requests.max(1)).unwrap_or(NonZeroU32::MIN);
    let window_ms = window_seconds.max(1) * 1000;
    let period = Duration::from_millis((window_ms / u64::from(requests.get())).max(1));

    let quota = Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_minute(requests))
        .allow_burst(requests);

    Arc::new(RateLimiter::direct(quota))
}

pub async fn rate_limit_middleware(
    State(limiter): State<UnkeyedRateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    match limiter.check() {
        Ok(_) => Ok(next.run(request).await),
        Err(negative) => {
            let wait_time = negative.wait_time_from(DefaultClock::default().now());
            tracing::warn!(
                path = %request.uri().path(),
                retry_after_secs = wait_time.as_secs(),
                "Rate limit exceeded"
            );
            Err(AppError::TooManyRequests(
                "Too many requests. Please try again later.".to_string(),
                Some(wait_time.as_secs()),
            ))
        }
    }
}
