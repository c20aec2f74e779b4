use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use finnews_pipeline::{RateLimitError, RateLimiter};
use serde::Serialize;
use uuid::Uuid;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Per-minute request cap for the whole API, on the same rolling window the
/// pipeline uses for scorer calls.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    limiter: Arc<RateLimiter>,
}

impl RateLimitState {
    #[must_use]
    pub fn per_minute(max_requests: usize) -> Self {
        Self {
            limiter: Arc::new(RateLimiter::new(max_requests, usize::MAX)),
        }
    }
}

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: String,
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Middleware rejecting requests beyond the per-minute cap with 429 and a
/// `retry-after` header.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    match rate_limit.limiter.try_acquire() {
        Ok(()) => next.run(req).await,
        Err(e) => {
            let retry_after = match &e {
                RateLimitError::WindowFull { retry_after, .. } => retry_after.as_secs().max(1),
                RateLimitError::RunBudgetExhausted { .. } => 60,
            };
            let mut res = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(MiddlewareErrorBody {
                    error: MiddlewareError {
                        code: "rate_limited",
                        message: e.to_string(),
                    },
                }),
            )
                .into_response();
            if let Ok(val) = HeaderValue::from_str(&retry_after.to_string()) {
                res.headers_mut().insert("retry-after", val);
            }
            res
        }
    }
}
