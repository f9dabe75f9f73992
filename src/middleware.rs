use std::any::Any;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;
use tower_http::cors::{self, CorsLayer};

use crate::envelope::{ApiError, ErrorDetail};
use crate::extract::{client_key, CapturedBody};
use crate::ratelimit::RateLimitDecision;
use crate::state::AppState;

/// Longest slice of a request body copied into an error log line
const LOGGED_BODY_MAX_BYTES: usize = 2048;

/// Middleware enforcing the per-client request budget
///
/// Mounted on the `/api` router only. Allowed responses get
/// `X-RateLimit-Limit` / `X-RateLimit-Remaining`; rejected requests never reach
/// the handler and receive a 429 envelope with `retryAfter`.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&request);
    let limiter = &state.rate_limiter;

    match limiter.check(&client, Instant::now()) {
        RateLimitDecision::Limited { retry_after_secs } => {
            tracing::warn!(
                client = %client,
                path = %request.uri().path(),
                retry_after_secs,
                "rate limit exceeded"
            );
            Err(ApiError::rate_limited(retry_after_secs))
        }
        RateLimitDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limiter.max_requests()));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            Ok(response)
        }
    }
}

/// Outermost error handling middleware
///
/// Gives the JSON extractor a slot to leave the request body in, then inspects
/// the response. Any 5xx is logged with method, path, client, timestamp, the
/// captured body (non-GET only) and the internal detail. The detail is copied
/// into the response body only when the environment allows it.
pub async fn error_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = client_key(&request);

    let captured = CapturedBody::new();
    request.extensions_mut().insert(captured.clone());

    let response = next.run(request).await;
    if !response.status().is_server_error() {
        return response;
    }

    let detail = response
        .extensions()
        .get::<ErrorDetail>()
        .map(|ErrorDetail(detail)| detail.clone());

    let body = if method == Method::GET {
        None
    } else {
        captured.get().map(|bytes| {
            let end = bytes.len().min(LOGGED_BODY_MAX_BYTES);
            String::from_utf8_lossy(&bytes[..end]).into_owned()
        })
    };

    tracing::error!(
        method = %method,
        path = %path,
        client = %client,
        timestamp = %Utc::now().to_rfc3339(),
        body = body.as_deref().unwrap_or(""),
        detail = detail.as_deref().unwrap_or(""),
        status = response.status().as_u16(),
        "request failed with internal error"
    );

    match detail {
        Some(detail) if state.config.environment.exposes_error_details() => {
            let mut rebuilt = ApiError::internal(detail.clone())
                .with_status(response.status())
                .with_data(json!({ "details": detail }))
                .into_response();
            carry_headers(response.headers(), rebuilt.headers_mut());
            rebuilt
        }
        _ => response,
    }
}

/// Copies headers set by inner layers (rate-limit counters and the like) onto a
/// rebuilt response, without touching the ones the new body defines
fn carry_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for name in from.keys() {
        if name == header::CONTENT_LENGTH || to.contains_key(name) {
            continue;
        }
        for value in from.get_all(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

/// Response used by `CatchPanicLayer` when a handler panics
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    };

    ApiError::internal(format!("panic: {detail}")).into_response()
}

/// CORS policy for browser clients
///
/// The API has no cookies or auth, so any origin may call it.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(cors::Any)
        .max_age(std::time::Duration::from_secs(3600))
}
