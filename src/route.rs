//! Route definitions
//!
//! Layer order, outermost first:
//!
//! ```text
//! CORS -> error middleware -> panic catcher -> [/api: rate limiter] -> handler
//! ```
//!
//! The envelope types are returned directly by handlers, so every response on
//! the way out is already in its final shape when the error middleware sees it.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::catch_panic::CatchPanicLayer;

use crate::handler::{captions, endpoint_not_found, export_zip, health, log, log_level, transcribe};
use crate::middleware::{cors_layer, error_middleware, panic_response, rate_limit_middleware};
use crate::state::AppState;

/// Creates and configures the application router
///
/// # Route Definitions
///
/// - `GET  /api/health` - Liveness and uptime
/// - `GET  /api/diag/log-level` - Active log filter (diagnostic stub)
/// - `POST /api/captions` - Mock social captions from a transcript
/// - `POST /api/transcribe` - Mock transcription of a multipart upload
/// - `POST /api/exportZip` - ZIP export of generated texts
/// - `POST /api/log` - Structured client log sink
///
/// Anything else under `/api` (including a wrong method) answers
/// `404 ENDPOINT_NOT_FOUND`.
pub fn create_app(state: AppState) -> Router {
    let json_max = state.config.max_json_bytes;
    let upload_max = state.config.max_upload_bytes;

    let api_routes = Router::new()
        .route("/health", get(health).fallback(endpoint_not_found))
        .route("/diag/log-level", get(log_level).fallback(endpoint_not_found))
        .route(
            "/captions",
            post(captions).fallback(endpoint_not_found).layer(DefaultBodyLimit::max(json_max)),
        )
        .route(
            "/transcribe",
            post(transcribe).fallback(endpoint_not_found).layer(DefaultBodyLimit::max(upload_max)),
        )
        .route(
            "/exportZip",
            post(export_zip).fallback(endpoint_not_found).layer(DefaultBodyLimit::max(json_max)),
        )
        .route(
            "/log",
            post(log).fallback(endpoint_not_found).layer(DefaultBodyLimit::max(json_max)),
        )
        .fallback(endpoint_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .nest("/api", api_routes)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(middleware::from_fn_with_state(state.clone(), error_middleware))
        .layer(cors_layer())
        .with_state(state)
}
