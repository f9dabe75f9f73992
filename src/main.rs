//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Sets up tracing
//! - Starts the HTTP server with graceful shutdown support

use std::net::SocketAddr;
use std::time::Instant;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use forge_api::config::Config;
use forge_api::route::create_app;
use forge_api::state::AppState;

/// Application entry point
///
/// 1. Loads environment variables from a `.env` file if present
/// 2. Initializes tracing on stderr (stdout is reserved for the NDJSON log sink)
/// 3. Builds the application state and router
/// 4. Spawns the rate-limit sweeper
/// 5. Serves until SIGINT/SIGTERM
#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .with_writer(std::io::stderr)
        .init();

    let addr = config.bind_addr();
    let state = AppState::new(config);
    tracing::info!(
        environment = ?state.config.environment,
        export_mode = ?state.config.export_mode,
        rate_limit_max = state.config.rate_limit.max_requests,
        rate_limit_window_secs = state.config.rate_limit.window.as_secs(),
        "configuration loaded"
    );

    // Records are reset lazily on read; this only reclaims memory from idle clients.
    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(limiter.window());
        loop {
            interval.tick().await;
            let removed = limiter.sweep(Instant::now());
            if removed > 0 {
                tracing::debug!(removed, "swept expired rate limit records");
            }
        }
    });

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM
///
/// In-flight requests are allowed to complete before the server exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, stopping server");
}
