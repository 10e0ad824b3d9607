//! Binary entrypoint for the seriesgate HTTP server.
//!
//! Reads configuration from environment variables:
//! - `SERIESGATE_PORT`: listen port (default: "3000")
//! - `SERIESGATE_BASE_URL`, `SERIESGATE_API_KEY`: default credentials
//! - `SERIESGATE_*` engine settings, see `seriesgate_engine::config`
//! - `RUST_LOG`: log filter (default: "info")

use seriesgate_engine::CancellationToken;
use seriesgate_server::router::build_router;
use seriesgate_server::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let port = std::env::var("SERIESGATE_PORT").unwrap_or_else(|_| "3000".to_string());

    let state = AppState::from_env().expect("Failed to initialize application state");
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("seriesgate server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .unwrap();
}

/// Waits for Ctrl-C, then cancels in-flight batches so they answer with
/// cancellation errors instead of holding the shutdown.
async fn shutdown_signal(shutdown: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
    shutdown.cancel();
}
