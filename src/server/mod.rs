// HTTP server module.
// Builds the axum router and runs it on a TCP listener.

pub mod routes;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{delete, get},
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::Result;

pub use routes::{AppState, PrsQuery, PrsResponse};

/// Build the application router. Any origin may call it.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/api/prs", get(routes::list_prs))
        .route("/api/cache", delete(routes::clear_cache))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until the listener fails or `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    state: AppState,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
