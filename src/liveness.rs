//! Keep-alive endpoint polled by external uptime monitors.

use std::net::SocketAddr;

use axum::Router;
use axum::routing::get;
use tracing::info;

pub const LIVENESS_BODY: &str = "Bot is running!";

pub fn router() -> Router {
    Router::new().route("/", get(|| async { LIVENESS_BODY }))
}

/// Serve the endpoint on all interfaces until the process exits.
pub async fn serve(port: u16) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Liveness endpoint listening on {}", addr);
    axum::serve(listener, router()).await
}
