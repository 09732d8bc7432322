use anyhow::Result;
use axum::routing::get;
use axum::Router;

/// Tiny liveness endpoint for orchestration health checks. Binds loopback
/// only; the daemon has no remote surface.
pub async fn serve(port: u16) -> Result<()> {
    let app = Router::new().route("/health", get(|| async { "OK" }));
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
    tracing::info!(port, "Health endpoint listening");
    axum::serve(listener, app).await?;
    Ok(())
}
