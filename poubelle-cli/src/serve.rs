use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use poubelle_core::config::PipelineConfig;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{info, warn};

const PORT: u16 = 8000;

/// Serve the working directory until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub(crate) async fn serve(config: &PipelineConfig) -> Result<()> {
    let app = Router::new().fallback_service(ServeDir::new("."));

    let addr = SocketAddr::from(([0, 0, 0, 0], PORT));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(url = %format!("http://localhost:{PORT}"), "starting web server");
    info!(url = %map_url(config), "open the map");
    info!("press Ctrl+C to stop the server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("web server failed")
}

fn map_url(config: &PipelineConfig) -> String {
    let path = config.output_dir.join(&config.map.output_file);
    let path = path.to_string_lossy().replace('\\', "/");
    format!(
        "http://localhost:{PORT}/{}",
        path.trim_start_matches("./").trim_start_matches('/')
    )
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutting down web server");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_url_points_at_the_saved_page() {
        let config = PipelineConfig::default();
        assert_eq!(
            map_url(&config),
            "http://localhost:8000/static/garbage_flow_map.html"
        );
    }
}
