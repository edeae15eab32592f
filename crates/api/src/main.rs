use std::sync::Arc;

use anyhow::Context;
use tokio::signal::ctrl_c;

use larder_api::app::{build_app, services::build_services};
use larder_api::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    larder_observability::init();

    let config = Config::from_env()?;
    let services = build_services(&config.storage)
        .await
        .context("failed to initialise catalog store")?;

    let app = build_app(Arc::new(services));

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("received ctrl-c, shutting down");
}
