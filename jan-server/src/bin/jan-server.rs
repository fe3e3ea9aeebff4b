//! `jan-server` binary: loads config, wires [`jan_server::app`], and serves the
//! router until a shutdown signal arrives, draining the realtime reconciler and
//! the background worker pool first (spec SPEC_FULL.md §2 "graceful shutdown").

use std::sync::Arc;

use jan_config::Settings;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    jan_config::load_and_apply("jan-server", None)?;
    let settings = Settings::from_env();
    let addr = Settings::bind_addr();

    let (state, worker_pool) = jan_server::app::build(settings)?;
    let app = jan_server::app::router(Arc::clone(&state));

    let reconciler_handle = state.reconciler.start();

    let cancellation = CancellationToken::new();
    let worker_handles = worker_pool.spawn(cancellation.clone());

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "jan-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown signal received, draining background work");
    state.reconciler.stop();
    cancellation.cancel();
    for handle in worker_handles {
        let _ = handle.await;
    }
    if let Some(handle) = reconciler_handle {
        let _ = handle.await;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
