use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use dubbing_application::{CommandHandler, DubVideoCommand};
use tokio::net::TcpListener;

pub mod error;
pub mod handlers;

pub use error::{error_mapper, HttpError};
pub use handlers::*;

#[derive(Clone)]
pub struct AppState {
    pub dub_video: Arc<dyn CommandHandler<DubVideoCommand>>,
}

impl AppState {
    pub fn new(dub_video: Arc<dyn CommandHandler<DubVideoCommand>>) -> Self {
        Self { dub_video }
    }
}

pub fn build_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/dub",
            post(dub_video).layer(DefaultBodyLimit::max(max_body_bytes)),
        )
        .with_state(state)
}

pub async fn serve(router: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| anyhow::anyhow!("bind {addr} failed: {err}"))?;
    tracing::info!(%addr, "dubbing http server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| anyhow::anyhow!("server error: {err}"))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
