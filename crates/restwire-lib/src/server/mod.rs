//! HTTP server module.
//!
//! Serves an axum router whose handlers read and write every body through a
//! shared [`JsonProcessor`], with request tracing and graceful shutdown.

pub mod extract;
pub mod handlers;

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::config::ServerSettings;
use crate::errors::{RestwireError, Result};
use crate::json::JsonProcessor;

pub use extract::{error_response, respond, Wire, WireRejection};

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the router with every endpoint wired to `processor`.
pub fn build_router(processor: JsonProcessor) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/time", get(handlers::time))
        .route("/echo", post(handlers::echo))
        .route("/events/normalize", post(handlers::normalize_event))
        .layer(TraceLayer::new_for_http())
        .with_state(processor)
}

// ---------------------------------------------------------------------------
// Server startup
// ---------------------------------------------------------------------------

/// Handle to a running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener actually bound (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Begin graceful shutdown.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait for the server to finish serving in-flight requests and stop.
    pub async fn wait(self) -> Result<()> {
        self.task.await.map_err(|e| RestwireError::Server {
            status: 500,
            message: format!("Server task failed: {e}"),
        })
    }
}

/// Bind `settings.addr()` and serve in a background task until `shutdown`
/// is cancelled.
pub async fn start_server(
    settings: &ServerSettings,
    processor: JsonProcessor,
    shutdown: CancellationToken,
) -> Result<ServerHandle> {
    let addr = settings.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| RestwireError::Server {
            status: 500,
            message: format!("Failed to bind to {}: {}", addr, e),
        })?;

    let local_addr = listener.local_addr().map_err(|e| RestwireError::Server {
        status: 500,
        message: format!("Failed to get local address: {}", e),
    })?;

    tracing::info!(addr = %local_addr, "HTTP server starting");

    let router = build_router(processor);
    let signal = shutdown.clone().cancelled_owned();
    let task = tokio::spawn(async move {
        let serve = axum::serve(listener, router).with_graceful_shutdown(signal);
        if let Err(e) = serve.await {
            tracing::error!("Server error: {}", e);
        }
        tracing::info!("HTTP server stopped");
    });

    Ok(ServerHandle {
        local_addr,
        shutdown,
        task,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
