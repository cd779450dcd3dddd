use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Turns SIGINT (Ctrl+C) and SIGTERM into a cancelled `CancellationToken`.
///
/// Hand `token()` clones to the server, then [`spawn`](Self::spawn) the
/// listener; the server drains in-flight requests once the token is cancelled.
pub struct SignalHandler {
    token: CancellationToken,
}

impl SignalHandler {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Cancel `token` on the first shutdown signal.
    pub fn with_token(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Run [`listen`](Self::listen) in a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.listen().await })
    }

    /// Wait for SIGINT, SIGTERM or an outside cancellation, then cancel the token.
    pub async fn listen(&self) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down...");
            }
            _ = Self::sigterm() => {
                tracing::info!("Received SIGTERM, shutting down...");
            }
            _ = self.token.cancelled() => {
                return;
            }
        }
        self.token.cancel();
    }

    #[cfg(unix)]
    async fn sigterm() {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    }

    #[cfg(not(unix))]
    async fn sigterm() {
        std::future::pending::<()>().await;
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}
