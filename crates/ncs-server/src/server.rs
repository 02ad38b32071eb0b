use tokio::net::TcpListener;
use tracing::{info, warn};

use ncs_sync::StateSynchronizer;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// Node coordination server.
///
/// Owns the one [`StateSynchronizer`] for the process; it is built when the
/// server is constructed and shut down when serving stops.
pub struct NcsServer {
    config: ServerConfig,
    sync: StateSynchronizer,
}

impl NcsServer {
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let sync = StateSynchronizer::new(config.state_catalog()?);
        Ok(Self { config, sync })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &StateSynchronizer {
        &self.sync
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState {
            sync: self.sync.clone(),
            wait_timeout: self.config.wait_timeout(),
        })
    }

    /// Close the synchronizer and release every suspended wait.
    ///
    /// Returns how many waiters were released.
    pub fn shutdown(&self) -> ServerResult<usize> {
        Ok(self.sync.shutdown()?)
    }

    /// Serve requests until Ctrl-C.
    ///
    /// On shutdown every suspended wait is released with 503 so in-flight
    /// requests can drain.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("NCS server listening on {}", self.config.bind_addr);

        let shutdown = async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            info!("shutdown requested");
            if let Err(e) = self.shutdown() {
                warn!(error = %e, "failed to release waiters");
            }
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
