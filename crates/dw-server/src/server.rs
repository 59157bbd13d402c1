use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// DataWeave provenance server.
pub struct DataWeaveServer {
    state: AppState,
}

impl DataWeaveServer {
    /// Opens the ledger described by `config`.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        Ok(Self {
            state: AppState::open(config)?,
        })
    }

    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Serve until ctrl-c, then save the ledger.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let addr = self.state.config.bind_addr;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            %addr,
            records = self.state.ledger.len()?,
            persistent = self.state.data_dir.is_some(),
            "DataWeave server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        self.state.save()?;
        tracing::info!("DataWeave server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
