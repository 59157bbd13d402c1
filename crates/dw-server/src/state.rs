use std::sync::Arc;

use dw_ledger::{LedgerDir, ProvenanceLedger};
use dw_store::InMemoryDurableStore;

use crate::config::ServerConfig;
use crate::error::ServerResult;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<ProvenanceLedger>,
    pub config: Arc<ServerConfig>,
    pub data_dir: Option<Arc<LedgerDir>>,
}

impl AppState {
    pub fn new(ledger: Arc<ProvenanceLedger>, config: ServerConfig) -> Self {
        Self {
            ledger,
            config: Arc::new(config),
            data_dir: None,
        }
    }

    /// Ledger backed by an in-memory durable store; nothing is persisted.
    pub fn in_memory(config: ServerConfig) -> ServerResult<Self> {
        let store = Arc::new(InMemoryDurableStore::new());
        let ledger = ProvenanceLedger::new(config.ledger.clone(), store)?;
        Ok(Self::new(Arc::new(ledger), config))
    }

    /// Open the ledger in `config.data_dir`, or an in-memory one if unset.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let Some(root) = config.data_dir.clone() else {
            return Self::in_memory(config);
        };
        let dir = LedgerDir::new(root);
        let ledger = dir.open(config.ledger.clone())?;
        Ok(Self {
            ledger: Arc::new(ledger),
            config: Arc::new(config),
            data_dir: Some(Arc::new(dir)),
        })
    }

    /// Write the ledger to its data directory, if it has one.
    pub fn save(&self) -> ServerResult<()> {
        if let Some(dir) = &self.data_dir {
            dir.save(&self.ledger)?;
        }
        Ok(())
    }

    /// Save after a mutation, off the async workers. The mutation already
    /// happened in memory, so a failed write is logged rather than reported
    /// to the client.
    pub(crate) async fn persist(&self) {
        if self.data_dir.is_none() {
            return;
        }
        let state = self.clone();
        match tokio::task::spawn_blocking(move || state.save()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "failed to persist ledger"),
            Err(e) => tracing::error!(error = %e, "ledger save task failed"),
        }
    }
}
