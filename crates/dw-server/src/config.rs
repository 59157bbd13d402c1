use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dw_ledger::LedgerConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Where `ledger.json` and durable objects live. `None` keeps everything
    /// in memory.
    pub data_dir: Option<PathBuf>,
    pub default_page_limit: usize,
    pub max_page_limit: usize,
    pub recent_limit: usize,
    pub permissive_cors: bool,
    pub ledger: LedgerConfig,
}

impl ServerConfig {
    pub fn from_toml_str(raw: &str) -> ServerResult<Self> {
        toml::from_str(raw).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Apply the default when `requested` is absent and cap it.
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_page_limit)
            .min(self.max_page_limit)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            data_dir: None,
            default_page_limit: 50,
            max_page_limit: 500,
            recent_limit: 10,
            permissive_cors: true,
            ledger: LedgerConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert!(c.data_dir.is_none());
        assert_eq!(c.default_page_limit, 50);
        assert_eq!(c.ledger.upload_timeout_ms, 10_000);
    }

    #[test]
    fn page_limit_defaults_and_caps() {
        let c = ServerConfig::default();
        assert_eq!(c.page_limit(None), 50);
        assert_eq!(c.page_limit(Some(5)), 5);
        assert_eq!(c.page_limit(Some(10_000)), 500);
    }

    #[test]
    fn parses_toml() {
        let c = ServerConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:8080"
            data_dir = "/var/lib/dataweave"
            max_page_limit = 100

            [ledger]
            upload_timeout_ms = 2500

            [ledger.signing]
            scheme = "ed25519"
            secret_key_hex = "0101010101010101010101010101010101010101010101010101010101010101"
            "#,
        )
        .unwrap();
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.data_dir, Some(PathBuf::from("/var/lib/dataweave")));
        assert_eq!(c.max_page_limit, 100);
        assert_eq!(c.default_page_limit, 50);
        assert_eq!(c.ledger.upload_timeout_ms, 2500);
        assert_eq!(c.ledger.signing.build().unwrap().scheme(), "ed25519");
    }

    #[test]
    fn rejects_bad_toml() {
        let err = ServerConfig::from_toml_str("bind_addr = 12").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
