use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use dw_crypto::{Ed25519Signer, KeyedSigner, RecordSigner};

use crate::error::{LedgerError, LedgerResult};

/// Record signing scheme and key material.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "kebab-case")]
pub enum SigningConfig {
    /// Keyed BLAKE3 MAC derived from a shared secret.
    Keyed { secret: String },
    /// Ed25519 with a hex-encoded 32-byte secret key.
    Ed25519 { secret_key_hex: String },
}

impl SigningConfig {
    pub fn build(&self) -> LedgerResult<Arc<dyn RecordSigner>> {
        match self {
            Self::Keyed { secret } => {
                if secret.is_empty() {
                    return Err(LedgerError::Config("signing secret must not be empty".into()));
                }
                Ok(Arc::new(KeyedSigner::from_secret(secret)))
            }
            Self::Ed25519 { secret_key_hex } => {
                let raw = hex::decode(secret_key_hex)
                    .map_err(|e| LedgerError::Config(format!("ed25519 key: {e}")))?;
                let key: [u8; 32] = raw.try_into().map_err(|raw: Vec<u8>| {
                    LedgerError::Config(format!("ed25519 key must be 32 bytes, got {}", raw.len()))
                })?;
                Ok(Arc::new(Ed25519Signer::from_bytes(key)))
            }
        }
    }
}

impl Default for SigningConfig {
    fn default() -> Self {
        Self::Keyed {
            secret: "provenance-secret".into(),
        }
    }
}

impl std::fmt::Debug for SigningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyed { .. } => f.debug_struct("Keyed").field("secret", &"[redacted]").finish(),
            Self::Ed25519 { .. } => f
                .debug_struct("Ed25519")
                .field("secret_key_hex", &"[redacted]")
                .finish(),
        }
    }
}

/// Ledger tuning and identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Bound on a single durable upload.
    pub upload_timeout_ms: u64,
    /// `App-Name` tag attached to uploads.
    pub app_name: String,
    pub signing: SigningConfig,
}

impl LedgerConfig {
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_millis(self.upload_timeout_ms)
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            upload_timeout_ms: 10_000,
            app_name: "DataWeave".into(),
            signing: SigningConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.upload_timeout(), Duration::from_secs(10));
        assert_eq!(config.app_name, "DataWeave");
        assert_eq!(config.signing.build().unwrap().scheme(), "blake3-keyed");
    }

    #[test]
    fn ed25519_from_hex() {
        let signing = SigningConfig::Ed25519 {
            secret_key_hex: "07".repeat(32),
        };
        assert_eq!(signing.build().unwrap().scheme(), "ed25519");
    }

    #[test]
    fn bad_keys_rejected() {
        let short = SigningConfig::Ed25519 {
            secret_key_hex: "0102".into(),
        };
        assert!(matches!(short.build(), Err(LedgerError::Config(_))));

        let not_hex = SigningConfig::Ed25519 {
            secret_key_hex: "zz".into(),
        };
        assert!(matches!(not_hex.build(), Err(LedgerError::Config(_))));

        let empty = SigningConfig::Keyed { secret: String::new() };
        assert!(matches!(empty.build(), Err(LedgerError::Config(_))));
    }

    #[test]
    fn partial_fields_use_defaults() {
        let parsed: LedgerConfig = serde_json::from_str(r#"{"upload_timeout_ms": 250}"#).unwrap();
        assert_eq!(parsed.upload_timeout_ms, 250);
        assert_eq!(parsed.signing, SigningConfig::default());
    }

    #[test]
    fn debug_redacts_secrets() {
        let debug = format!("{:?}", LedgerConfig::default());
        assert!(!debug.contains("provenance-secret"));
        assert!(debug.contains("redacted"));
    }
}
