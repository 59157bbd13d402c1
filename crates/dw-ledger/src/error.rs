use dw_crypto::HasherError;

/// Errors produced by ledger operations other than record creation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger state lock poisoned")]
    LockPoisoned,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("import rejected: {0}")]
    ImportRejected(String),

    #[error("invalid ledger configuration: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("persistence error: {0}")]
    Persistence(String),
}

impl From<HasherError> for LedgerError {
    fn from(e: HasherError) -> Self {
        match e {
            HasherError::Serialization(msg) => Self::Serialization(msg),
        }
    }
}

/// Why a record creation did not commit.
///
/// No variant leaves a trace in the ledger: a failed creation is invisible
/// to every reader.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CreationError {
    /// The request was rejected before any identifier was minted.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The durable store failed or timed out.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The ledger was cleared or replaced by an import while this creation
    /// was in flight.
    #[error("ledger replaced during creation; retry")]
    Superseded,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<HasherError> for CreationError {
    fn from(e: HasherError) -> Self {
        Self::Ledger(e.into())
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
