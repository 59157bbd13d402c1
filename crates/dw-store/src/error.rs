use dw_types::DurableRef;

/// Errors from durable store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend is unreachable or refused the request.
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer in time.
    #[error("durable store timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Content hash mismatch on read (data corruption).
    #[error("corrupt object {id}: {reason}")]
    Corrupt { id: DurableRef, reason: String },

    /// The handle cannot name an object in this backend.
    #[error("invalid durable reference: {0}")]
    InvalidRef(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
