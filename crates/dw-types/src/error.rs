use thiserror::Error;

/// Errors produced by type parsing and construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid record id: {0}")]
    InvalidId(String),

    #[error("origin id must not be empty")]
    EmptyOrigin,

    #[error("unknown record kind: {0} (expected compute, proof or reasoning)")]
    UnknownKind(String),

    #[error("invalid signature token: {0}")]
    InvalidSignature(String),

    #[error("durable reference must not be empty")]
    EmptyDurableRef,
}
