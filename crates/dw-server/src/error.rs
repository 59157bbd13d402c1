use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;

use dw_ledger::{CreationError, LedgerError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Ledger(LedgerError::ImportRejected(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Ledger(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        Self::Ledger(e)
    }
}

impl From<CreationError> for ServerError {
    fn from(e: CreationError) -> Self {
        match e {
            CreationError::InvalidRequest(msg) => Self::InvalidRequest(msg),
            CreationError::StorageUnavailable(msg) => Self::StorageUnavailable(msg),
            CreationError::Superseded => Self::Conflict(CreationError::Superseded.to_string()),
            CreationError::Ledger(inner) => Self::Ledger(inner),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_errors_map_to_statuses() {
        let cases = [
            (CreationError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (CreationError::StorageUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (CreationError::Superseded, StatusCode::CONFLICT),
            (
                CreationError::Ledger(LedgerError::LockPoisoned),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ServerError::from(err).status(), status);
        }
    }

    #[test]
    fn rejected_import_is_client_error() {
        let err = ServerError::from(LedgerError::ImportRejected("bad".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
