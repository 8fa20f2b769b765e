//! API error mapping for tipline-server
//!
//! The domain taxonomy lives in `tipline-common`; this module projects it
//! onto HTTP. The `code` string is the wire contract, the message is advisory.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tipline_common::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error, mapped per the error taxonomy
    #[error(transparent)]
    Common(#[from] Error),

    /// Generic error (500)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Common(err) => {
                let status = match &err {
                    Error::Validation(_) => StatusCode::BAD_REQUEST,
                    Error::Permission(_) => StatusCode::FORBIDDEN,
                    Error::NotFound(_) => StatusCode::NOT_FOUND,
                    Error::Conflict(_) | Error::InvalidState(_) => StatusCode::CONFLICT,
                    Error::Database(_) | Error::Io(_) => StatusCode::SERVICE_UNAVAILABLE,
                    Error::Config(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                // Storage details go to the log, never the client
                let message = if let Error::Database(ref db_err) = err {
                    tracing::error!("Database error: {}", db_err);
                    "database unavailable".to_string()
                } else {
                    err.to_string()
                };
                (status, err.code(), message)
            }
            ApiError::Other(err) => {
                tracing::error!("Unhandled error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    err.to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: Error) -> StatusCode {
        ApiError::Common(err).into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(status_of(Error::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(Error::Permission("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(Error::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(Error::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(status_of(Error::InvalidState("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status_of(Error::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
