//! Common error types for tipline

use thiserror::Error;

/// Common result type for tipline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every tipline operation.
///
/// Business-rule failures (everything except `Database`/`Io`/`Internal`) are
/// recovered at the operation boundary and returned to the caller as typed
/// failures; they never escape uncaught. Storage failures surface as
/// `Database` without retry; retry policy belongs to the calling layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Storage collaborator failure (wraps sqlx::Error); surfaced to callers
    /// as unavailable rather than as a business-rule failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or missing input, the caller's fault
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Authenticated but not authorized for this operation
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Referenced entity absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Uniqueness or state collision (duplicate claim, active embargo, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Operation not valid for the entity's current lifecycle state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Internal invariant breach or serialization failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable kind, the wire contract for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Database(_) => "UNAVAILABLE",
            Error::Io(_) => "UNAVAILABLE",
            Error::Config(_) => "INTERNAL",
            Error::Validation(_) => "VALIDATION",
            Error::Permission(_) => "PERMISSION",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::Internal(_) => "INTERNAL",
        }
    }

    /// True when the underlying sqlx error is a UNIQUE constraint violation.
    ///
    /// The store enforces uniqueness (one pick per reporter per tip, one
    /// verification per user, one payment per order); callers map violations
    /// to domain-level `Conflict` errors instead of read-then-write checks.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::Database(db_err)) => {
                // SQLite: 2067 = SQLITE_CONSTRAINT_UNIQUE, 1555 = _PRIMARYKEY
                matches!(db_err.code().as_deref(), Some("2067") | Some("1555"))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::Validation("x".into()).code(), "VALIDATION");
        assert_eq!(Error::Permission("x".into()).code(), "PERMISSION");
        assert_eq!(Error::NotFound("x".into()).code(), "NOT_FOUND");
        assert_eq!(Error::Conflict("x".into()).code(), "CONFLICT");
        assert_eq!(Error::InvalidState("x".into()).code(), "INVALID_STATE");
        assert_eq!(Error::Internal("x".into()).code(), "INTERNAL");
    }
}
