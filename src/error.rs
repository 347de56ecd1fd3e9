//! Error types for the access layer.
//!
//! This module defines all error types using `thiserror`. The taxonomy is
//! deliberately small: argument and dispatch failures are detected before any
//! I/O, lifecycle misuse fails fast, and everything the backend reports is
//! surfaced unchanged — this layer performs no retries and no recovery.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    /// Malformed construction input, detected before any I/O.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The backend tag has no driver binding in this build.
    #[error("unsupported backend: {backend}")]
    UnsupportedBackend { backend: String },

    /// Operation attempted on a disposed handle.
    #[error("{handle} has been closed")]
    Disposed { handle: &'static str },

    /// The connection could not be opened.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// The backend rejected the statement or its parameters.
    #[error("statement failed: {message}")]
    Statement {
        message: String,
        /// e.g. "42P01" for an undefined table
        sql_state: Option<String>,
    },

    /// A fetched value's runtime type cannot be converted to the requested type.
    #[error("cannot coerce {from} value into {to}")]
    Coercion {
        from: &'static str,
        to: &'static str,
    },
}

impl DbError {
    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an unsupported backend error.
    pub fn unsupported_backend(backend: impl Into<String>) -> Self {
        Self::UnsupportedBackend {
            backend: backend.into(),
        }
    }

    /// Create a disposed-handle error.
    pub fn disposed(handle: &'static str) -> Self {
        Self::Disposed { handle }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a statement error with an optional SQLSTATE code.
    pub fn statement(message: impl Into<String>, sql_state: Option<String>) -> Self {
        Self::Statement {
            message: message.into(),
            sql_state,
        }
    }

    /// Create a coercion error from a dynamic value type to a target type.
    pub fn coercion(from: &'static str, to: &'static str) -> Self {
        Self::Coercion { from, to }
    }

    /// The SQLSTATE code reported by the backend, if any.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Self::Statement { sql_state, .. } => sql_state.as_deref(),
            _ => None,
        }
    }
}

/// Convert sqlx errors to DbError.
///
/// Transport-level failures become `Connection`; everything the server itself
/// rejected becomes `Statement` and keeps its SQLSTATE when available.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(msg.to_string()),
            sqlx::Error::Io(io_err) => DbError::connection(format!("I/O error: {}", io_err)),
            sqlx::Error::Tls(tls_err) => DbError::connection(format!("TLS error: {}", tls_err)),
            sqlx::Error::Protocol(msg) => DbError::connection(format!("protocol error: {}", msg)),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                DbError::connection("connection unavailable")
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::statement(db_err.message(), code)
            }
            sqlx::Error::ColumnNotFound(col) => {
                DbError::statement(format!("column not found: {}", col), None)
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::statement(
                format!("column index {} out of bounds (len: {})", index, len),
                None,
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::statement(format!("failed to decode column {}: {}", index, source), None)
            }
            sqlx::Error::Decode(source) => {
                DbError::statement(format!("decode error: {}", source), None)
            }
            other => DbError::statement(other.to_string(), None),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("refused");
        assert!(err.to_string().contains("connection failed"));

        let err = DbError::disposed("provider");
        assert!(err.to_string().contains("provider"));
    }

    #[test]
    fn test_statement_error_keeps_sql_state() {
        let err = DbError::statement("syntax error", Some("42601".to_string()));
        assert_eq!(err.sql_state(), Some("42601"));
        assert_eq!(DbError::connection("x").sql_state(), None);
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_statement() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::Statement { .. }));
    }

    #[test]
    fn test_sqlx_pool_closed_maps_to_connection() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::Connection { .. }));
    }
}
