//! Backend driver bindings.
//!
//! [`Driver`] is the capability interface every backend binding satisfies:
//! open a connection, bind parameters, run a statement, decode rows. The
//! generic provider depends only on this trait, never on concrete backend
//! types. Bindings are organized in submodules:
//!
//! - `postgres`, `mysql`, `sqlite`: sqlx-backed, one short-lived connection
//!   per call
//! - `mssql`: tiberius-backed (feature `mssql`)
//!
//! Each submodule provides identical functionality adapted to the backend's
//! placeholder style and type system. The trait is public so callers can
//! supply bindings for engines this crate does not compile.

use crate::backend::BackendKind;
use crate::error::{DbError, DbResult};
use crate::params::Params;
use crate::row::Row;
use async_trait::async_trait;

#[cfg(feature = "mssql")]
pub(crate) mod mssql;
#[cfg(feature = "mysql")]
pub(crate) mod mysql;
#[cfg(feature = "postgres")]
pub(crate) mod postgres;
#[cfg(feature = "sqlite")]
pub(crate) mod sqlite;

/// Capability interface for one backend binding.
///
/// Implementations hold only the connection string; every call opens and
/// fully owns its own connection, so a binding is safe to share across
/// concurrent calls without locking. The connection must be released on
/// every exit path, including failure.
#[async_trait]
pub trait Driver: Send + Sync {
    /// The backend this binding serves.
    fn kind(&self) -> BackendKind;

    /// Run a non-result-returning statement and report the affected row count.
    async fn execute(&self, statement: &str, params: &Params) -> DbResult<u64>;

    /// Run a result-returning statement, materializing the rows to exhaustion.
    async fn fetch(&self, statement: &str, params: &Params) -> DbResult<Vec<Row>>;
}

/// Failures while opening a connection always surface as `Connection`,
/// regardless of how the backend classified them.
#[allow(dead_code)]
pub(crate) fn connect_error(err: impl std::fmt::Display) -> DbError {
    DbError::connection(err.to_string())
}
