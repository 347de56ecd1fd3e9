//! Provider construction and statement execution.
//!
//! A [`Provider`] pairs one backend driver with a disposal flag and exposes
//! the five statement operations. [`create_provider`] is the factory that
//! maps a backend tag to the driver compiled for it; callers with an engine
//! this crate does not bind can implement [`Driver`](crate::Driver)
//! themselves and use [`Provider::from_driver`].

use crate::backend::BackendKind;
use crate::driver::Driver;
use crate::error::{DbError, DbResult};
use crate::params::Params;
use crate::row::{Record, Row, map_record, map_scalar};
use crate::value::FromSql;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Build a provider for the given backend and connection string.
///
/// This validates the arguments and selects a driver binding; it performs no
/// I/O, so a provider for an unreachable server is created successfully and
/// fails on first use. A backend without a compiled binding (Oracle,
/// Firebird, or a feature that was switched off) fails with
/// `UnsupportedBackend`.
pub fn create_provider(kind: BackendKind, connection_string: &str) -> DbResult<Provider> {
    if connection_string.trim().is_empty() {
        return Err(DbError::invalid_argument("connection string must not be empty"));
    }
    let canonical = kind.canonical();
    let driver: Box<dyn Driver> = match canonical {
        #[cfg(feature = "postgres")]
        BackendKind::Postgres => Box::new(crate::driver::postgres::PostgresDriver::new(
            connection_string.to_string(),
        )),
        #[cfg(feature = "mysql")]
        BackendKind::MySql => Box::new(crate::driver::mysql::MySqlDriver::new(
            connection_string.to_string(),
        )),
        #[cfg(feature = "sqlite")]
        BackendKind::SQLite => Box::new(crate::driver::sqlite::SqliteDriver::new(
            connection_string.to_string(),
        )),
        #[cfg(feature = "mssql")]
        BackendKind::SqlServer => Box::new(crate::driver::mssql::MssqlDriver::new(
            connection_string.to_string(),
        )),
        other => {
            return Err(match feature_hint(other) {
                Some(feature) => DbError::unsupported_backend(format!(
                    "{} (enable the `{feature}` cargo feature)",
                    other.display_name()
                )),
                None => DbError::unsupported_backend(other.display_name()),
            });
        }
    };
    debug!(backend = %canonical, "provider created");
    Ok(Provider::from_driver(driver))
}

/// The cargo feature that would compile a binding for this backend, if one
/// exists.
fn feature_hint(kind: BackendKind) -> Option<&'static str> {
    match kind {
        BackendKind::SqlServer => Some("mssql"),
        BackendKind::Postgres => Some("postgres"),
        BackendKind::MySql | BackendKind::MariaDb => Some("mysql"),
        BackendKind::SQLite => Some("sqlite"),
        BackendKind::Oracle | BackendKind::Firebird => None,
    }
}

/// One backend binding plus lifecycle state.
///
/// All statement operations are `&self`; the disposal flag is atomic, so a
/// provider can be shared across tasks. Every operation checks the flag
/// before touching the network.
pub struct Provider {
    driver: Box<dyn Driver>,
    disposed: AtomicBool,
}

impl Provider {
    /// Wrap a caller-supplied driver binding.
    pub fn from_driver(driver: Box<dyn Driver>) -> Self {
        Self {
            driver,
            disposed: AtomicBool::new(false),
        }
    }

    /// The backend this provider dispatches to, in canonical form.
    pub fn backend(&self) -> BackendKind {
        self.driver.kind()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Mark the provider closed. Idempotent; there is no pooled state to
    /// release since every call owns its own connection.
    pub fn close(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            debug!(backend = %self.backend(), "provider closed");
        }
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.is_closed() {
            return Err(DbError::disposed("provider"));
        }
        Ok(())
    }

    /// Run a non-result-returning statement; returns the affected row count.
    pub async fn execute(&self, statement: &str, params: &Params) -> DbResult<u64> {
        self.ensure_open()?;
        self.driver.execute(statement, params).await
    }

    /// Run a query and map every row into a structural record shape.
    pub async fn query<T: Record>(&self, statement: &str, params: &Params) -> DbResult<Vec<T>> {
        self.ensure_open()?;
        let rows = self.driver.fetch(statement, params).await?;
        rows.into_iter().map(map_record).collect()
    }

    /// Run a query and map the first column of every row into a scalar shape.
    pub async fn query_scalar<T: FromSql + Default>(
        &self,
        statement: &str,
        params: &Params,
    ) -> DbResult<Vec<T>> {
        self.ensure_open()?;
        let rows = self.driver.fetch(statement, params).await?;
        rows.into_iter().map(map_scalar).collect()
    }

    /// Run a query expected to yield at most one row; `None` when it yields
    /// none. Extra rows beyond the first are discarded.
    pub async fn query_single<T: Record>(
        &self,
        statement: &str,
        params: &Params,
    ) -> DbResult<Option<T>> {
        self.ensure_open()?;
        let rows = self.driver.fetch(statement, params).await?;
        rows.into_iter().next().map(map_record).transpose()
    }

    /// Single-row variant of [`query_scalar`](Self::query_scalar).
    pub async fn query_single_scalar<T: FromSql + Default>(
        &self,
        statement: &str,
        params: &Params,
    ) -> DbResult<Option<T>> {
        self.ensure_open()?;
        let rows = self.driver.fetch(statement, params).await?;
        rows.into_iter().next().map(map_scalar).transpose()
    }

    /// Fetch raw rows without mapping them into a target shape.
    pub async fn query_rows(&self, statement: &str, params: &Params) -> DbResult<Vec<Row>> {
        self.ensure_open()?;
        self.driver.fetch(statement, params).await
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("backend", &self.backend())
            .field("disposed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;

    #[test]
    fn test_empty_connection_string_is_rejected() {
        for kind in [
            BackendKind::Postgres,
            BackendKind::MySql,
            BackendKind::SQLite,
            BackendKind::Oracle,
        ] {
            let err = create_provider(kind, "   ").unwrap_err();
            assert!(matches!(err, DbError::InvalidArgument { .. }), "{kind:?}");
        }
    }

    #[test]
    fn test_unbound_backends_are_unsupported() {
        let err = create_provider(BackendKind::Oracle, "oracle://x").unwrap_err();
        assert!(matches!(err, DbError::UnsupportedBackend { .. }));
        assert!(err.to_string().contains("Oracle"));

        let err = create_provider(BackendKind::Firebird, "firebird://x").unwrap_err();
        assert!(matches!(err, DbError::UnsupportedBackend { .. }));
    }

    #[cfg(not(feature = "mssql"))]
    #[test]
    fn test_disabled_feature_error_names_the_feature() {
        let err = create_provider(BackendKind::SqlServer, "Server=localhost;").unwrap_err();
        assert!(matches!(err, DbError::UnsupportedBackend { .. }));
        assert!(err.to_string().contains("mssql"), "{err}");
    }

    #[cfg(feature = "mysql")]
    #[test]
    fn test_mariadb_routes_to_mysql_driver() {
        let provider = create_provider(BackendKind::MariaDb, "mysql://localhost/db").unwrap();
        assert_eq!(provider.backend(), BackendKind::MySql);
    }

    #[cfg(feature = "sqlite")]
    #[tokio::test]
    async fn test_disposed_provider_fails_without_io() {
        let provider = create_provider(BackendKind::SQLite, "sqlite::memory:").unwrap();
        provider.close();
        let err = provider.execute("SELECT 1", &params! {}).await.unwrap_err();
        assert!(matches!(err, DbError::Disposed { .. }));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_close_is_idempotent() {
        let provider = create_provider(BackendKind::SQLite, "sqlite::memory:").unwrap();
        assert!(!provider.is_closed());
        provider.close();
        provider.close();
        assert!(provider.is_closed());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_factory_performs_no_io() {
        // A provider for an unreachable file is still created successfully
        let provider =
            create_provider(BackendKind::SQLite, "sqlite:///nonexistent/dir/db.sqlite").unwrap();
        assert_eq!(provider.backend(), BackendKind::SQLite);
    }
}
