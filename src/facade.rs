//! The `Database` facade.
//!
//! A thin, owned wrapper over a [`Provider`] for callers that want a single
//! handle with its own lifecycle instead of managing the provider directly.
//! The facade tracks its own disposal flag: once closed, it rejects further
//! calls even though it closes the underlying provider exactly once.

use crate::backend::BackendKind;
use crate::error::{DbError, DbResult};
use crate::params::Params;
use crate::provider::{Provider, create_provider};
use crate::row::{Record, Row};
use crate::value::FromSql;
use std::sync::atomic::{AtomicBool, Ordering};

/// Open a database handle for the given backend and connection string.
///
/// Construction performs no I/O; connections are opened per statement.
pub fn connect(kind: BackendKind, connection_string: &str) -> DbResult<Database> {
    Ok(Database::new(create_provider(kind, connection_string)?))
}

/// An owned database handle bound to one backend.
#[derive(Debug)]
pub struct Database {
    provider: Provider,
    disposed: AtomicBool,
}

impl Database {
    /// Wrap an existing provider.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            disposed: AtomicBool::new(false),
        }
    }

    /// The backend this handle dispatches to, in canonical form.
    pub fn backend(&self) -> BackendKind {
        self.provider.backend()
    }

    /// Whether this handle has been closed.
    pub fn is_closed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Close the handle and its provider. Safe to call more than once.
    pub fn close(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.provider.close();
        }
    }

    fn ensure_open(&self) -> DbResult<()> {
        if self.is_closed() {
            return Err(DbError::disposed("database"));
        }
        Ok(())
    }

    /// Run a non-result-returning statement; returns the affected row count.
    pub async fn execute(&self, statement: &str, params: &Params) -> DbResult<u64> {
        self.ensure_open()?;
        self.provider.execute(statement, params).await
    }

    /// Run a query and map every row into a structural record shape.
    pub async fn query<T: Record>(&self, statement: &str, params: &Params) -> DbResult<Vec<T>> {
        self.ensure_open()?;
        self.provider.query(statement, params).await
    }

    /// Run a query and map the first column of every row into a scalar shape.
    pub async fn query_scalar<T: FromSql + Default>(
        &self,
        statement: &str,
        params: &Params,
    ) -> DbResult<Vec<T>> {
        self.ensure_open()?;
        self.provider.query_scalar(statement, params).await
    }

    /// Run a query expected to yield at most one row.
    pub async fn query_single<T: Record>(
        &self,
        statement: &str,
        params: &Params,
    ) -> DbResult<Option<T>> {
        self.ensure_open()?;
        self.provider.query_single(statement, params).await
    }

    /// Single-row variant of [`query_scalar`](Self::query_scalar).
    pub async fn query_single_scalar<T: FromSql + Default>(
        &self,
        statement: &str,
        params: &Params,
    ) -> DbResult<Option<T>> {
        self.ensure_open()?;
        self.provider.query_single_scalar(statement, params).await
    }

    /// Fetch raw rows without mapping them into a target shape.
    pub async fn query_rows(&self, statement: &str, params: &Params) -> DbResult<Vec<Row>> {
        self.ensure_open()?;
        self.provider.query_rows(statement, params).await
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close();
    }
}
