//! Backend dispatch tags.
//!
//! `BackendKind` is a closed enumeration used only as a dispatch key when
//! constructing a provider. It carries no connection state.

use crate::error::DbError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    SqlServer,
    Postgres,
    MySql,
    /// Wire-compatible with MySQL; resolves to the same binding.
    MariaDb,
    SQLite,
    Oracle,
    Firebird,
}

impl BackendKind {
    /// Resolve aliases to the binding that actually serves them.
    ///
    /// MariaDB speaks the MySQL protocol; keeping a separate tag but a single
    /// code path is deliberate.
    pub fn canonical(self) -> Self {
        match self {
            Self::MariaDb => Self::MySql,
            other => other,
        }
    }

    /// Get the display name for this backend.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::SqlServer => "SQL Server",
            Self::Postgres => "PostgreSQL",
            Self::MySql => "MySQL",
            Self::MariaDb => "MariaDB",
            Self::SQLite => "SQLite",
            Self::Oracle => "Oracle",
            Self::Firebird => "Firebird",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for BackendKind {
    type Err = DbError;

    /// Parse a textual backend tag. Unknown tags fail with `UnsupportedBackend`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Self::SqlServer),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "mariadb" => Ok(Self::MariaDb),
            "sqlite" => Ok(Self::SQLite),
            "oracle" => Ok(Self::Oracle),
            "firebird" => Ok(Self::Firebird),
            other => Err(DbError::unsupported_backend(other)),
        }
    }
}
