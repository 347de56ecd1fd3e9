//! Dynamic result rows and target-shape mapping.
//!
//! A [`Row`] is the driver-agnostic form of one fetched row: the column
//! names and dynamic values, in column order. Mapping into a caller type
//! goes one of two ways:
//!
//! - scalar shapes read the row's first column only;
//! - structural shapes implement [`Record`], an explicit per-type mapping
//!   from column name to field, so no runtime reflection is involved. The
//!   [`impl_record!`](crate::impl_record) macro generates the usual
//!   implementation.

use crate::error::DbResult;
use crate::value::{FromSql, SqlValue};

/// One fetched row: `(column name, value)` pairs in column order.
#[derive(Debug, Clone, Default)]
pub struct Row {
    columns: Vec<(String, SqlValue)>,
}

impl Row {
    /// Build a row from named column values.
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Number of columns in the row.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Look up a column value by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .find(|(column, _)| column.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Iterate over `(name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Consume the row, yielding the first column's value if any.
    pub fn into_first(self) -> Option<SqlValue> {
        self.columns.into_iter().next().map(|(_, value)| value)
    }

    /// Consume the row into its `(name, value)` pairs.
    pub fn into_columns(self) -> Vec<(String, SqlValue)> {
        self.columns
    }
}

/// A structural record shape with named, writable fields.
///
/// `assign` receives one non-NULL column value and either coerces it into
/// the matching field (matched case-insensitively) or ignores it when no
/// field matches. The shape must be default-constructible; fields without a
/// matching column keep their defaults.
pub trait Record: Default {
    fn assign(&mut self, column: &str, value: SqlValue) -> DbResult<()>;
}

/// Map one row into a structural record shape.
///
/// NULL columns are skipped so the target field keeps its default value; an
/// explicit NULL is deliberately indistinguishable from an absent column in
/// the mapped record. Coercion failures surface as `DbError::Coercion`.
pub fn map_record<T: Record>(row: Row) -> DbResult<T> {
    let mut target = T::default();
    for (name, value) in row.into_columns() {
        if value.is_null() {
            continue;
        }
        target.assign(&name, value)?;
    }
    Ok(target)
}

/// Map one row into a scalar shape.
///
/// Only the first column is read, even when the query selected several. A
/// NULL first column or a zero-column row yields the shape's default value
/// instead of failing.
pub fn map_scalar<T: FromSql + Default>(row: Row) -> DbResult<T> {
    match row.into_first() {
        None | Some(SqlValue::Null) => Ok(T::default()),
        Some(value) => T::from_sql(value),
    }
}
