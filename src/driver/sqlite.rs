//! SQLite binding over sqlx.
//!
//! SQLite is dynamically typed; column type names reflect declared affinity
//! for table columns and the value's storage class for computed ones. Decode
//! cascades fall back to text, which coercion can still narrow later.

use super::{Driver, connect_error};
use crate::backend::BackendKind;
use crate::error::{DbError, DbResult};
use crate::params::{ParamStyle, Params, expand};
use crate::row::Row;
use crate::value::{SqlValue, TypeCategory, categorize_type};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row as _, TypeInfo};
use tracing::debug;

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, SqliteArguments<'q>>;

pub(crate) struct SqliteDriver {
    connection_string: String,
}

impl SqliteDriver {
    pub(crate) fn new(connection_string: String) -> Self {
        Self { connection_string }
    }

    async fn open(&self) -> DbResult<SqliteConnection> {
        SqliteConnection::connect(&self.connection_string)
            .await
            .map_err(connect_error)
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::SQLite
    }

    async fn execute(&self, statement: &str, params: &Params) -> DbResult<u64> {
        let (sql, values) = expand(statement, params, ParamStyle::Question, false)?;
        let mut conn = self.open().await?;
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        let result = query.execute(&mut conn).await;
        let _ = conn.close().await;
        let affected = result.map_err(DbError::from)?.rows_affected();
        debug!(backend = "sqlite", affected, "statement executed");
        Ok(affected)
    }

    async fn fetch(&self, statement: &str, params: &Params) -> DbResult<Vec<Row>> {
        let (sql, values) = expand(statement, params, ParamStyle::Question, false)?;
        let mut conn = self.open().await?;
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        let result = query.fetch_all(&mut conn).await;
        let _ = conn.close().await;
        let rows = result.map_err(DbError::from)?;
        debug!(backend = "sqlite", rows = rows.len(), "statement fetched");
        Ok(rows.iter().map(decode_row).collect())
    }
}

fn bind_value<'q>(query: SqliteQuery<'q>, value: &'q SqlValue) -> SqliteQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        SqlValue::Decimal(v) => query.bind(v.as_str()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Uuid(v) => query.bind(v.to_string()),
    }
}

fn decode_row(row: &SqliteRow) -> Row {
    let columns = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let category = categorize_type(col.type_info().name(), BackendKind::SQLite);
            (col.name().to_string(), decode_column(row, idx, category))
        })
        .collect();
    Row::new(columns)
}

fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> SqlValue {
    match category {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float | TypeCategory::Decimal => decode_float(row, idx),
        TypeCategory::Boolean => match row.try_get::<Option<bool>, _>(idx) {
            Ok(Some(v)) => SqlValue::Bool(v),
            _ => decode_integer(row, idx),
        },
        TypeCategory::Binary => match row.try_get::<Option<Vec<u8>>, _>(idx) {
            Ok(Some(v)) => SqlValue::Bytes(v),
            _ => SqlValue::Null,
        },
        TypeCategory::Date => match row.try_get::<Option<NaiveDate>, _>(idx) {
            Ok(Some(v)) => SqlValue::Date(v),
            _ => decode_text(row, idx),
        },
        TypeCategory::Time => match row.try_get::<Option<NaiveTime>, _>(idx) {
            Ok(Some(v)) => SqlValue::Time(v),
            _ => decode_text(row, idx),
        },
        TypeCategory::DateTime => match row.try_get::<Option<NaiveDateTime>, _>(idx) {
            Ok(Some(v)) => SqlValue::DateTime(v),
            _ => decode_text(row, idx),
        },
        TypeCategory::Text => decode_text(row, idx),
        TypeCategory::Uuid | TypeCategory::Unknown => decode_dynamic(row, idx),
    }
}

fn decode_integer(row: &SqliteRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return SqlValue::Int(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
        return SqlValue::Int(v.into());
    }
    SqlValue::Null
}

fn decode_float(row: &SqliteRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return SqlValue::Float(v);
    }
    // NUMERIC affinity may still hold an integer storage class
    decode_integer(row, idx)
}

fn decode_text(row: &SqliteRow, idx: usize) -> SqlValue {
    match row.try_get::<Option<String>, _>(idx) {
        Ok(Some(v)) => SqlValue::Text(v),
        _ => SqlValue::Null,
    }
}

/// Decode by storage class when the declared type tells us nothing.
fn decode_dynamic(row: &SqliteRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        return SqlValue::Text(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return SqlValue::Int(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return SqlValue::Float(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return SqlValue::Bytes(v);
    }
    SqlValue::Null
}
