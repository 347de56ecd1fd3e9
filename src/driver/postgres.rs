//! PostgreSQL binding over sqlx.

use super::{Driver, connect_error};
use crate::backend::BackendKind;
use crate::error::{DbError, DbResult};
use crate::params::{ParamStyle, Params, expand};
use crate::row::Row;
use crate::value::{SqlValue, TypeCategory, categorize_type};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgConnection, PgRow};
use sqlx::{Column, Connection, Row as _, TypeInfo};
use tracing::debug;

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

pub(crate) struct PostgresDriver {
    connection_string: String,
}

impl PostgresDriver {
    pub(crate) fn new(connection_string: String) -> Self {
        Self { connection_string }
    }

    async fn open(&self) -> DbResult<PgConnection> {
        PgConnection::connect(&self.connection_string)
            .await
            .map_err(connect_error)
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn execute(&self, statement: &str, params: &Params) -> DbResult<u64> {
        let (sql, values) = expand(statement, params, ParamStyle::Numbered, false)?;
        let mut conn = self.open().await?;
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        let result = query.execute(&mut conn).await;
        let _ = conn.close().await;
        let affected = result.map_err(DbError::from)?.rows_affected();
        debug!(backend = "postgres", affected, "statement executed");
        Ok(affected)
    }

    async fn fetch(&self, statement: &str, params: &Params) -> DbResult<Vec<Row>> {
        let (sql, values) = expand(statement, params, ParamStyle::Numbered, false)?;
        let mut conn = self.open().await?;
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        let result = query.fetch_all(&mut conn).await;
        let _ = conn.close().await;
        let rows = result.map_err(DbError::from)?;
        debug!(backend = "postgres", rows = rows.len(), "statement fetched");
        Ok(rows.iter().map(decode_row).collect())
    }
}

fn bind_value<'q>(query: PgQuery<'q>, value: &'q SqlValue) -> PgQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        // Bind exact numerics natively so NUMERIC columns accept them
        SqlValue::Decimal(v) => match v.parse::<rust_decimal::Decimal>() {
            Ok(d) => query.bind(d),
            Err(_) => query.bind(v.as_str()),
        },
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        SqlValue::Uuid(v) => query.bind(*v),
    }
}

fn decode_row(row: &PgRow) -> Row {
    let columns = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let category = categorize_type(col.type_info().name(), BackendKind::Postgres);
            (col.name().to_string(), decode_column(row, idx, category))
        })
        .collect();
    Row::new(columns)
}

fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> SqlValue {
    match category {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal => decode_decimal(row, idx),
        TypeCategory::Boolean => match row.try_get::<Option<bool>, _>(idx) {
            Ok(Some(v)) => SqlValue::Bool(v),
            _ => SqlValue::Null,
        },
        TypeCategory::Uuid => match row.try_get::<Option<uuid::Uuid>, _>(idx) {
            Ok(Some(v)) => SqlValue::Uuid(v),
            _ => SqlValue::Null,
        },
        TypeCategory::Binary => match row.try_get::<Option<Vec<u8>>, _>(idx) {
            Ok(Some(v)) => SqlValue::Bytes(v),
            _ => SqlValue::Null,
        },
        TypeCategory::Date => match row.try_get::<Option<NaiveDate>, _>(idx) {
            Ok(Some(v)) => SqlValue::Date(v),
            _ => SqlValue::Null,
        },
        TypeCategory::Time => match row.try_get::<Option<NaiveTime>, _>(idx) {
            Ok(Some(v)) => SqlValue::Time(v),
            _ => SqlValue::Null,
        },
        TypeCategory::DateTime => decode_datetime(row, idx),
        TypeCategory::Text | TypeCategory::Unknown => decode_text(row, idx),
    }
}

fn decode_integer(row: &PgRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
        return SqlValue::Int(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
        return SqlValue::Int(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return SqlValue::Int(v);
    }
    SqlValue::Null
}

fn decode_float(row: &PgRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
        return SqlValue::Float(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return SqlValue::Float(v);
    }
    SqlValue::Null
}

fn decode_decimal(row: &PgRow, idx: usize) -> SqlValue {
    match row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
        Ok(Some(v)) => SqlValue::Decimal(v.to_string()),
        _ => SqlValue::Null,
    }
}

fn decode_datetime(row: &PgRow, idx: usize) -> SqlValue {
    // timestamptz arrives with an offset; normalize to UTC wall-clock
    if let Ok(Some(v)) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
        return SqlValue::DateTime(v.naive_utc());
    }
    if let Ok(Some(v)) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return SqlValue::DateTime(v);
    }
    SqlValue::Null
}

fn decode_text(row: &PgRow, idx: usize) -> SqlValue {
    match row.try_get::<Option<String>, _>(idx) {
        Ok(Some(v)) => SqlValue::Text(v),
        _ => SqlValue::Null,
    }
}
