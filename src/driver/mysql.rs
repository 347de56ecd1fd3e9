//! MySQL/MariaDB binding over sqlx.
//!
//! MariaDB speaks the MySQL wire protocol, so both backend kinds route here.

use super::{Driver, connect_error};
use crate::backend::BackendKind;
use crate::error::{DbError, DbResult};
use crate::params::{ParamStyle, Params, expand};
use crate::row::Row;
use crate::value::{SqlValue, TypeCategory, categorize_type};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::mysql::{MySqlArguments, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row as _, TypeInfo};
use tracing::debug;

type MySqlQuery<'q> = sqlx::query::Query<'q, sqlx::MySql, MySqlArguments>;

pub(crate) struct MySqlDriver {
    connection_string: String,
}

impl MySqlDriver {
    pub(crate) fn new(connection_string: String) -> Self {
        Self { connection_string }
    }

    async fn open(&self) -> DbResult<MySqlConnection> {
        MySqlConnection::connect(&self.connection_string)
            .await
            .map_err(connect_error)
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn execute(&self, statement: &str, params: &Params) -> DbResult<u64> {
        let (sql, values) = expand(statement, params, ParamStyle::Question, true)?;
        let mut conn = self.open().await?;
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        let result = query.execute(&mut conn).await;
        let _ = conn.close().await;
        let affected = result.map_err(DbError::from)?.rows_affected();
        debug!(backend = "mysql", affected, "statement executed");
        Ok(affected)
    }

    async fn fetch(&self, statement: &str, params: &Params) -> DbResult<Vec<Row>> {
        let (sql, values) = expand(statement, params, ParamStyle::Question, true)?;
        let mut conn = self.open().await?;
        let mut query = sqlx::query(&sql);
        for value in &values {
            query = bind_value(query, value);
        }
        let result = query.fetch_all(&mut conn).await;
        let _ = conn.close().await;
        let rows = result.map_err(DbError::from)?;
        debug!(backend = "mysql", rows = rows.len(), "statement fetched");
        Ok(rows.iter().map(decode_row).collect())
    }
}

fn bind_value<'q>(query: MySqlQuery<'q>, value: &'q SqlValue) -> MySqlQuery<'q> {
    match value {
        SqlValue::Null => query.bind(None::<String>),
        SqlValue::Bool(v) => query.bind(*v),
        SqlValue::Int(v) => query.bind(*v),
        SqlValue::Float(v) => query.bind(*v),
        SqlValue::Text(v) => query.bind(v.as_str()),
        SqlValue::Bytes(v) => query.bind(v.as_slice()),
        // The server coerces the text form into DECIMAL columns exactly
        SqlValue::Decimal(v) => query.bind(v.as_str()),
        SqlValue::Date(v) => query.bind(*v),
        SqlValue::Time(v) => query.bind(*v),
        SqlValue::DateTime(v) => query.bind(*v),
        // No native UUID type; the canonical hyphenated form round-trips
        // through CHAR(36) columns
        SqlValue::Uuid(v) => query.bind(v.to_string()),
    }
}

fn decode_row(row: &MySqlRow) -> Row {
    let columns = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let category = categorize_type(col.type_info().name(), BackendKind::MySql);
            (col.name().to_string(), decode_column(row, idx, category))
        })
        .collect();
    Row::new(columns)
}

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> SqlValue {
    match category {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal => decode_decimal(row, idx),
        // TINYINT(1) is reported as BOOLEAN
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
            _ => SqlValue::Null,
        },
        TypeCategory::Time => match row.try_get::<Option<NaiveTime>, _>(idx) {
            Ok(Some(v)) => SqlValue::Time(v),
            _ => SqlValue::Null,
        },
        TypeCategory::DateTime => decode_datetime(row, idx),
        TypeCategory::Uuid | TypeCategory::Text | TypeCategory::Unknown => decode_text(row, idx),
    }
}

fn decode_integer(row: &MySqlRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
        return SqlValue::Int(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
        return SqlValue::Int(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
        return SqlValue::Int(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
        return SqlValue::Int(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
        // BIGINT UNSIGNED above i64::MAX keeps its exact text form
        return match i64::try_from(v) {
            Ok(v) => SqlValue::Int(v),
            Err(_) => SqlValue::Decimal(v.to_string()),
        };
    }
    SqlValue::Null
}

fn decode_float(row: &MySqlRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
        return SqlValue::Float(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
        return SqlValue::Float(v);
    }
    SqlValue::Null
}

fn decode_decimal(row: &MySqlRow, idx: usize) -> SqlValue {
    match row.try_get::<Option<rust_decimal::Decimal>, _>(idx) {
        Ok(Some(v)) => SqlValue::Decimal(v.to_string()),
        _ => SqlValue::Null,
    }
}

fn decode_datetime(row: &MySqlRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
        return SqlValue::DateTime(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<DateTime<Utc>>, _>(idx) {
        return SqlValue::DateTime(v.naive_utc());
    }
    SqlValue::Null
}

fn decode_text(row: &MySqlRow, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<Option<String>, _>(idx) {
        return SqlValue::Text(v);
    }
    // Some TEXT-family columns surface as byte payloads
    if let Ok(Some(v)) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return match String::from_utf8(v) {
            Ok(s) => SqlValue::Text(s),
            Err(e) => SqlValue::Bytes(e.into_bytes()),
        };
    }
    SqlValue::Null
}
