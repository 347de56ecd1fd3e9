//! SQL Server binding over tiberius.
//!
//! Connection strings are ADO.NET style (`Server=...;Database=...;User
//! Id=...;Password=...`). Unlike the sqlx bindings there is no URL form, and
//! column types arrive as TDS type tokens rather than names.

use super::{Driver, connect_error};
use crate::backend::BackendKind;
use crate::error::{DbError, DbResult};
use crate::params::{ParamStyle, Params, expand};
use crate::row::Row;
use crate::value::SqlValue;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tiberius::{Client, ColumnType, Config, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

type MssqlClient = Client<Compat<TcpStream>>;

pub(crate) struct MssqlDriver {
    connection_string: String,
}

impl MssqlDriver {
    pub(crate) fn new(connection_string: String) -> Self {
        Self { connection_string }
    }

    async fn open(&self) -> DbResult<MssqlClient> {
        let config = Config::from_ado_string(&self.connection_string).map_err(connect_error)?;
        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(connect_error)?;
        tcp.set_nodelay(true).map_err(connect_error)?;
        Client::connect(config, tcp.compat_write())
            .await
            .map_err(connect_error)
    }
}

#[async_trait]
impl Driver for MssqlDriver {
    fn kind(&self) -> BackendKind {
        BackendKind::SqlServer
    }

    async fn execute(&self, statement: &str, params: &Params) -> DbResult<u64> {
        let (sql, values) = expand(statement, params, ParamStyle::AtNumbered, false)?;
        let boxed = to_sql_params(&values);
        let refs: Vec<&dyn ToSql> = boxed.iter().map(Box::as_ref).collect();
        let mut client = self.open().await?;
        let result = client.execute(&sql, &refs).await;
        let _ = client.close().await;
        let affected = result.map_err(statement_error)?.total();
        debug!(backend = "sqlserver", affected, "statement executed");
        Ok(affected)
    }

    async fn fetch(&self, statement: &str, params: &Params) -> DbResult<Vec<Row>> {
        let (sql, values) = expand(statement, params, ParamStyle::AtNumbered, false)?;
        let boxed = to_sql_params(&values);
        let refs: Vec<&dyn ToSql> = boxed.iter().map(Box::as_ref).collect();
        let mut client = self.open().await?;
        let result = match client.query(&sql, &refs).await {
            Ok(stream) => stream.into_first_result().await,
            Err(e) => Err(e),
        };
        let _ = client.close().await;
        let rows = result.map_err(statement_error)?;
        debug!(backend = "sqlserver", rows = rows.len(), "statement fetched");
        Ok(rows.iter().map(decode_row).collect())
    }
}

fn statement_error(err: tiberius::error::Error) -> DbError {
    match err {
        tiberius::error::Error::Io { .. } | tiberius::error::Error::Tls(_) => {
            DbError::connection(err.to_string())
        }
        other => DbError::statement(other.to_string(), None),
    }
}

fn to_sql_params(values: &[SqlValue]) -> Vec<Box<dyn ToSql>> {
    values
        .iter()
        .map(|value| -> Box<dyn ToSql> {
            match value {
                SqlValue::Null => Box::new(None::<i32>),
                SqlValue::Bool(v) => Box::new(*v),
                SqlValue::Int(v) => Box::new(*v),
                SqlValue::Float(v) => Box::new(*v),
                SqlValue::Text(v) => Box::new(v.clone()),
                SqlValue::Bytes(v) => Box::new(v.clone()),
                SqlValue::Decimal(v) => match v.parse::<rust_decimal::Decimal>() {
                    Ok(d) => Box::new(d),
                    Err(_) => Box::new(v.clone()),
                },
                SqlValue::Date(v) => Box::new(*v),
                SqlValue::Time(v) => Box::new(*v),
                SqlValue::DateTime(v) => Box::new(*v),
                SqlValue::Uuid(v) => Box::new(*v),
            }
        })
        .collect()
}

fn decode_row(row: &tiberius::Row) -> Row {
    let columns = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| (col.name().to_string(), decode_column(row, idx, col.column_type())))
        .collect();
    Row::new(columns)
}

fn decode_column(row: &tiberius::Row, idx: usize, column_type: ColumnType) -> SqlValue {
    match column_type {
        ColumnType::Null => SqlValue::Null,
        ColumnType::Bit | ColumnType::Bitn => row
            .try_get::<bool, _>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Bool)
            .unwrap_or(SqlValue::Null),
        ColumnType::Int1 => decode_with(row, idx, |v: u8| SqlValue::Int(v.into())),
        ColumnType::Int2 => decode_with(row, idx, |v: i16| SqlValue::Int(v.into())),
        ColumnType::Int4 => decode_with(row, idx, |v: i32| SqlValue::Int(v.into())),
        ColumnType::Int8 => decode_with(row, idx, SqlValue::Int),
        ColumnType::Intn => decode_integer(row, idx),
        ColumnType::Float4 => decode_with(row, idx, |v: f32| SqlValue::Float(v.into())),
        ColumnType::Float8 => decode_with(row, idx, SqlValue::Float),
        ColumnType::Floatn => decode_float(row, idx),
        ColumnType::Decimaln | ColumnType::Numericn => row
            .try_get::<rust_decimal::Decimal, _>(idx)
            .ok()
            .flatten()
            .map(|v| SqlValue::Decimal(v.to_string()))
            .unwrap_or(SqlValue::Null),
        ColumnType::Money | ColumnType::Money4 => decode_float(row, idx),
        ColumnType::Guid => decode_with(row, idx, SqlValue::Uuid),
        ColumnType::Daten => decode_with(row, idx, SqlValue::Date),
        ColumnType::Timen => decode_with(row, idx, SqlValue::Time),
        ColumnType::Datetime
        | ColumnType::Datetime4
        | ColumnType::Datetimen
        | ColumnType::Datetime2 => decode_with(row, idx, SqlValue::DateTime),
        ColumnType::DatetimeOffsetn => row
            .try_get::<DateTime<Utc>, _>(idx)
            .ok()
            .flatten()
            .map(|v| SqlValue::DateTime(v.naive_utc()))
            .unwrap_or(SqlValue::Null),
        ColumnType::BigBinary | ColumnType::BigVarBin | ColumnType::Image => row
            .try_get::<&[u8], _>(idx)
            .ok()
            .flatten()
            .map(|v| SqlValue::Bytes(v.to_vec()))
            .unwrap_or(SqlValue::Null),
        _ => decode_text(row, idx),
    }
}

fn decode_with<'a, T, F>(row: &'a tiberius::Row, idx: usize, wrap: F) -> SqlValue
where
    T: tiberius::FromSql<'a>,
    F: FnOnce(T) -> SqlValue,
{
    row.try_get::<T, _>(idx).ok().flatten().map(wrap).unwrap_or(SqlValue::Null)
}

fn decode_integer(row: &tiberius::Row, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<u8, _>(idx) {
        return SqlValue::Int(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<i16, _>(idx) {
        return SqlValue::Int(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<i32, _>(idx) {
        return SqlValue::Int(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<i64, _>(idx) {
        return SqlValue::Int(v);
    }
    SqlValue::Null
}

fn decode_float(row: &tiberius::Row, idx: usize) -> SqlValue {
    if let Ok(Some(v)) = row.try_get::<f32, _>(idx) {
        return SqlValue::Float(v.into());
    }
    if let Ok(Some(v)) = row.try_get::<f64, _>(idx) {
        return SqlValue::Float(v);
    }
    SqlValue::Null
}

fn decode_text(row: &tiberius::Row, idx: usize) -> SqlValue {
    match row.try_get::<&str, _>(idx) {
        Ok(Some(v)) => SqlValue::Text(v.to_string()),
        _ => SqlValue::Null,
    }
}
