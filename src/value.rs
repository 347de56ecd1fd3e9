//! Dynamic SQL values and type coercion.
//!
//! This module provides the unified value representation shared by parameter
//! binding and row decoding:
//!
//! 1. `SqlValue` is the dynamic value a driver produces or binds
//! 2. `TypeCategory` classifies backend column type names into logical categories
//! 3. `FromSql` coerces a dynamic value into a caller-requested static type
//!
//! SQL NULL is `SqlValue::Null` and is always distinct from a default/zero
//! value; what NULL means for a mapped target is decided by the row mapper,
//! not here.

use crate::backend::BackendKind;
use crate::error::{DbError, DbResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Dynamic Value
// =============================================================================

/// A dynamically typed SQL value.
///
/// Used both for parameter values bound into a statement and for column
/// values fetched from a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
    /// Exact DECIMAL/NUMERIC value, kept in its string representation
    Decimal(String),
    /// Calendar date
    Date(NaiveDate),
    /// Time of day
    Time(NaiveTime),
    /// Date and time without offset
    DateTime(NaiveDateTime),
    /// Unique identifier
    Uuid(Uuid),
}

impl SqlValue {
    /// Check if this value is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Decimal(_) => "decimal",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
            Self::Uuid(_) => "uuid",
        }
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident($conv:expr)),+ $(,)?) => {$(
        impl From<$ty> for SqlValue {
            fn from(v: $ty) -> Self {
                SqlValue::$variant($conv(v))
            }
        }
    )+};
}

value_from! {
    bool => Bool(std::convert::identity),
    i8 => Int(i64::from),
    i16 => Int(i64::from),
    i32 => Int(i64::from),
    i64 => Int(std::convert::identity),
    u32 => Int(i64::from),
    f32 => Float(f64::from),
    f64 => Float(std::convert::identity),
    String => Text(std::convert::identity),
    Vec<u8> => Bytes(std::convert::identity),
    NaiveDate => Date(std::convert::identity),
    NaiveTime => Time(std::convert::identity),
    NaiveDateTime => DateTime(std::convert::identity),
    Uuid => Uuid(std::convert::identity),
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_string())
    }
}

impl From<&[u8]> for SqlValue {
    fn from(v: &[u8]) -> Self {
        SqlValue::Bytes(v.to_vec())
    }
}

impl From<rust_decimal::Decimal> for SqlValue {
    fn from(v: rust_decimal::Decimal) -> Self {
        SqlValue::Decimal(v.to_string())
    }
}

impl From<chrono::DateTime<chrono::Utc>> for SqlValue {
    fn from(v: chrono::DateTime<chrono::Utc>) -> Self {
        SqlValue::DateTime(v.naive_utc())
    }
}

/// `None` binds as SQL NULL.
impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(inner) => inner.into(),
            None => SqlValue::Null,
        }
    }
}

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Date,
    Time,
    DateTime,
    Uuid,
    Unknown,
}

/// Classify a backend type name into a logical category.
pub fn categorize_type(type_name: &str, backend: BackendKind) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") || lower.contains("money") {
        // SQLite's NUMERIC affinity is actually a float
        if backend.canonical() == BackendKind::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // Date/time - "timestamp" and "datetime" contain "date"/"time", so order matters
    if lower.contains("timestamp") || lower.contains("datetime") {
        return TypeCategory::DateTime;
    }
    if lower == "date" || lower == "daten" {
        return TypeCategory::Date;
    }
    if lower == "time" || lower == "timetz" || lower == "timen" {
        return TypeCategory::Time;
    }

    // Integer types
    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    // Boolean
    if lower == "bool" || lower == "boolean" || lower == "bit" {
        return TypeCategory::Boolean;
    }

    // Float types
    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    // UUID (PostgreSQL "uuid", SQL Server "uniqueidentifier")
    if lower == "uuid" || lower == "uniqueidentifier" || lower == "guid" {
        return TypeCategory::Uuid;
    }

    // Binary types
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" || lower == "image" {
        return TypeCategory::Binary;
    }

    // Text types
    if lower.contains("char") || lower.contains("text") || lower == "string" {
        return TypeCategory::Text;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Coercion
// =============================================================================

/// Coerce a dynamic value into a statically typed one.
///
/// Implementations follow generic dynamic-value conversion semantics: numeric
/// widening and narrowing (narrowing fails on overflow rather than wrapping),
/// string-to-number parsing, and formatting into text. A value whose runtime
/// type cannot be converted fails with `DbError::Coercion`.
pub trait FromSql: Sized {
    fn from_sql(value: SqlValue) -> DbResult<Self>;
}

macro_rules! int_from_sql {
    ($($ty:ty),+ $(,)?) => {$(
        impl FromSql for $ty {
            fn from_sql(value: SqlValue) -> DbResult<Self> {
                let from = value.type_name();
                let wide: i64 = match value {
                    SqlValue::Int(v) => v,
                    SqlValue::Bool(v) => i64::from(v),
                    // Only integral floats in range convert; `as` would
                    // saturate and truncate
                    SqlValue::Float(v) => {
                        if v.fract() != 0.0 || v < i64::MIN as f64 || v >= i64::MAX as f64 {
                            return Err(DbError::coercion(from, stringify!($ty)));
                        }
                        v as i64
                    }
                    SqlValue::Text(s) | SqlValue::Decimal(s) => s
                        .trim()
                        .parse::<i64>()
                        .map_err(|_| DbError::coercion(from, stringify!($ty)))?,
                    _ => return Err(DbError::coercion(from, stringify!($ty))),
                };
                <$ty>::try_from(wide).map_err(|_| DbError::coercion(from, stringify!($ty)))
            }
        }
    )+};
}

int_from_sql!(i8, i16, i32, i64, u8, u16, u32, u64);

impl FromSql for f64 {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        let from = value.type_name();
        match value {
            SqlValue::Float(v) => Ok(v),
            SqlValue::Int(v) => Ok(v as f64),
            SqlValue::Bool(v) => Ok(f64::from(u8::from(v))),
            SqlValue::Text(s) | SqlValue::Decimal(s) => {
                s.trim().parse::<f64>().map_err(|_| DbError::coercion(from, "f64"))
            }
            _ => Err(DbError::coercion(from, "f64")),
        }
    }
}

impl FromSql for f32 {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        f64::from_sql(value).map(|v| v as f32)
    }
}

impl FromSql for bool {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        let from = value.type_name();
        match value {
            SqlValue::Bool(v) => Ok(v),
            SqlValue::Int(v) => Ok(v != 0),
            SqlValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(DbError::coercion(from, "bool")),
            },
            _ => Err(DbError::coercion(from, "bool")),
        }
    }
}

impl FromSql for String {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        let from = value.type_name();
        match value {
            SqlValue::Text(s) | SqlValue::Decimal(s) => Ok(s),
            SqlValue::Bool(v) => Ok(v.to_string()),
            SqlValue::Int(v) => Ok(v.to_string()),
            SqlValue::Float(v) => Ok(v.to_string()),
            SqlValue::Date(v) => Ok(v.format("%Y-%m-%d").to_string()),
            SqlValue::Time(v) => Ok(v.format("%H:%M:%S").to_string()),
            SqlValue::DateTime(v) => Ok(v.format("%Y-%m-%d %H:%M:%S").to_string()),
            SqlValue::Uuid(v) => Ok(v.to_string()),
            SqlValue::Bytes(b) => {
                String::from_utf8(b).map_err(|_| DbError::coercion("bytes", "String"))
            }
            SqlValue::Null => Err(DbError::coercion(from, "String")),
        }
    }
}

impl FromSql for Vec<u8> {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Bytes(b) => Ok(b),
            SqlValue::Text(s) => Ok(s.into_bytes()),
            other => Err(DbError::coercion(other.type_name(), "Vec<u8>")),
        }
    }
}

impl FromSql for Uuid {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        let from = value.type_name();
        match value {
            SqlValue::Uuid(v) => Ok(v),
            SqlValue::Text(s) => Uuid::parse_str(s.trim()).map_err(|_| DbError::coercion(from, "Uuid")),
            SqlValue::Bytes(b) => Uuid::from_slice(&b).map_err(|_| DbError::coercion(from, "Uuid")),
            _ => Err(DbError::coercion(from, "Uuid")),
        }
    }
}

impl FromSql for rust_decimal::Decimal {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        use rust_decimal::Decimal;
        let from = value.type_name();
        match value {
            SqlValue::Decimal(s) | SqlValue::Text(s) => {
                s.trim().parse::<Decimal>().map_err(|_| DbError::coercion(from, "Decimal"))
            }
            SqlValue::Int(v) => Ok(Decimal::from(v)),
            SqlValue::Float(v) => {
                Decimal::try_from(v).map_err(|_| DbError::coercion(from, "Decimal"))
            }
            _ => Err(DbError::coercion(from, "Decimal")),
        }
    }
}

impl FromSql for NaiveDateTime {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        let from = value.type_name();
        match value {
            SqlValue::DateTime(v) => Ok(v),
            SqlValue::Date(v) => Ok(v.and_time(NaiveTime::MIN)),
            SqlValue::Text(s) => parse_datetime(s.trim()).ok_or(DbError::coercion(from, "NaiveDateTime")),
            _ => Err(DbError::coercion(from, "NaiveDateTime")),
        }
    }
}

impl FromSql for NaiveDate {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        let from = value.type_name();
        match value {
            SqlValue::Date(v) => Ok(v),
            SqlValue::DateTime(v) => Ok(v.date()),
            SqlValue::Text(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|_| DbError::coercion(from, "NaiveDate")),
            _ => Err(DbError::coercion(from, "NaiveDate")),
        }
    }
}

impl FromSql for NaiveTime {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        let from = value.type_name();
        match value {
            SqlValue::Time(v) => Ok(v),
            SqlValue::DateTime(v) => Ok(v.time()),
            SqlValue::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f"))
                .map_err(|_| DbError::coercion(from, "NaiveTime")),
            _ => Err(DbError::coercion(from, "NaiveTime")),
        }
    }
}

impl FromSql for chrono::DateTime<chrono::Utc> {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        NaiveDateTime::from_sql(value).map(|v| v.and_utc())
    }
}

/// `Option<T>` is the nullable-primitive shape: NULL becomes `None` instead
/// of the inner type's default.
impl<T: FromSql> FromSql for Option<T> {
    fn from_sql(value: SqlValue) -> DbResult<Self> {
        match value {
            SqlValue::Null => Ok(None),
            other => T::from_sql(other).map(Some),
        }
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Ok(v) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(v.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(v) = NaiveDateTime::parse_from_str(s, format) {
            return Some(v);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_type_names() {
        assert!(SqlValue::Null.is_null());
        assert!(!SqlValue::Bool(true).is_null());
        assert_eq!(SqlValue::Int(42).type_name(), "int");
        assert_eq!(SqlValue::Text("x".into()).type_name(), "text");
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(7i32)), SqlValue::Int(7));
    }

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT", BackendKind::MySql), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT", BackendKind::Postgres), TypeCategory::Integer);
        assert_eq!(categorize_type("SERIAL", BackendKind::Postgres), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT", BackendKind::MySql), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_decimal() {
        assert_eq!(categorize_type("DECIMAL", BackendKind::MySql), TypeCategory::Decimal);
        assert_eq!(categorize_type("NUMERIC", BackendKind::Postgres), TypeCategory::Decimal);
        // SQLite NUMERIC affinity is a float
        assert_eq!(categorize_type("numeric", BackendKind::SQLite), TypeCategory::Float);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("TIMESTAMP", BackendKind::Postgres), TypeCategory::DateTime);
        assert_eq!(categorize_type("timestamptz", BackendKind::Postgres), TypeCategory::DateTime);
        assert_eq!(categorize_type("DATETIME", BackendKind::MySql), TypeCategory::DateTime);
        assert_eq!(categorize_type("DATE", BackendKind::MySql), TypeCategory::Date);
        assert_eq!(categorize_type("TIME", BackendKind::MySql), TypeCategory::Time);
    }

    #[test]
    fn test_int_coercions() {
        assert_eq!(i32::from_sql(SqlValue::Int(42)).unwrap(), 42);
        assert_eq!(i64::from_sql(SqlValue::Text("  30 ".into())).unwrap(), 30);
        assert_eq!(u8::from_sql(SqlValue::Int(255)).unwrap(), 255);
        assert_eq!(i64::from_sql(SqlValue::Bool(true)).unwrap(), 1);
    }

    #[test]
    fn test_float_to_int_requires_integral_in_range_value() {
        assert_eq!(i64::from_sql(SqlValue::Float(3.0)).unwrap(), 3);
        assert_eq!(i32::from_sql(SqlValue::Float(-2.0)).unwrap(), -2);
        assert!(i64::from_sql(SqlValue::Float(3.5)).is_err());
        assert!(i64::from_sql(SqlValue::Float(1e300)).is_err());
        assert!(i64::from_sql(SqlValue::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_int_narrowing_overflow_fails() {
        let err = i8::from_sql(SqlValue::Int(300)).unwrap_err();
        assert!(matches!(err, DbError::Coercion { .. }));
        assert!(u32::from_sql(SqlValue::Int(-1)).is_err());
    }

    #[test]
    fn test_float_and_decimal_coercions() {
        assert_eq!(f64::from_sql(SqlValue::Int(3)).unwrap(), 3.0);
        assert_eq!(f64::from_sql(SqlValue::Decimal("12.50".into())).unwrap(), 12.5);
        let d = rust_decimal::Decimal::from_sql(SqlValue::Decimal("19.99".into())).unwrap();
        assert_eq!(d.to_string(), "19.99");
    }

    #[test]
    fn test_bool_coercions() {
        assert!(bool::from_sql(SqlValue::Int(1)).unwrap());
        assert!(!bool::from_sql(SqlValue::Text("false".into())).unwrap());
        assert!(bool::from_sql(SqlValue::Text("maybe".into())).is_err());
    }

    #[test]
    fn test_string_coercions() {
        assert_eq!(String::from_sql(SqlValue::Int(5)).unwrap(), "5");
        assert_eq!(String::from_sql(SqlValue::Text("a".into())).unwrap(), "a");
        assert_eq!(String::from_sql(SqlValue::Decimal("1.25".into())).unwrap(), "1.25");
    }

    #[test]
    fn test_text_to_int_failure_is_coercion_error() {
        let err = i64::from_sql(SqlValue::Text("Alice".into())).unwrap_err();
        assert!(matches!(err, DbError::Coercion { from: "text", to: "i64" }));
    }

    #[test]
    fn test_nullable_shape() {
        assert_eq!(Option::<i64>::from_sql(SqlValue::Null).unwrap(), None);
        assert_eq!(Option::<i64>::from_sql(SqlValue::Int(9)).unwrap(), Some(9));
    }

    #[test]
    fn test_datetime_coercions() {
        let dt = NaiveDateTime::from_sql(SqlValue::Text("2024-06-01 10:30:00".into())).unwrap();
        assert_eq!(dt.to_string(), "2024-06-01 10:30:00");
        let d = NaiveDate::from_sql(SqlValue::DateTime(dt)).unwrap();
        assert_eq!(d.to_string(), "2024-06-01");
    }

    #[test]
    fn test_uuid_coercions() {
        let id = Uuid::parse_str("6f2c0cde-5fa1-4bf7-bb09-a4a5c3e3f001").unwrap();
        assert_eq!(Uuid::from_sql(SqlValue::Uuid(id)).unwrap(), id);
        assert_eq!(Uuid::from_sql(SqlValue::Text(id.to_string())).unwrap(), id);
        assert!(Uuid::from_sql(SqlValue::Int(1)).is_err());
    }
}
