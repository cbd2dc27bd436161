//! Canonical backend types, SQL type codes and backend values.
//!
//! The backend accepts a small, fixed set of column and parameter types
//! (the [`CanonicalType`]s). Callers describe types with the numeric SQL type
//! codes of the driver API ([`SqlType`]), and parameter metadata reports the
//! caller-facing class of each value (see [`class`]).

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

/// Caller-facing class names reported by parameter metadata.
pub mod class {
    pub const BOOL: &str = "bool";
    pub const BYTE: &str = "i8";
    pub const SHORT: &str = "i16";
    pub const INT: &str = "i32";
    pub const LONG: &str = "i64";
    pub const FLOAT: &str = "f32";
    pub const DOUBLE: &str = "f64";
    pub const DECIMAL: &str = "Decimal";
    pub const STRING: &str = "String";
    pub const BYTES: &str = "Vec<u8>";
    pub const DATE: &str = "Date";
    pub const TIME: &str = "Time";
    pub const TIMESTAMP: &str = "Timestamp";
    pub const ARRAY: &str = "SqlArray";
    pub const BLOB: &str = "Blob";
    pub const CLOB: &str = "Clob";
    pub const URL: &str = "Url";
    pub const UUID: &str = "Uuid";
}

/// A type the backend can represent natively.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CanonicalType {
    Bool,
    Int64,
    Float64,
    String,
    Bytes,
    Date,
    Timestamp,
    Numeric,
    /// Array of a non-array element type.
    Array(Box<CanonicalType>),
}

impl CanonicalType {
    /// Parse a backend type name such as `INT64` or `ARRAY<STRING>`.
    ///
    /// Names are matched case-insensitively. Nested arrays are not
    /// representable and yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let upper = name.to_ascii_uppercase();
        if let Some(inner) = upper
            .strip_prefix("ARRAY<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return match Self::from_name(inner)? {
                Self::Array(_) => None,
                element => Some(Self::Array(Box::new(element))),
            };
        }
        match upper.as_str() {
            "BOOL" | "BOOLEAN" => Some(Self::Bool),
            "INT64" => Some(Self::Int64),
            "FLOAT64" => Some(Self::Float64),
            "STRING" => Some(Self::String),
            "BYTES" => Some(Self::Bytes),
            "DATE" => Some(Self::Date),
            "TIMESTAMP" => Some(Self::Timestamp),
            "NUMERIC" => Some(Self::Numeric),
            _ => None,
        }
    }

    /// The class reported for a value bound directly as this type.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Bool => class::BOOL,
            Self::Int64 => class::LONG,
            Self::Float64 => class::DOUBLE,
            Self::String => class::STRING,
            Self::Bytes => class::BYTES,
            Self::Date => class::DATE,
            Self::Timestamp => class::TIMESTAMP,
            Self::Numeric => class::DECIMAL,
            Self::Array(_) => class::ARRAY,
        }
    }

    /// The SQL type code result-set metadata reports for a column of this type.
    pub fn sql_type(&self) -> SqlType {
        match self {
            Self::Bool => SqlType::BOOLEAN,
            Self::Int64 => SqlType::BIGINT,
            Self::Float64 => SqlType::DOUBLE,
            Self::String => SqlType::NVARCHAR,
            Self::Bytes => SqlType::BINARY,
            Self::Date => SqlType::DATE,
            Self::Timestamp => SqlType::TIMESTAMP,
            Self::Numeric => SqlType::NUMERIC,
            Self::Array(_) => SqlType::ARRAY,
        }
    }
}

impl fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "BOOL"),
            Self::Int64 => write!(f, "INT64"),
            Self::Float64 => write!(f, "FLOAT64"),
            Self::String => write!(f, "STRING"),
            Self::Bytes => write!(f, "BYTES"),
            Self::Date => write!(f, "DATE"),
            Self::Timestamp => write!(f, "TIMESTAMP"),
            Self::Numeric => write!(f, "NUMERIC"),
            Self::Array(element) => write!(f, "ARRAY<{}>", element),
        }
    }
}

impl Serialize for CanonicalType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A numeric SQL type code as used by the statement API.
///
/// Codes outside the registry are representable; they simply have no
/// canonical type or reported class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SqlType(pub i32);

impl SqlType {
    pub const BIT: SqlType = SqlType(-7);
    pub const TINYINT: SqlType = SqlType(-6);
    pub const SMALLINT: SqlType = SqlType(5);
    pub const INTEGER: SqlType = SqlType(4);
    pub const BIGINT: SqlType = SqlType(-5);
    pub const FLOAT: SqlType = SqlType(6);
    pub const REAL: SqlType = SqlType(7);
    pub const DOUBLE: SqlType = SqlType(8);
    pub const NUMERIC: SqlType = SqlType(2);
    pub const DECIMAL: SqlType = SqlType(3);
    pub const CHAR: SqlType = SqlType(1);
    pub const VARCHAR: SqlType = SqlType(12);
    pub const LONGVARCHAR: SqlType = SqlType(-1);
    pub const DATE: SqlType = SqlType(91);
    pub const TIME: SqlType = SqlType(92);
    pub const TIMESTAMP: SqlType = SqlType(93);
    pub const BINARY: SqlType = SqlType(-2);
    pub const VARBINARY: SqlType = SqlType(-3);
    pub const LONGVARBINARY: SqlType = SqlType(-4);
    pub const NULL: SqlType = SqlType(0);
    pub const OTHER: SqlType = SqlType(1111);
    pub const JAVA_OBJECT: SqlType = SqlType(2000);
    pub const DISTINCT: SqlType = SqlType(2001);
    pub const STRUCT: SqlType = SqlType(2002);
    pub const ARRAY: SqlType = SqlType(2003);
    pub const BLOB: SqlType = SqlType(2004);
    pub const CLOB: SqlType = SqlType(2005);
    pub const REF: SqlType = SqlType(2006);
    pub const DATALINK: SqlType = SqlType(70);
    pub const BOOLEAN: SqlType = SqlType(16);
    pub const ROWID: SqlType = SqlType(-8);
    pub const NCHAR: SqlType = SqlType(-15);
    pub const NVARCHAR: SqlType = SqlType(-9);
    pub const LONGNVARCHAR: SqlType = SqlType(-16);
    pub const NCLOB: SqlType = SqlType(2011);
    pub const SQLXML: SqlType = SqlType(2009);
    pub const REF_CURSOR: SqlType = SqlType(2012);
    pub const TIME_WITH_TIMEZONE: SqlType = SqlType(2013);
    pub const TIMESTAMP_WITH_TIMEZONE: SqlType = SqlType(2014);

    /// The symbolic name of a known code.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::BIT => "BIT",
            Self::TINYINT => "TINYINT",
            Self::SMALLINT => "SMALLINT",
            Self::INTEGER => "INTEGER",
            Self::BIGINT => "BIGINT",
            Self::FLOAT => "FLOAT",
            Self::REAL => "REAL",
            Self::DOUBLE => "DOUBLE",
            Self::NUMERIC => "NUMERIC",
            Self::DECIMAL => "DECIMAL",
            Self::CHAR => "CHAR",
            Self::VARCHAR => "VARCHAR",
            Self::LONGVARCHAR => "LONGVARCHAR",
            Self::DATE => "DATE",
            Self::TIME => "TIME",
            Self::TIMESTAMP => "TIMESTAMP",
            Self::BINARY => "BINARY",
            Self::VARBINARY => "VARBINARY",
            Self::LONGVARBINARY => "LONGVARBINARY",
            Self::NULL => "NULL",
            Self::OTHER => "OTHER",
            Self::JAVA_OBJECT => "JAVA_OBJECT",
            Self::DISTINCT => "DISTINCT",
            Self::STRUCT => "STRUCT",
            Self::ARRAY => "ARRAY",
            Self::BLOB => "BLOB",
            Self::CLOB => "CLOB",
            Self::REF => "REF",
            Self::DATALINK => "DATALINK",
            Self::BOOLEAN => "BOOLEAN",
            Self::ROWID => "ROWID",
            Self::NCHAR => "NCHAR",
            Self::NVARCHAR => "NVARCHAR",
            Self::LONGNVARCHAR => "LONGNVARCHAR",
            Self::NCLOB => "NCLOB",
            Self::SQLXML => "SQLXML",
            Self::REF_CURSOR => "REF_CURSOR",
            Self::TIME_WITH_TIMEZONE => "TIME_WITH_TIMEZONE",
            Self::TIMESTAMP_WITH_TIMEZONE => "TIMESTAMP_WITH_TIMEZONE",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// A materialized backend value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Numeric(Decimal),
    Array(Vec<Value>),
    /// Time of day. The backend has no TIME type, so this is carried opaquely.
    Time(NaiveTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value can be sent as a parameter of type `ty`.
    pub fn matches(&self, ty: &CanonicalType) -> bool {
        match (self, ty) {
            (Value::Null, _) => true,
            (Value::Bool(_), CanonicalType::Bool)
            | (Value::Int64(_), CanonicalType::Int64)
            | (Value::Float64(_), CanonicalType::Float64)
            | (Value::String(_), CanonicalType::String)
            | (Value::Bytes(_), CanonicalType::Bytes)
            | (Value::Date(_), CanonicalType::Date)
            | (Value::Timestamp(_), CanonicalType::Timestamp)
            | (Value::Numeric(_), CanonicalType::Numeric) => true,
            (Value::Array(values), CanonicalType::Array(element)) => {
                values.iter().all(|v| !matches!(v, Value::Array(_)) && v.matches(element))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Float64(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "'{}'", s),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Date(d) => write!(f, "{}", d),
            Value::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Numeric(d) => write!(f, "{}", d),
            Value::Time(t) => write!(f, "{}", t),
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A value together with the backend type it is sent as.
///
/// `ty` is `None` when the type is left to the backend: unset positions and
/// values the backend has no native type for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedValue {
    pub ty: Option<CanonicalType>,
    pub value: Value,
}

impl TypedValue {
    pub fn new(ty: CanonicalType, value: Value) -> Self {
        Self {
            ty: Some(ty),
            value,
        }
    }

    /// A NULL whose type is left to the backend.
    pub fn untyped_null() -> Self {
        Self {
            ty: None,
            value: Value::Null,
        }
    }
}
