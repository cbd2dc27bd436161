//! Type coercion engine.
//!
//! Maps every setter category to the backend type it binds as, the
//! normalized value, and the class reported by parameter metadata. Row
//! identifiers, references and XML handles have no backend representation
//! and are rejected before they reach the parameter store.
//!
//! | Category | Backend type | Reported class |
//! |----------|--------------|----------------|
//! | bool | BOOL | `bool` |
//! | i8 / i16 / i32 / i64 | INT64 | `i8` / `i16` / `i32` / `i64` |
//! | f32 / f64 | FLOAT64 | `f32` / `f64` |
//! | Decimal | NUMERIC | `Decimal` |
//! | String / NString | STRING | `String` |
//! | bytes | BYTES | `Vec<u8>` |
//! | Date / Timestamp | DATE / TIMESTAMP | `Date` / `Timestamp` |
//! | Time | (none, opaque) | `Time` |
//! | SqlArray | ARRAY<T> | `SqlArray` |
//! | Blob / Clob / NClob | BYTES / STRING | `Blob` / `Clob` |
//! | streams | BYTES or STRING | type name of the reader |
//! | Url / Uuid | STRING | `Url` / `Uuid` |

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{BindError, BindResult};
use crate::param::{Blob, Clob, Date, Parameter, Time, Timestamp};
use crate::stream::{MaterializedStream, Payload};
use crate::types::{CanonicalType, SqlType, Value, class};

/// The outcome of coercing one parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Backend type, `None` when left to the backend.
    pub canonical_type: Option<CanonicalType>,
    pub value: Value,
    /// Class reported by parameter metadata, `None` when unknown.
    pub class_name: Option<&'static str>,
    /// SQL type code reported by parameter metadata.
    pub sql_type: Option<SqlType>,
    /// Backend type name hint supplied with a NULL.
    pub type_name: Option<String>,
}

impl Binding {
    fn scalar(ty: CanonicalType, value: Value, class_name: &'static str, sql_type: SqlType) -> Self {
        Self {
            canonical_type: Some(ty),
            value,
            class_name: Some(class_name),
            sql_type: Some(sql_type),
            type_name: None,
        }
    }
}

/// Coerce a parameter by its own runtime category.
pub fn coerce(param: Parameter) -> BindResult<Binding> {
    let binding = match param {
        Parameter::Null => Binding {
            canonical_type: None,
            value: Value::Null,
            class_name: None,
            sql_type: None,
            type_name: None,
        },
        Parameter::Bool(v) => {
            Binding::scalar(CanonicalType::Bool, Value::Bool(v), class::BOOL, SqlType::BOOLEAN)
        }
        Parameter::Byte(v) => Binding::scalar(
            CanonicalType::Int64,
            Value::Int64(i64::from(v)),
            class::BYTE,
            SqlType::TINYINT,
        ),
        Parameter::Short(v) => Binding::scalar(
            CanonicalType::Int64,
            Value::Int64(i64::from(v)),
            class::SHORT,
            SqlType::SMALLINT,
        ),
        Parameter::Int(v) => Binding::scalar(
            CanonicalType::Int64,
            Value::Int64(i64::from(v)),
            class::INT,
            SqlType::INTEGER,
        ),
        Parameter::Long(v) => {
            Binding::scalar(CanonicalType::Int64, Value::Int64(v), class::LONG, SqlType::BIGINT)
        }
        Parameter::Float(v) => Binding::scalar(
            CanonicalType::Float64,
            Value::Float64(f64::from(v)),
            class::FLOAT,
            SqlType::REAL,
        ),
        Parameter::Double(v) => Binding::scalar(
            CanonicalType::Float64,
            Value::Float64(v),
            class::DOUBLE,
            SqlType::DOUBLE,
        ),
        Parameter::Decimal(v) => Binding::scalar(
            CanonicalType::Numeric,
            Value::Numeric(v),
            class::DECIMAL,
            SqlType::NUMERIC,
        ),
        Parameter::String(v) | Parameter::NString(v) => Binding::scalar(
            CanonicalType::String,
            Value::String(v),
            class::STRING,
            SqlType::NVARCHAR,
        ),
        Parameter::Bytes(v) => {
            Binding::scalar(CanonicalType::Bytes, Value::Bytes(v), class::BYTES, SqlType::BINARY)
        }
        Parameter::Date(d) => {
            Binding::scalar(CanonicalType::Date, Value::Date(d.date), class::DATE, SqlType::DATE)
        }
        Parameter::Time(t) => Binding {
            canonical_type: None,
            value: Value::Time(t.to_utc()),
            class_name: Some(class::TIME),
            sql_type: Some(SqlType::TIME),
            type_name: None,
        },
        Parameter::Timestamp(ts) => Binding::scalar(
            CanonicalType::Timestamp,
            Value::Timestamp(ts.to_utc()?),
            class::TIMESTAMP,
            SqlType::TIMESTAMP,
        ),
        Parameter::Array(array) => {
            let ty = array.canonical_type();
            Binding::scalar(ty, Value::Array(array.into_elements()), class::ARRAY, SqlType::ARRAY)
        }
        Parameter::Blob(blob) => Binding::scalar(
            CanonicalType::Bytes,
            Value::Bytes(blob.into_bytes()),
            class::BLOB,
            SqlType::BLOB,
        ),
        Parameter::Clob(clob) => Binding::scalar(
            CanonicalType::String,
            Value::String(clob.into_string()),
            class::CLOB,
            SqlType::CLOB,
        ),
        Parameter::NClob(clob) => Binding::scalar(
            CanonicalType::String,
            Value::String(clob.into_string()),
            class::CLOB,
            SqlType::NCLOB,
        ),
        Parameter::Stream(stream) => coerce_stream(stream),
        Parameter::Url(url) => Binding::scalar(
            CanonicalType::String,
            Value::String(url.to_string()),
            class::URL,
            SqlType::NVARCHAR,
        ),
        Parameter::Uuid(uuid) => Binding::scalar(
            CanonicalType::String,
            Value::String(uuid.to_string()),
            class::UUID,
            SqlType::OTHER,
        ),
        rejected @ (Parameter::RowId(_) | Parameter::Ref(_) | Parameter::SqlXml(_)) => {
            return Err(BindError::unsupported(rejected.kind_name()));
        }
    };
    Ok(binding)
}

fn coerce_stream(stream: MaterializedStream) -> Binding {
    let ty = stream.canonical_type();
    let (value, sql_type) = match stream.payload {
        Payload::Bytes(bytes) => (Value::Bytes(bytes), SqlType::BINARY),
        Payload::Text(text) => (Value::String(text), SqlType::NVARCHAR),
    };
    Binding::scalar(ty, value, stream.source_class, sql_type)
}

/// Coerce a parameter toward a declared SQL type.
///
/// NULLs take the declared type as [`null_binding`] does. Other values are
/// converted to the declared type's natural category first; a value that
/// does not fit fails with `InvalidValue`, and a declared type the backend
/// cannot represent fails with `Unsupported`.
pub fn coerce_to(param: Parameter, target: SqlType) -> BindResult<Binding> {
    if let Parameter::RowId(_) | Parameter::Ref(_) | Parameter::SqlXml(_) = param {
        return Err(BindError::unsupported(param.kind_name()));
    }
    if let Parameter::Null = param {
        return Ok(null_binding(target, None));
    }
    let converted = convert(param, target)?;
    let mut binding = coerce(converted)?;
    binding.sql_type = Some(target);
    Ok(binding)
}

/// A NULL declared with `sql_type` and an optional backend type name.
///
/// Metadata reports the class registered for `sql_type` (none for codes
/// without an entry). The backend type comes from the code, or from the
/// type name when the code has no canonical type.
pub fn null_binding(sql_type: SqlType, type_name: Option<&str>) -> Binding {
    let canonical_type = canonical_for_sql_type(sql_type)
        .or_else(|| type_name.and_then(CanonicalType::from_name));
    Binding {
        canonical_type,
        value: Value::Null,
        class_name: class_for_sql_type(sql_type),
        sql_type: Some(sql_type),
        type_name: type_name.map(str::to_string),
    }
}

/// The backend type a SQL type code binds as.
pub fn canonical_for_sql_type(sql_type: SqlType) -> Option<CanonicalType> {
    let ty = match sql_type {
        SqlType::BIT | SqlType::BOOLEAN => CanonicalType::Bool,
        SqlType::TINYINT | SqlType::SMALLINT | SqlType::INTEGER | SqlType::BIGINT => {
            CanonicalType::Int64
        }
        SqlType::REAL | SqlType::FLOAT | SqlType::DOUBLE => CanonicalType::Float64,
        SqlType::NUMERIC | SqlType::DECIMAL => CanonicalType::Numeric,
        SqlType::CHAR
        | SqlType::VARCHAR
        | SqlType::LONGVARCHAR
        | SqlType::NCHAR
        | SqlType::NVARCHAR
        | SqlType::LONGNVARCHAR
        | SqlType::CLOB
        | SqlType::NCLOB => CanonicalType::String,
        SqlType::BINARY | SqlType::VARBINARY | SqlType::LONGVARBINARY | SqlType::BLOB => {
            CanonicalType::Bytes
        }
        SqlType::DATE => CanonicalType::Date,
        SqlType::TIMESTAMP | SqlType::TIMESTAMP_WITH_TIMEZONE => CanonicalType::Timestamp,
        _ => return None,
    };
    Some(ty)
}

/// The class parameter metadata reports for a SQL type code.
pub fn class_for_sql_type(sql_type: SqlType) -> Option<&'static str> {
    let name = match sql_type {
        SqlType::BIT | SqlType::BOOLEAN => class::BOOL,
        SqlType::TINYINT => class::BYTE,
        SqlType::SMALLINT => class::SHORT,
        SqlType::INTEGER => class::INT,
        SqlType::BIGINT => class::LONG,
        SqlType::REAL => class::FLOAT,
        SqlType::FLOAT | SqlType::DOUBLE => class::DOUBLE,
        SqlType::NUMERIC | SqlType::DECIMAL => class::DECIMAL,
        SqlType::CHAR
        | SqlType::VARCHAR
        | SqlType::LONGVARCHAR
        | SqlType::NCHAR
        | SqlType::NVARCHAR
        | SqlType::LONGNVARCHAR => class::STRING,
        SqlType::CLOB | SqlType::NCLOB => class::CLOB,
        SqlType::BINARY | SqlType::VARBINARY | SqlType::LONGVARBINARY => class::BYTES,
        SqlType::BLOB => class::BLOB,
        SqlType::DATE => class::DATE,
        SqlType::TIME | SqlType::TIME_WITH_TIMEZONE => class::TIME,
        SqlType::TIMESTAMP | SqlType::TIMESTAMP_WITH_TIMEZONE => class::TIMESTAMP,
        SqlType::ARRAY => class::ARRAY,
        _ => return None,
    };
    Some(name)
}

// ==================== Declared-type conversion ====================

fn convert(param: Parameter, target: SqlType) -> BindResult<Parameter> {
    let converted = match target {
        SqlType::BIT | SqlType::BOOLEAN => Parameter::Bool(to_bool(&param, target)?),
        SqlType::TINYINT => Parameter::Byte(narrow(to_i64(&param, target)?, target)?),
        SqlType::SMALLINT => Parameter::Short(narrow(to_i64(&param, target)?, target)?),
        SqlType::INTEGER => Parameter::Int(narrow(to_i64(&param, target)?, target)?),
        SqlType::BIGINT => Parameter::Long(to_i64(&param, target)?),
        SqlType::REAL => Parameter::Float(to_f32(&param, target)?),
        SqlType::FLOAT | SqlType::DOUBLE => Parameter::Double(to_f64(&param, target)?),
        SqlType::NUMERIC | SqlType::DECIMAL => Parameter::Decimal(to_decimal(&param, target)?),
        SqlType::CHAR | SqlType::VARCHAR | SqlType::LONGVARCHAR => {
            Parameter::String(to_text(&param, target)?)
        }
        SqlType::NCHAR | SqlType::NVARCHAR | SqlType::LONGNVARCHAR => {
            Parameter::NString(to_text(&param, target)?)
        }
        SqlType::CLOB => Parameter::Clob(Clob::new(to_text(&param, target)?)),
        SqlType::NCLOB => Parameter::NClob(Clob::new(to_text(&param, target)?)),
        SqlType::BINARY | SqlType::VARBINARY | SqlType::LONGVARBINARY => {
            Parameter::Bytes(to_bytes(param, target)?)
        }
        SqlType::BLOB => Parameter::Blob(Blob::new(to_bytes(param, target)?)),
        SqlType::DATE => Parameter::Date(to_date(&param, target)?),
        SqlType::TIME | SqlType::TIME_WITH_TIMEZONE => Parameter::Time(to_time(&param, target)?),
        SqlType::TIMESTAMP | SqlType::TIMESTAMP_WITH_TIMEZONE => {
            Parameter::Timestamp(to_timestamp(&param, target)?)
        }
        SqlType::ARRAY => match param {
            Parameter::Array(array) => Parameter::Array(array),
            other => return Err(mismatch(&other, target)),
        },
        _ => return Err(BindError::unsupported(format!("SQL type {}", target))),
    };
    Ok(converted)
}

fn mismatch(param: &Parameter, target: SqlType) -> BindError {
    BindError::InvalidValue(format!("cannot convert {} to {}", param.kind_name(), target))
}

fn unparsable(text: &str, target: SqlType) -> BindError {
    BindError::InvalidValue(format!("'{}' is not a valid {} value", text, target))
}

/// Text carried by string-like parameters.
fn text_of(param: &Parameter) -> Option<&str> {
    match param {
        Parameter::String(s) | Parameter::NString(s) => Some(s.as_str()),
        Parameter::Clob(c) | Parameter::NClob(c) => Some(c.as_str()),
        Parameter::Stream(MaterializedStream {
            payload: Payload::Text(s),
            ..
        }) => Some(s.as_str()),
        _ => None,
    }
}

fn narrow<T: TryFrom<i64>>(value: i64, target: SqlType) -> BindResult<T> {
    T::try_from(value)
        .map_err(|_| BindError::InvalidValue(format!("{} is out of range for {}", value, target)))
}

fn to_bool(param: &Parameter, target: SqlType) -> BindResult<bool> {
    if let Some(text) = text_of(param) {
        return match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(unparsable(text, target)),
        };
    }
    match param {
        Parameter::Bool(b) => Ok(*b),
        Parameter::Byte(_) | Parameter::Short(_) | Parameter::Int(_) | Parameter::Long(_) => {
            Ok(to_i64(param, target)? != 0)
        }
        other => Err(mismatch(other, target)),
    }
}

fn to_i64(param: &Parameter, target: SqlType) -> BindResult<i64> {
    if let Some(text) = text_of(param) {
        return text.trim().parse().map_err(|_| unparsable(text, target));
    }
    match param {
        Parameter::Bool(b) => Ok(i64::from(*b)),
        Parameter::Byte(v) => Ok(i64::from(*v)),
        Parameter::Short(v) => Ok(i64::from(*v)),
        Parameter::Int(v) => Ok(i64::from(*v)),
        Parameter::Long(v) => Ok(*v),
        Parameter::Float(v) => float_to_i64(f64::from(*v), target),
        Parameter::Double(v) => float_to_i64(*v, target),
        Parameter::Decimal(d) if d.fract().is_zero() => i64::try_from(*d)
            .map_err(|_| BindError::InvalidValue(format!("{} is out of range for {}", d, target))),
        Parameter::Decimal(d) => Err(BindError::InvalidValue(format!(
            "{} has a fractional part and cannot be bound as {}",
            d, target
        ))),
        other => Err(mismatch(other, target)),
    }
}

fn float_to_i64(v: f64, target: SqlType) -> BindResult<i64> {
    // i64::MAX is not exactly representable; the bound below is 2^63.
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Ok(v as i64)
    } else {
        Err(BindError::InvalidValue(format!(
            "{} cannot be bound as {}",
            v, target
        )))
    }
}

fn to_f64(param: &Parameter, target: SqlType) -> BindResult<f64> {
    if let Some(text) = text_of(param) {
        return text.trim().parse().map_err(|_| unparsable(text, target));
    }
    match param {
        Parameter::Byte(v) => Ok(f64::from(*v)),
        Parameter::Short(v) => Ok(f64::from(*v)),
        Parameter::Int(v) => Ok(f64::from(*v)),
        Parameter::Long(v) => Ok(*v as f64),
        Parameter::Float(v) => Ok(f64::from(*v)),
        Parameter::Double(v) => Ok(*v),
        Parameter::Decimal(d) => f64::try_from(*d)
            .map_err(|_| BindError::InvalidValue(format!("{} cannot be bound as {}", d, target))),
        other => Err(mismatch(other, target)),
    }
}

fn to_f32(param: &Parameter, target: SqlType) -> BindResult<f32> {
    let wide = to_f64(param, target)?;
    let narrow = wide as f32;
    if wide.is_finite() && !narrow.is_finite() {
        return Err(BindError::InvalidValue(format!(
            "{} is out of range for {}",
            wide, target
        )));
    }
    Ok(narrow)
}

fn to_decimal(param: &Parameter, target: SqlType) -> BindResult<Decimal> {
    if let Some(text) = text_of(param) {
        return Decimal::from_str(text.trim()).map_err(|_| unparsable(text, target));
    }
    match param {
        Parameter::Byte(v) => Ok(Decimal::from(*v)),
        Parameter::Short(v) => Ok(Decimal::from(*v)),
        Parameter::Int(v) => Ok(Decimal::from(*v)),
        Parameter::Long(v) => Ok(Decimal::from(*v)),
        Parameter::Float(v) => Decimal::try_from(*v)
            .map_err(|_| BindError::InvalidValue(format!("{} cannot be bound as {}", v, target))),
        Parameter::Double(v) => Decimal::try_from(*v)
            .map_err(|_| BindError::InvalidValue(format!("{} cannot be bound as {}", v, target))),
        Parameter::Decimal(d) => Ok(*d),
        other => Err(mismatch(other, target)),
    }
}

fn to_text(param: &Parameter, target: SqlType) -> BindResult<String> {
    if let Some(text) = text_of(param) {
        return Ok(text.to_string());
    }
    let text = match param {
        Parameter::Bool(v) => v.to_string(),
        Parameter::Byte(v) => v.to_string(),
        Parameter::Short(v) => v.to_string(),
        Parameter::Int(v) => v.to_string(),
        Parameter::Long(v) => v.to_string(),
        Parameter::Float(v) => v.to_string(),
        Parameter::Double(v) => v.to_string(),
        Parameter::Decimal(v) => v.to_string(),
        Parameter::Date(d) => d.date.to_string(),
        Parameter::Time(t) => t.to_utc().to_string(),
        Parameter::Timestamp(ts) => ts.to_utc()?.to_rfc3339(),
        Parameter::Url(u) => u.to_string(),
        Parameter::Uuid(u) => u.to_string(),
        other => return Err(mismatch(other, target)),
    };
    Ok(text)
}

fn to_bytes(param: Parameter, target: SqlType) -> BindResult<Vec<u8>> {
    match param {
        Parameter::Bytes(b) => Ok(b),
        Parameter::Blob(b) => Ok(b.into_bytes()),
        Parameter::Stream(MaterializedStream {
            payload: Payload::Bytes(b),
            ..
        }) => Ok(b),
        other => match text_of(&other) {
            Some(text) => Ok(text.as_bytes().to_vec()),
            None => Err(mismatch(&other, target)),
        },
    }
}

fn to_date(param: &Parameter, target: SqlType) -> BindResult<Date> {
    if let Some(text) = text_of(param) {
        return NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
            .map(Date::new)
            .map_err(|_| unparsable(text, target));
    }
    match param {
        Parameter::Date(d) => Ok(*d),
        Parameter::Timestamp(ts) => Ok(Date::new(ts.to_utc()?.date_naive())),
        other => Err(mismatch(other, target)),
    }
}

fn to_time(param: &Parameter, target: SqlType) -> BindResult<Time> {
    if let Some(text) = text_of(param) {
        return NaiveTime::from_str(text.trim())
            .map(Time::new)
            .map_err(|_| unparsable(text, target));
    }
    match param {
        Parameter::Time(t) => Ok(*t),
        Parameter::Timestamp(ts) => Ok(Time::new(ts.to_utc()?.time())),
        other => Err(mismatch(other, target)),
    }
}

fn to_timestamp(param: &Parameter, target: SqlType) -> BindResult<Timestamp> {
    if let Some(text) = text_of(param) {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Ok(Timestamp::new(dt.naive_utc()));
        }
        return NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f"))
            .map(Timestamp::new)
            .map_err(|_| unparsable(text, target));
    }
    match param {
        Parameter::Timestamp(ts) => Ok(*ts),
        Parameter::Date(d) => Ok(Timestamp {
            datetime: d.date.and_time(NaiveTime::MIN),
            offset: d.offset,
        }),
        other => Err(mismatch(other, target)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::SqlArray;
    use crate::stream::{StreamKind, materialize};
    use chrono::FixedOffset;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn class_of(param: Parameter) -> Option<&'static str> {
        coerce(param).unwrap().class_name
    }

    fn type_of(param: Parameter) -> Option<CanonicalType> {
        coerce(param).unwrap().canonical_type
    }

    #[test]
    fn test_category_classes() {
        assert_eq!(class_of(Parameter::Bool(true)), Some("bool"));
        assert_eq!(class_of(Parameter::Byte(1)), Some("i8"));
        assert_eq!(class_of(Parameter::Short(1)), Some("i16"));
        assert_eq!(class_of(Parameter::Int(1)), Some("i32"));
        assert_eq!(class_of(Parameter::Long(1)), Some("i64"));
        assert_eq!(class_of(Parameter::Float(1.0)), Some("f32"));
        assert_eq!(class_of(Parameter::Double(1.0)), Some("f64"));
        assert_eq!(class_of(Parameter::Decimal(Decimal::ONE)), Some("Decimal"));
        assert_eq!(class_of(Parameter::NString("x".into())), Some("String"));
        assert_eq!(class_of(Parameter::Bytes(vec![1])), Some("Vec<u8>"));
        assert_eq!(class_of(Parameter::Blob(Blob::default())), Some("Blob"));
        assert_eq!(class_of(Parameter::NClob(Clob::default())), Some("Clob"));
        assert_eq!(class_of(Parameter::Null), None);
    }

    #[test]
    fn test_category_types() {
        assert_eq!(type_of(Parameter::Short(1)), Some(CanonicalType::Int64));
        assert_eq!(type_of(Parameter::Float(1.0)), Some(CanonicalType::Float64));
        assert_eq!(type_of(Parameter::Blob(Blob::default())), Some(CanonicalType::Bytes));
        assert_eq!(type_of(Parameter::Clob(Clob::default())), Some(CanonicalType::String));
        let time = Time::new(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(type_of(Parameter::Time(time)), None);
        let array = SqlArray::of(CanonicalType::Bool, vec![Value::Bool(true)]).unwrap();
        assert_eq!(
            type_of(Parameter::Array(array)),
            Some(CanonicalType::Array(Box::new(CanonicalType::Bool)))
        );
    }

    #[test]
    fn test_stream_reports_reader_type() {
        let stream = materialize(StreamKind::Character, Cursor::new("TEST"), None).unwrap();
        let binding = coerce(Parameter::Stream(stream)).unwrap();
        assert_eq!(binding.class_name, Some(std::any::type_name::<Cursor<&str>>()));
        assert_eq!(binding.canonical_type, Some(CanonicalType::String));
        assert_eq!(binding.value, Value::String("TEST".into()));
    }

    #[test]
    fn test_rejected_categories() {
        for param in [
            Parameter::RowId(vec![1]),
            Parameter::Ref("r".into()),
            Parameter::SqlXml("<a/>".into()),
        ] {
            let err = coerce(param.clone()).unwrap_err();
            assert!(err.is_unsupported());
            let err = coerce_to(param, SqlType::VARCHAR).unwrap_err();
            assert!(err.is_unsupported());
        }
    }

    #[test]
    fn test_timestamp_with_offset_normalizes() {
        let wall = NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let offset = FixedOffset::east_opt(3600).unwrap();
        let binding = coerce(Parameter::Timestamp(Timestamp::with_offset(wall, offset))).unwrap();
        match binding.value {
            Value::Timestamp(ts) => assert_eq!(ts.to_rfc3339(), "2019-12-31T23:00:00+00:00"),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_declared_type_conversions() {
        let b = coerce_to(Parameter::from("TEST"), SqlType::NVARCHAR).unwrap();
        assert_eq!(b.class_name, Some("String"));
        assert_eq!(b.sql_type, Some(SqlType::NVARCHAR));

        let b = coerce_to(Parameter::Int(7), SqlType::BIGINT).unwrap();
        assert_eq!(b.class_name, Some("i64"));
        assert_eq!(b.value, Value::Int64(7));

        let b = coerce_to(Parameter::from("42"), SqlType::INTEGER).unwrap();
        assert_eq!(b.class_name, Some("i32"));
        assert_eq!(b.value, Value::Int64(42));

        let b = coerce_to(Parameter::Long(1), SqlType::VARCHAR).unwrap();
        assert_eq!(b.value, Value::String("1".into()));

        let b = coerce_to(Parameter::from("2.50"), SqlType::DECIMAL).unwrap();
        assert_eq!(b.value, Value::Numeric(Decimal::new(250, 2)));

        let b = coerce_to(Parameter::from("2024-02-29"), SqlType::DATE).unwrap();
        assert_eq!(
            b.value,
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );

        let b = coerce_to(Parameter::Int(0), SqlType::BOOLEAN).unwrap();
        assert_eq!(b.value, Value::Bool(false));

        let b = coerce_to(Parameter::from("abc"), SqlType::BLOB).unwrap();
        assert_eq!(b.class_name, Some("Blob"));
        assert_eq!(b.value, Value::Bytes(b"abc".to_vec()));
    }

    #[test]
    fn test_declared_type_failures() {
        let err = coerce_to(Parameter::Long(300), SqlType::TINYINT).unwrap_err();
        assert!(matches!(err, BindError::InvalidValue(_)));

        let err = coerce_to(Parameter::Double(1.5), SqlType::BIGINT).unwrap_err();
        assert!(matches!(err, BindError::InvalidValue(_)));

        let err = coerce_to(Parameter::Double(1e300), SqlType::REAL).unwrap_err();
        assert!(matches!(err, BindError::InvalidValue(_)));
        let b = coerce_to(Parameter::Double(0.5), SqlType::REAL).unwrap();
        assert_eq!(b.class_name, Some("f32"));

        let err = coerce_to(Parameter::from("nope"), SqlType::DOUBLE).unwrap_err();
        assert!(matches!(err, BindError::InvalidValue(_)));

        let err = coerce_to(Parameter::Bytes(vec![1]), SqlType::INTEGER).unwrap_err();
        assert!(!err.is_unsupported());

        let err = coerce_to(Parameter::from("x"), SqlType::STRUCT).unwrap_err();
        assert!(err.is_unsupported());
        let err = coerce_to(Parameter::from("x"), SqlType::ROWID).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_null_bindings_report_declared_class() {
        let b = null_binding(SqlType::BIGINT, None);
        assert_eq!(b.class_name, Some("i64"));
        assert_eq!(b.canonical_type, Some(CanonicalType::Int64));
        assert_eq!(b.value, Value::Null);

        assert_eq!(null_binding(SqlType::TIMESTAMP, None).class_name, Some("Timestamp"));
        assert_eq!(null_binding(SqlType::NCLOB, None).class_name, Some("Clob"));
        assert_eq!(null_binding(SqlType::TIME, None).canonical_type, None);

        let b = null_binding(SqlType::OTHER, Some("INT64"));
        assert_eq!(b.class_name, None);
        assert_eq!(b.canonical_type, Some(CanonicalType::Int64));
        assert_eq!(b.type_name.as_deref(), Some("INT64"));

        let b = coerce_to(Parameter::Null, SqlType::DOUBLE).unwrap();
        assert_eq!(b.class_name, Some("f64"));
    }
}
