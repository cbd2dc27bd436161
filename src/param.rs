//! Parameter values as handed to the statement setters.
//!
//! [`Parameter`] has one variant per setter category. The coercion engine
//! matches on it exhaustively to decide the backend type and the class that
//! parameter metadata reports.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use url::Url;
use uuid::Uuid;

use crate::error::{BindError, BindResult};
use crate::stream::MaterializedStream;
use crate::types::{CanonicalType, Value};

/// A value for one parameter position.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// A NULL with no declared type.
    Null,
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(String),
    /// National character string.
    NString(String),
    Bytes(Vec<u8>),
    Date(Date),
    Time(Time),
    Timestamp(Timestamp),
    Array(SqlArray),
    Blob(Blob),
    Clob(Clob),
    NClob(Clob),
    /// A character or byte stream, already read into memory.
    Stream(MaterializedStream),
    Url(Url),
    Uuid(Uuid),
    RowId(Vec<u8>),
    Ref(String),
    SqlXml(String),
}

impl Parameter {
    /// Short name of the setter category, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Parameter::Null => "Null",
            Parameter::Bool(_) => "Bool",
            Parameter::Byte(_) => "Byte",
            Parameter::Short(_) => "Short",
            Parameter::Int(_) => "Int",
            Parameter::Long(_) => "Long",
            Parameter::Float(_) => "Float",
            Parameter::Double(_) => "Double",
            Parameter::Decimal(_) => "Decimal",
            Parameter::String(_) => "String",
            Parameter::NString(_) => "NString",
            Parameter::Bytes(_) => "Bytes",
            Parameter::Date(_) => "Date",
            Parameter::Time(_) => "Time",
            Parameter::Timestamp(_) => "Timestamp",
            Parameter::Array(_) => "Array",
            Parameter::Blob(_) => "Blob",
            Parameter::Clob(_) => "Clob",
            Parameter::NClob(_) => "NClob",
            Parameter::Stream(_) => "Stream",
            Parameter::Url(_) => "Url",
            Parameter::Uuid(_) => "Uuid",
            Parameter::RowId(_) => "RowId",
            Parameter::Ref(_) => "Ref",
            Parameter::SqlXml(_) => "SqlXml",
        }
    }
}

/// A calendar date, optionally qualified with the offset it was taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub date: NaiveDate,
    pub offset: Option<FixedOffset>,
}

impl Date {
    pub fn new(date: NaiveDate) -> Self {
        Self { date, offset: None }
    }

    pub fn with_offset(date: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            date,
            offset: Some(offset),
        }
    }

    /// The calendar date of `instant` as seen from `offset`.
    pub fn at_instant(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self::with_offset(instant.with_timezone(&offset).date_naive(), offset)
    }
}

/// A time of day, optionally qualified with an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub time: NaiveTime,
    pub offset: Option<FixedOffset>,
}

impl Time {
    pub fn new(time: NaiveTime) -> Self {
        Self { time, offset: None }
    }

    pub fn with_offset(time: NaiveTime, offset: FixedOffset) -> Self {
        Self {
            time,
            offset: Some(offset),
        }
    }

    /// The time of day in UTC, wrapping around midnight.
    pub fn to_utc(&self) -> NaiveTime {
        match self.offset {
            Some(offset) => {
                let shift = Duration::seconds(i64::from(offset.local_minus_utc()));
                self.time.overflowing_sub_signed(shift).0
            }
            None => self.time,
        }
    }
}

/// A wall-clock timestamp, optionally qualified with an offset.
///
/// Without an offset the wall-clock time is taken as UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub datetime: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

impl Timestamp {
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            offset: None,
        }
    }

    pub fn with_offset(datetime: NaiveDateTime, offset: FixedOffset) -> Self {
        Self {
            datetime,
            offset: Some(offset),
        }
    }

    /// The instant this timestamp denotes.
    pub fn to_utc(&self) -> BindResult<DateTime<Utc>> {
        match self.offset {
            Some(offset) => offset
                .from_local_datetime(&self.datetime)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
                .ok_or_else(|| {
                    BindError::InvalidValue(format!(
                        "timestamp {} does not exist at offset {}",
                        self.datetime, offset
                    ))
                }),
            None => Ok(self.datetime.and_utc()),
        }
    }
}

/// An array of values of a single element type.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlArray {
    element_type: CanonicalType,
    elements: Vec<Value>,
}

impl SqlArray {
    /// Build an array, checking every element against `element_type`.
    pub fn of(element_type: CanonicalType, elements: Vec<Value>) -> BindResult<Self> {
        if let CanonicalType::Array(_) = element_type {
            return Err(BindError::unsupported("nested arrays"));
        }
        if let Some(bad) = elements.iter().find(|v| !v.matches(&element_type)) {
            return Err(BindError::InvalidValue(format!(
                "array element {} is not of type {}",
                bad, element_type
            )));
        }
        Ok(Self {
            element_type,
            elements,
        })
    }

    /// Build an array from a backend element type name such as `INT64`.
    pub fn from_type_name(type_name: &str, elements: Vec<Value>) -> BindResult<Self> {
        let element_type = CanonicalType::from_name(type_name).ok_or_else(|| {
            BindError::InvalidValue(format!("unknown array element type '{}'", type_name))
        })?;
        Self::of(element_type, elements)
    }

    pub fn element_type(&self) -> &CanonicalType {
        &self.element_type
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn canonical_type(&self) -> CanonicalType {
        CanonicalType::Array(Box::new(self.element_type.clone()))
    }

    pub fn into_elements(self) -> Vec<Value> {
        self.elements
    }
}

/// A binary large object held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob(Vec<u8>);

impl Blob {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// A character large object held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clob(String);

impl Clob {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

// ==================== Conversions ====================

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Parameter {
                fn from(v: $ty) -> Self {
                    Parameter::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Byte,
    i16 => Short,
    i32 => Int,
    i64 => Long,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    String => String,
    Vec<u8> => Bytes,
    Date => Date,
    Time => Time,
    Timestamp => Timestamp,
    SqlArray => Array,
    Blob => Blob,
    Url => Url,
    Uuid => Uuid,
}

impl From<&str> for Parameter {
    fn from(v: &str) -> Self {
        Parameter::String(v.to_string())
    }
}

impl From<&[u8]> for Parameter {
    fn from(v: &[u8]) -> Self {
        Parameter::Bytes(v.to_vec())
    }
}

impl From<Clob> for Parameter {
    fn from(v: Clob) -> Self {
        Parameter::Clob(v)
    }
}

impl From<NaiveDate> for Parameter {
    fn from(v: NaiveDate) -> Self {
        Parameter::Date(Date::new(v))
    }
}

impl From<NaiveTime> for Parameter {
    fn from(v: NaiveTime) -> Self {
        Parameter::Time(Time::new(v))
    }
}

impl From<NaiveDateTime> for Parameter {
    fn from(v: NaiveDateTime) -> Self {
        Parameter::Timestamp(Timestamp::new(v))
    }
}

impl From<DateTime<Utc>> for Parameter {
    fn from(v: DateTime<Utc>) -> Self {
        Parameter::Timestamp(Timestamp::new(v.naive_utc()))
    }
}

impl<T: Into<Parameter>> From<Option<T>> for Parameter {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Parameter::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offset(hours: i32) -> FixedOffset {
        FixedOffset::east_opt(hours * 3600).unwrap()
    }

    #[test]
    fn test_timestamp_offset_converts_to_utc() {
        let wall = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let ts = Timestamp::with_offset(wall, offset(2));
        let utc = ts.to_utc().unwrap();
        assert_eq!(utc.naive_utc(), wall - Duration::hours(2));

        let plain = Timestamp::new(wall);
        assert_eq!(plain.to_utc().unwrap().naive_utc(), wall);
    }

    #[test]
    fn test_time_offset_wraps_midnight() {
        let t = Time::with_offset(NaiveTime::from_hms_opt(1, 30, 0).unwrap(), offset(3));
        assert_eq!(t.to_utc(), NaiveTime::from_hms_opt(22, 30, 0).unwrap());
    }

    #[test]
    fn test_date_at_instant() {
        let instant = DateTime::<Utc>::from_timestamp(1_000, 0).unwrap();
        assert_eq!(
            Date::at_instant(instant, offset(0)).date,
            NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
        );
        let late = DateTime::<Utc>::from_timestamp(23 * 3600, 0).unwrap();
        assert_eq!(
            Date::at_instant(late, offset(2)).date,
            NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_array_element_checks() {
        let arr = SqlArray::from_type_name(
            "INT64",
            vec![Value::Int64(1), Value::Int64(2), Value::Int64(3)],
        )
        .unwrap();
        assert_eq!(
            arr.canonical_type(),
            CanonicalType::Array(Box::new(CanonicalType::Int64))
        );
        assert_eq!(arr.elements().len(), 3);

        let err = SqlArray::of(CanonicalType::Int64, vec![Value::String("x".into())]).unwrap_err();
        assert!(matches!(err, BindError::InvalidValue(_)));

        let err = SqlArray::from_type_name("ARRAY<INT64>", vec![]).unwrap_err();
        assert!(err.is_unsupported());

        assert!(SqlArray::from_type_name("NOPE", vec![]).is_err());
    }

    #[test]
    fn test_option_into_parameter() {
        assert_eq!(Parameter::from(None::<i64>), Parameter::Null);
        assert_eq!(Parameter::from(Some(5i64)), Parameter::Long(5));
        assert_eq!(Parameter::from("x"), Parameter::String("x".into()));
    }
}
