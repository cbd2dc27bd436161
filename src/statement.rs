//! Connections and prepared statements.
//!
//! A [`Connection`] resolves its properties once when it is opened and hands
//! statements to an [`Executor`]. A [`PreparedStatement`] owns one
//! [`ParameterStore`]; every setter coerces its value immediately, so an
//! unsupported parameter fails at the call site rather than at execution.
//!
//! ```rust,ignore
//! let conn = Connection::connect("sqlite::memory:;readonly=false").await?;
//! let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ? AND active = ?");
//! stmt.set_long(1, 42)?;
//! stmt.set_bool(2, true)?;
//! let rows = stmt.execute_query().await?;
//! ```

use std::io::Read;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use url::Url;
use uuid::Uuid;

use crate::batch;
use crate::engine::SqlxExecutor;
use crate::error::{BindError, BindResult};
use crate::executor::{BoundStatement, ExecuteResult, Executor, ResultSet, ResultSetMetadata};
use crate::param::{Blob, Clob, Date, Parameter, SqlArray, Time, Timestamp};
use crate::properties::{self, ResolvedProperties};
use crate::sql;
use crate::store::{NamedParameters, ParameterMetadata, ParameterStore};
use crate::stream::{self, StreamKind};
use crate::types::{CanonicalType, SqlType, Value};

/// A connection to one backend database.
pub struct Connection<E: Executor> {
    uri: String,
    properties: ResolvedProperties,
    executor: E,
}

impl Connection<SqlxExecutor> {
    /// Resolve the properties in `uri` and connect with sqlx.
    ///
    /// The part of `uri` before the first `;` is the sqlx connection URL.
    pub async fn connect(uri: &str) -> BindResult<Self> {
        let properties = ResolvedProperties::resolve(uri)?;
        let executor = SqlxExecutor::connect(properties::strip_properties(uri)).await?;
        Ok(Self::with_properties(uri, properties, executor))
    }
}

impl<E: Executor> Connection<E> {
    /// Open a connection over `executor`, resolving the properties in `uri`.
    pub fn open(uri: &str, executor: E) -> BindResult<Self> {
        let properties = ResolvedProperties::resolve(uri)?;
        Ok(Self::with_properties(uri, properties, executor))
    }

    fn with_properties(uri: &str, properties: ResolvedProperties, executor: E) -> Self {
        tracing::info!(
            database = properties::strip_properties(uri),
            readonly = properties.get_bool("readonly"),
            "connection opened"
        );
        Self {
            uri: uri.to_string(),
            properties,
            executor,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn properties(&self) -> &ResolvedProperties {
        &self.properties
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn is_read_only(&self) -> bool {
        self.properties.get_bool("readonly")
    }

    /// Prepare `sql`, rewriting its `?` placeholders to `@p1..@pN`.
    pub fn prepare(&self, sql: &str) -> PreparedStatement<'_, E> {
        PreparedStatement {
            conn: self,
            placeholders: sql::count_placeholders(sql),
            sql: sql::to_named_parameters(sql),
            params: ParameterStore::new(),
            batch: Vec::new(),
            closed: false,
        }
    }

    /// Split a DDL script on `;` and apply it as one batch.
    ///
    /// Returns the number of statements applied.
    pub async fn execute_script(&self, script: &str) -> BindResult<usize> {
        if self.is_read_only() {
            return Err(BindError::ReadOnly("scripts cannot be applied".to_string()));
        }
        let statements = batch::split_script(script);
        if statements.is_empty() {
            return Ok(0);
        }
        self.executor.execute_batch(&statements).await?;
        tracing::info!(statements = statements.len(), "script applied");
        Ok(statements.len())
    }

    /// An array of `type_name` elements, e.g. `INT64` or `STRING`.
    pub fn create_array_of(&self, type_name: &str, elements: Vec<Value>) -> BindResult<SqlArray> {
        SqlArray::from_type_name(type_name, elements)
    }

    pub fn create_blob(&self, bytes: impl Into<Vec<u8>>) -> Blob {
        Blob::new(bytes)
    }

    pub fn create_clob(&self, text: impl Into<String>) -> Clob {
        Clob::new(text)
    }
}

/// A statement with `@pN` parameter markers and its bound parameters.
pub struct PreparedStatement<'c, E: Executor> {
    conn: &'c Connection<E>,
    sql: String,
    placeholders: usize,
    params: ParameterStore,
    batch: Vec<NamedParameters>,
    closed: bool,
}

impl<'c, E: Executor> PreparedStatement<'c, E> {
    /// The statement text as sent to the executor.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Number of `?` placeholders in the statement as prepared.
    pub fn placeholder_count(&self) -> usize {
        self.placeholders
    }

    pub fn set_null(&mut self, position: usize, sql_type: SqlType) -> BindResult<()> {
        self.params.set_null(position, sql_type)
    }

    pub fn set_null_with_type_name(
        &mut self,
        position: usize,
        sql_type: SqlType,
        type_name: &str,
    ) -> BindResult<()> {
        self.params.set_null_with_type_name(position, sql_type, type_name)
    }

    pub fn set_bool(&mut self, position: usize, value: bool) -> BindResult<()> {
        self.params.set(position, Parameter::Bool(value))
    }

    pub fn set_byte(&mut self, position: usize, value: i8) -> BindResult<()> {
        self.params.set(position, Parameter::Byte(value))
    }

    pub fn set_short(&mut self, position: usize, value: i16) -> BindResult<()> {
        self.params.set(position, Parameter::Short(value))
    }

    pub fn set_int(&mut self, position: usize, value: i32) -> BindResult<()> {
        self.params.set(position, Parameter::Int(value))
    }

    pub fn set_long(&mut self, position: usize, value: i64) -> BindResult<()> {
        self.params.set(position, Parameter::Long(value))
    }

    pub fn set_float(&mut self, position: usize, value: f32) -> BindResult<()> {
        self.params.set(position, Parameter::Float(value))
    }

    pub fn set_double(&mut self, position: usize, value: f64) -> BindResult<()> {
        self.params.set(position, Parameter::Double(value))
    }

    pub fn set_decimal(&mut self, position: usize, value: Decimal) -> BindResult<()> {
        self.params.set(position, Parameter::Decimal(value))
    }

    pub fn set_string(&mut self, position: usize, value: impl Into<String>) -> BindResult<()> {
        self.params.set(position, Parameter::String(value.into()))
    }

    pub fn set_nstring(&mut self, position: usize, value: impl Into<String>) -> BindResult<()> {
        self.params.set(position, Parameter::NString(value.into()))
    }

    pub fn set_bytes(&mut self, position: usize, value: impl Into<Vec<u8>>) -> BindResult<()> {
        self.params.set(position, Parameter::Bytes(value.into()))
    }

    pub fn set_date(&mut self, position: usize, value: NaiveDate) -> BindResult<()> {
        self.params.set(position, Parameter::Date(Date::new(value)))
    }

    /// Bind the calendar date of `instant` as seen from `offset`.
    pub fn set_date_at(
        &mut self,
        position: usize,
        instant: DateTime<Utc>,
        offset: FixedOffset,
    ) -> BindResult<()> {
        self.params
            .set(position, Parameter::Date(Date::at_instant(instant, offset)))
    }

    pub fn set_time(&mut self, position: usize, value: NaiveTime) -> BindResult<()> {
        self.params.set(position, Parameter::Time(Time::new(value)))
    }

    /// Bind a wall-clock time in `offset`; it is stored in UTC.
    pub fn set_time_at(
        &mut self,
        position: usize,
        value: NaiveTime,
        offset: FixedOffset,
    ) -> BindResult<()> {
        self.params
            .set(position, Parameter::Time(Time::with_offset(value, offset)))
    }

    pub fn set_timestamp(&mut self, position: usize, value: NaiveDateTime) -> BindResult<()> {
        self.params
            .set(position, Parameter::Timestamp(Timestamp::new(value)))
    }

    /// Bind a wall-clock timestamp in `offset`; it is converted to UTC.
    pub fn set_timestamp_at(
        &mut self,
        position: usize,
        value: NaiveDateTime,
        offset: FixedOffset,
    ) -> BindResult<()> {
        self.params.set(
            position,
            Parameter::Timestamp(Timestamp::with_offset(value, offset)),
        )
    }

    pub fn set_array(&mut self, position: usize, value: SqlArray) -> BindResult<()> {
        self.params.set(position, Parameter::Array(value))
    }

    pub fn set_blob(&mut self, position: usize, value: Blob) -> BindResult<()> {
        self.params.set(position, Parameter::Blob(value))
    }

    /// Bind the contents of `reader` as a blob.
    pub fn set_blob_stream<R: Read>(
        &mut self,
        position: usize,
        reader: R,
        length: Option<u64>,
    ) -> BindResult<()> {
        self.set_stream(position, StreamKind::Binary, reader, length)
    }

    pub fn set_clob(&mut self, position: usize, value: Clob) -> BindResult<()> {
        self.params.set(position, Parameter::Clob(value))
    }

    /// Bind the contents of `reader` as a clob.
    pub fn set_clob_reader<R: Read>(
        &mut self,
        position: usize,
        reader: R,
        length: Option<u64>,
    ) -> BindResult<()> {
        self.set_stream(position, StreamKind::Character, reader, length)
    }

    pub fn set_nclob(&mut self, position: usize, value: Clob) -> BindResult<()> {
        self.params.set(position, Parameter::NClob(value))
    }

    pub fn set_ascii_stream<R: Read>(
        &mut self,
        position: usize,
        reader: R,
        length: Option<u64>,
    ) -> BindResult<()> {
        self.set_stream(position, StreamKind::Ascii, reader, length)
    }

    pub fn set_binary_stream<R: Read>(
        &mut self,
        position: usize,
        reader: R,
        length: Option<u64>,
    ) -> BindResult<()> {
        self.set_stream(position, StreamKind::Binary, reader, length)
    }

    /// Bind UTF-8 text from `reader`; `length` counts characters.
    pub fn set_character_stream<R: Read>(
        &mut self,
        position: usize,
        reader: R,
        length: Option<u64>,
    ) -> BindResult<()> {
        self.set_stream(position, StreamKind::Character, reader, length)
    }

    pub fn set_ncharacter_stream<R: Read>(
        &mut self,
        position: usize,
        reader: R,
        length: Option<u64>,
    ) -> BindResult<()> {
        self.set_stream(position, StreamKind::NCharacter, reader, length)
    }

    /// Bind UTF-8 text from `reader`; `length` counts bytes.
    pub fn set_unicode_stream<R: Read>(
        &mut self,
        position: usize,
        reader: R,
        length: Option<u64>,
    ) -> BindResult<()> {
        self.set_stream(position, StreamKind::Unicode, reader, length)
    }

    pub fn set_url(&mut self, position: usize, value: Url) -> BindResult<()> {
        self.params.set(position, Parameter::Url(value))
    }

    pub fn set_uuid(&mut self, position: usize, value: Uuid) -> BindResult<()> {
        self.params.set(position, Parameter::Uuid(value))
    }

    /// Always fails: the backend has no row identifiers.
    pub fn set_row_id(&mut self, position: usize, value: impl Into<Vec<u8>>) -> BindResult<()> {
        self.params.set(position, Parameter::RowId(value.into()))
    }

    /// Always fails: the backend has no reference type.
    pub fn set_ref(&mut self, position: usize, value: impl Into<String>) -> BindResult<()> {
        self.params.set(position, Parameter::Ref(value.into()))
    }

    /// Always fails: the backend has no XML type.
    pub fn set_sqlxml(&mut self, position: usize, value: impl Into<String>) -> BindResult<()> {
        self.params.set(position, Parameter::SqlXml(value.into()))
    }

    /// Bind a value, typed by its own runtime category.
    pub fn set_object(&mut self, position: usize, value: impl Into<Parameter>) -> BindResult<()> {
        self.params.set(position, value.into())
    }

    /// Bind a value converted to `sql_type`.
    pub fn set_object_as(
        &mut self,
        position: usize,
        value: impl Into<Parameter>,
        sql_type: SqlType,
    ) -> BindResult<()> {
        self.params.set_object_as(position, value.into(), sql_type)
    }

    /// Bind a value that is already in backend form.
    pub fn set_typed(&mut self, position: usize, ty: CanonicalType, value: Value) -> BindResult<()> {
        self.params.set_typed(position, ty, value)
    }

    fn set_stream<R: Read>(
        &mut self,
        position: usize,
        kind: StreamKind,
        reader: R,
        length: Option<u64>,
    ) -> BindResult<()> {
        // Reading consumes the stream, so reject bad positions first.
        self.ensure_open()?;
        if position == 0 {
            return Err(BindError::InvalidPosition(position));
        }
        let materialized = stream::materialize(kind, reader, length)?;
        self.params.set(position, Parameter::Stream(materialized))
    }

    pub fn clear_parameters(&mut self) -> BindResult<()> {
        self.params.clear()
    }

    pub fn parameter_metadata(&self) -> BindResult<ParameterMetadata> {
        self.params.describe()
    }

    /// The statement and its rendered parameters, as the executor sees them.
    pub fn bound(&self) -> BindResult<BoundStatement> {
        self.ensure_open()?;
        Ok(BoundStatement::new(self.sql.clone(), self.params.render()?))
    }

    pub async fn execute(&self) -> BindResult<ExecuteResult> {
        let statement = self.bound()?;
        if !sql::is_query(&self.sql) {
            self.ensure_writable()?;
        }
        self.conn.executor.execute(&statement).await
    }

    pub async fn execute_query(&self) -> BindResult<ResultSet> {
        if !sql::is_query(&self.sql) {
            return Err(BindError::InvalidValue(
                "statement does not return rows".to_string(),
            ));
        }
        match self.execute().await? {
            ExecuteResult::Rows(rows) => Ok(rows),
            ExecuteResult::UpdateCount(_) => Err(BindError::Execution(
                "query returned an update count".to_string(),
            )),
        }
    }

    pub async fn execute_update(&self) -> BindResult<u64> {
        self.ensure_writable()?;
        match self.execute().await? {
            ExecuteResult::UpdateCount(count) => Ok(count),
            ExecuteResult::Rows(_) => Err(BindError::Execution(
                "update returned a result set".to_string(),
            )),
        }
    }

    /// Queue the current parameters and clear them for the next row.
    pub fn add_batch(&mut self) -> BindResult<()> {
        self.ensure_open()?;
        self.batch.push(self.params.render()?);
        self.params.clear()
    }

    pub fn clear_batch(&mut self) {
        self.batch.clear();
    }

    /// Number of parameter sets queued by [`add_batch`](Self::add_batch).
    pub fn batch_size(&self) -> usize {
        self.batch.len()
    }

    /// Execute every queued parameter set in order and return the update counts.
    ///
    /// The queue is emptied only when the whole batch succeeds.
    pub async fn execute_batch(&mut self) -> BindResult<Vec<u64>> {
        self.ensure_open()?;
        self.ensure_writable()?;
        if self.batch.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(rows = self.batch.len(), "executing statement batch");
        let counts = self.conn.executor.execute_many(&self.sql, &self.batch).await?;
        self.batch.clear();
        Ok(counts)
    }

    /// Execute the query and describe its columns.
    pub async fn metadata(&self) -> BindResult<ResultSetMetadata> {
        Ok(self.execute_query().await?.metadata())
    }

    pub fn close(&mut self) {
        self.closed = true;
        self.params.close();
        self.batch.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> BindResult<()> {
        if self.closed {
            return Err(BindError::Closed);
        }
        Ok(())
    }

    fn ensure_writable(&self) -> BindResult<()> {
        if self.conn.is_read_only() {
            return Err(BindError::ReadOnly(
                "updates are not allowed".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct NullExecutor {
        batches: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl Executor for NullExecutor {
        async fn execute(&self, _statement: &BoundStatement) -> BindResult<ExecuteResult> {
            Ok(ExecuteResult::UpdateCount(1))
        }

        async fn execute_batch(&self, statements: &[String]) -> BindResult<()> {
            self.batches.lock().unwrap().push(statements.to_vec());
            Ok(())
        }
    }

    /// Fails every statement whose first parameter is 2.
    struct RejectTwo;

    #[async_trait]
    impl Executor for RejectTwo {
        async fn execute(&self, statement: &BoundStatement) -> BindResult<ExecuteResult> {
            match statement.params.get("p1").map(|p| &p.value) {
                Some(Value::Int64(2)) => Err(BindError::Execution("rejected".to_string())),
                _ => Ok(ExecuteResult::UpdateCount(1)),
            }
        }

        async fn execute_batch(&self, _statements: &[String]) -> BindResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_failed_batch_names_the_row_and_keeps_the_queue() {
        let conn = Connection::open("test://db", RejectTwo).unwrap();
        let mut stmt = conn.prepare("INSERT INTO t (a) VALUES (?)");
        for v in [1, 2, 3] {
            stmt.set_long(1, v).unwrap();
            stmt.add_batch().unwrap();
        }
        let err = stmt.execute_batch().await.unwrap_err();
        assert!(matches!(err, BindError::Batch { row: 2, .. }));
        assert_eq!(stmt.batch_size(), 3);

        stmt.clear_batch();
        stmt.set_long(1, 5).unwrap();
        stmt.add_batch().unwrap();
        assert_eq!(stmt.execute_batch().await.unwrap(), vec![1]);
        assert_eq!(stmt.batch_size(), 0);
    }

    #[test]
    fn test_prepare_rewrites_placeholders() {
        let conn = Connection::open("test://db", NullExecutor::default()).unwrap();
        let stmt = conn.prepare("UPDATE t SET a = ? WHERE b = '?' AND c = ?");
        assert_eq!(stmt.sql(), "UPDATE t SET a = @p1 WHERE b = '?' AND c = @p2");
        assert_eq!(stmt.placeholder_count(), 2);
    }

    #[test]
    fn test_last_write_wins() {
        let conn = Connection::open("test://db", NullExecutor::default()).unwrap();
        let mut stmt = conn.prepare("SELECT ?");
        stmt.set_int(1, 1).unwrap();
        stmt.set_string(1, "x").unwrap();
        let md = stmt.parameter_metadata().unwrap();
        assert_eq!(md.class_name(1), Some("String"));
    }

    #[test]
    fn test_stream_setter_rejects_position_zero_without_reading() {
        let conn = Connection::open("test://db", NullExecutor::default()).unwrap();
        let mut stmt = conn.prepare("SELECT ?");
        let mut cursor = std::io::Cursor::new(b"abc".to_vec());
        let err = stmt.set_binary_stream(0, &mut cursor, None).unwrap_err();
        assert!(matches!(err, BindError::InvalidPosition(0)));
        assert_eq!(cursor.position(), 0);
    }

    #[tokio::test]
    async fn test_execute_script_splits_into_one_batch() {
        let conn = Connection::open("test://db", NullExecutor::default()).unwrap();
        let applied = conn
            .execute_script("create table t (a int64);   ;drop table u;")
            .await
            .unwrap();
        assert_eq!(applied, 2);
        let batches = conn.executor().batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], vec!["create table t (a int64)", "drop table u"]);
    }

    #[tokio::test]
    async fn test_read_only_connection_rejects_writes() {
        let conn = Connection::open("test://db;readonly=true", NullExecutor::default()).unwrap();
        assert!(conn.is_read_only());
        let err = conn.execute_script("drop table t").await.unwrap_err();
        assert!(matches!(err, BindError::ReadOnly(_)));

        let mut stmt = conn.prepare("DELETE FROM t WHERE id = ?");
        stmt.set_long(1, 1).unwrap();
        assert!(matches!(stmt.execute_update().await, Err(BindError::ReadOnly(_))));
        stmt.add_batch().unwrap();
        assert!(matches!(stmt.execute_batch().await, Err(BindError::ReadOnly(_))));
    }

    #[tokio::test]
    async fn test_closed_statement() {
        let conn = Connection::open("test://db", NullExecutor::default()).unwrap();
        let mut stmt = conn.prepare("UPDATE t SET a = ?");
        stmt.close();
        assert!(stmt.is_closed());
        assert!(matches!(stmt.set_int(1, 1), Err(BindError::Closed)));
        assert!(matches!(stmt.execute().await, Err(BindError::Closed)));
    }
}
