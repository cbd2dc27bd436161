//! Prepared statements driven through a recording executor.

use std::io::Cursor;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use spanbind::prelude::*;
use spanbind::sql;
use url::Url;
use uuid::Uuid;

#[derive(Default)]
struct RecordingExecutor {
    statements: Mutex<Vec<BoundStatement>>,
    batches: Mutex<Vec<Vec<String>>>,
    rows: ResultSet,
}

impl RecordingExecutor {
    fn with_rows(rows: ResultSet) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn recorded(&self) -> Vec<BoundStatement> {
        self.statements.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for RecordingExecutor {
    async fn execute(&self, statement: &BoundStatement) -> BindResult<ExecuteResult> {
        self.statements.lock().unwrap().push(statement.clone());
        if sql::is_query(&statement.sql) {
            Ok(ExecuteResult::Rows(self.rows.clone()))
        } else {
            Ok(ExecuteResult::UpdateCount(1))
        }
    }

    async fn execute_batch(&self, statements: &[String]) -> BindResult<()> {
        self.batches.lock().unwrap().push(statements.to_vec());
        Ok(())
    }
}

fn open() -> Connection<RecordingExecutor> {
    Connection::open("sqlite::memory:;autocommit=true", RecordingExecutor::default()).unwrap()
}

#[test]
fn setter_matrix_reports_classes() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?");
    let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let time = NaiveTime::from_hms_opt(8, 15, 0).unwrap();
    let offset = FixedOffset::east_opt(3600).unwrap();

    stmt.set_bool(1, true).unwrap();
    stmt.set_byte(2, 1).unwrap();
    stmt.set_short(3, 2).unwrap();
    stmt.set_int(4, 3).unwrap();
    stmt.set_long(5, 4).unwrap();
    stmt.set_float(6, 1.5).unwrap();
    stmt.set_double(7, 2.5).unwrap();
    stmt.set_decimal(8, Decimal::new(1234, 2)).unwrap();
    stmt.set_string(9, "text").unwrap();
    stmt.set_nstring(10, "ntext").unwrap();
    stmt.set_bytes(11, b"raw".to_vec()).unwrap();
    stmt.set_date(12, date).unwrap();
    stmt.set_date_at(13, date.and_time(time).and_utc(), offset).unwrap();
    stmt.set_time(14, time).unwrap();
    stmt.set_time_at(15, time, offset).unwrap();
    stmt.set_timestamp(16, date.and_time(time)).unwrap();
    stmt.set_timestamp_at(17, date.and_time(time), offset).unwrap();
    let array = conn
        .create_array_of("INT64", vec![Value::Int64(1), Value::Int64(2)])
        .unwrap();
    stmt.set_array(18, array).unwrap();
    stmt.set_blob(19, conn.create_blob(b"blob".to_vec())).unwrap();
    stmt.set_clob(20, conn.create_clob("clob")).unwrap();
    stmt.set_nclob(21, conn.create_clob("nclob")).unwrap();
    stmt.set_url(22, Url::parse("https://example.com/a").unwrap()).unwrap();
    stmt.set_uuid(23, Uuid::nil()).unwrap();
    stmt.set_object(24, 7i32).unwrap();

    let md = stmt.parameter_metadata().unwrap();
    assert_eq!(md.parameter_count(), 24);
    let classes: Vec<Option<&str>> = (1..=24).map(|p| md.class_name(p)).collect();
    assert_eq!(
        classes,
        vec![
            Some("bool"),
            Some("i8"),
            Some("i16"),
            Some("i32"),
            Some("i64"),
            Some("f32"),
            Some("f64"),
            Some("Decimal"),
            Some("String"),
            Some("String"),
            Some("Vec<u8>"),
            Some("Date"),
            Some("Date"),
            Some("Time"),
            Some("Time"),
            Some("Timestamp"),
            Some("Timestamp"),
            Some("SqlArray"),
            Some("Blob"),
            Some("Clob"),
            Some("Clob"),
            Some("Url"),
            Some("Uuid"),
            Some("i32"),
        ]
    );

    assert_eq!(md.canonical_type(2), Some(&CanonicalType::Int64));
    assert_eq!(md.canonical_type(19), Some(&CanonicalType::Bytes));
    assert_eq!(md.canonical_type(21), Some(&CanonicalType::String));
    assert_eq!(md.canonical_type(14), None);
    assert_eq!(
        md.canonical_type(18),
        Some(&CanonicalType::Array(Box::new(CanonicalType::Int64)))
    );
}

#[test]
fn calendar_setters_normalize_to_utc() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?, ?");
    let wall = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 30, 0)
        .unwrap();
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    stmt.set_timestamp_at(1, wall, offset).unwrap();
    stmt.set_time_at(2, wall.time(), offset).unwrap();

    let bound = stmt.bound().unwrap();
    match &bound.params.get("p1").unwrap().value {
        Value::Timestamp(ts) => assert_eq!(ts.to_rfc3339(), "2023-12-31T22:30:00+00:00"),
        other => panic!("unexpected value {:?}", other),
    }
    let p2 = bound.params.get("p2").unwrap();
    assert_eq!(p2.ty, None);
    assert_eq!(p2.value, Value::Time(NaiveTime::from_hms_opt(22, 30, 0).unwrap()));
}

#[test]
fn date_at_takes_the_calendar_day_of_the_offset() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?, ?");
    let instant = NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(23, 30, 0)
        .unwrap()
        .and_utc();
    stmt.set_date_at(1, instant, FixedOffset::east_opt(2 * 3600).unwrap())
        .unwrap();
    stmt.set_date_at(2, instant, FixedOffset::west_opt(3600).unwrap())
        .unwrap();

    let bound = stmt.bound().unwrap();
    assert_eq!(
        bound.params.get("p1").unwrap().value,
        Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    );
    assert_eq!(
        bound.params.get("p2").unwrap().value,
        Value::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    );
}

#[test]
fn stream_setters_report_reader_type() {
    let conn = open();
    let mut stmt = conn.prepare("INSERT INTO t VALUES (?, ?, ?)");
    stmt.set_character_stream(1, Cursor::new("héllo world"), Some(5))
        .unwrap();
    stmt.set_binary_stream(2, &b"bytes"[..], None).unwrap();
    stmt.set_ascii_stream(3, Cursor::new(b"ascii".to_vec()), Some(3))
        .unwrap();

    let md = stmt.parameter_metadata().unwrap();
    assert_eq!(md.class_name(1), Some(std::any::type_name::<Cursor<&str>>()));
    assert_eq!(md.class_name(2), Some(std::any::type_name::<&[u8]>()));
    assert_eq!(md.canonical_type(2), Some(&CanonicalType::Bytes));

    let bound = stmt.bound().unwrap();
    assert_eq!(bound.params.get("p1").unwrap().value, Value::String("héllo".into()));
    assert_eq!(bound.params.get("p2").unwrap().value, Value::Bytes(b"bytes".to_vec()));
    assert_eq!(bound.params.get("p3").unwrap().value, Value::String("asc".into()));
}

#[test]
fn nulls_report_declared_type() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?, ?, ?, ?");
    stmt.set_null(1, SqlType::BIGINT).unwrap();
    stmt.set_null(2, SqlType::NVARCHAR).unwrap();
    stmt.set_null(3, SqlType(12345)).unwrap();
    stmt.set_null_with_type_name(4, SqlType::OTHER, "INT64").unwrap();

    let md = stmt.parameter_metadata().unwrap();
    assert_eq!(md.class_name(1), Some("i64"));
    assert_eq!(md.class_name(2), Some("String"));
    assert_eq!(md.class_name(3), None);
    assert_eq!(md.parameter_type(3), Some(SqlType(12345)));
    assert_eq!(md.type_name(4), Some("INT64"));

    let bound = stmt.bound().unwrap();
    assert_eq!(
        bound.params.get("p1"),
        Some(&TypedValue::new(CanonicalType::Int64, Value::Null))
    );
    assert_eq!(bound.params.get("p3"), Some(&TypedValue::untyped_null()));
    assert_eq!(
        bound.params.get("p4"),
        Some(&TypedValue::new(CanonicalType::Int64, Value::Null))
    );
}

#[test]
fn rejected_kinds_leave_slot_untouched() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?");
    stmt.set_long(1, 9).unwrap();

    let errors = [
        stmt.set_row_id(1, vec![1, 2]).unwrap_err(),
        stmt.set_ref(1, "ref").unwrap_err(),
        stmt.set_sqlxml(1, "<x/>").unwrap_err(),
    ];
    for err in &errors {
        assert!(err.is_unsupported());
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    let md = stmt.parameter_metadata().unwrap();
    assert_eq!(md.class_name(1), Some("i64"));
    assert_eq!(md.parameter_count(), 1);
}

#[test]
fn set_object_as_converts_toward_declared_type() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?, ?");
    stmt.set_object_as(1, "42", SqlType::BIGINT).unwrap();
    stmt.set_object_as(2, 1i64, SqlType::VARCHAR).unwrap();

    let md = stmt.parameter_metadata().unwrap();
    assert_eq!(md.class_name(1), Some("i64"));
    assert_eq!(md.parameter_type(1), Some(SqlType::BIGINT));
    assert_eq!(md.class_name(2), Some("String"));

    let bound = stmt.bound().unwrap();
    assert_eq!(bound.params.get("p1").unwrap().value, Value::Int64(42));
    assert_eq!(bound.params.get("p2").unwrap().value, Value::String("1".into()));

    let err = stmt.set_object_as(1, "abc", SqlType::INTEGER).unwrap_err();
    assert!(matches!(err, BindError::InvalidValue(_)));
    let err = stmt.set_object_as(1, 5i64, SqlType::ROWID).unwrap_err();
    assert!(err.is_unsupported());
}

#[test]
fn clear_resets_count() {
    let conn = open();
    let mut stmt = conn.prepare("SELECT ?, ?");
    stmt.set_int(1, 1).unwrap();
    stmt.set_int(5, 5).unwrap();
    assert_eq!(stmt.parameter_metadata().unwrap().parameter_count(), 5);

    stmt.clear_parameters().unwrap();
    let md = stmt.parameter_metadata().unwrap();
    assert_eq!(md.parameter_count(), 0);
    assert_eq!(md.class_name(1), None);
    assert!(stmt.bound().unwrap().params.is_empty());
}

#[tokio::test]
async fn execute_hands_rendered_parameters_to_executor() {
    let conn = open();
    let mut stmt = conn.prepare("UPDATE t SET a = ?, b = ? WHERE c = ?");
    stmt.set_string(1, "x").unwrap();
    stmt.set_long(3, 3).unwrap();

    assert_eq!(stmt.execute_update().await.unwrap(), 1);

    let recorded = conn.executor().recorded();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].sql, "UPDATE t SET a = @p1, b = @p2 WHERE c = @p3");
    let names: Vec<&str> = recorded[0].params.iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["p1", "p2", "p3"]);
    assert_eq!(recorded[0].params.get("p2"), Some(&TypedValue::untyped_null()));
}

#[tokio::test]
async fn batch_executes_each_snapshot() {
    let conn = open();
    let mut stmt = conn.prepare("INSERT INTO t (a) VALUES (?)");
    stmt.set_long(1, 1).unwrap();
    stmt.add_batch().unwrap();
    stmt.set_long(1, 2).unwrap();
    stmt.add_batch().unwrap();
    assert_eq!(stmt.parameter_metadata().unwrap().parameter_count(), 0);

    let counts = stmt.execute_batch().await.unwrap();
    assert_eq!(counts, vec![1, 1]);

    let values: Vec<Value> = conn
        .executor()
        .recorded()
        .iter()
        .map(|s| s.params.get("p1").unwrap().value.clone())
        .collect();
    assert_eq!(values, vec![Value::Int64(1), Value::Int64(2)]);

    assert!(stmt.execute_batch().await.unwrap().is_empty());
}

#[tokio::test]
async fn query_metadata_comes_from_result_set() {
    let rows = ResultSet::new(
        vec![
            ResultColumn::new("id", CanonicalType::Int64),
            ResultColumn::new("name", CanonicalType::String),
        ],
        vec![vec![Value::Int64(1), Value::String("a".into())]],
    );
    let conn = Connection::open("test://db", RecordingExecutor::with_rows(rows)).unwrap();
    let mut stmt = conn.prepare("SELECT id, name FROM t WHERE id = ?");
    stmt.set_long(1, 1).unwrap();

    let md = stmt.metadata().await.unwrap();
    assert_eq!(md.column_count(), 2);
    assert_eq!(md.column_label(1), Some("id"));
    assert_eq!(md.column_type(1), Some(SqlType::BIGINT));
    assert_eq!(md.column_type(2), Some(SqlType::NVARCHAR));
    assert_eq!(md.column_type_name(1).as_deref(), Some("INT64"));

    let rows = stmt.execute_query().await.unwrap();
    assert_eq!(rows.get(0, 2), Some(&Value::String("a".into())));

    let update = conn.prepare("DELETE FROM t");
    assert!(matches!(update.execute_query().await, Err(BindError::InvalidValue(_))));
}

#[tokio::test]
async fn script_applies_as_one_batch() {
    let conn = open();
    let applied = conn
        .execute_script("create table t (a int64);\n\ncreate index i on t (a);\n")
        .await
        .unwrap();
    assert_eq!(applied, 2);
    let batches = conn.executor().batches.lock().unwrap().clone();
    assert_eq!(
        batches,
        vec![vec![
            "create table t (a int64)".to_string(),
            "create index i on t (a)".to_string(),
        ]]
    );
}

#[test]
fn open_validates_properties() {
    let err = Connection::open("db;unknownProperty=1", RecordingExecutor::default())
        .err()
        .unwrap();
    assert!(matches!(err, BindError::InvalidProperty { .. }));

    let err = Connection::open("db;autocommit=maybe", RecordingExecutor::default())
        .err()
        .unwrap();
    assert_eq!(err.code(), ErrorCode::InvalidArgument);

    let conn = Connection::open(
        "db;unknownProperty=1;lenient=true;minSessions=10",
        RecordingExecutor::default(),
    )
    .unwrap();
    assert_eq!(conn.properties().get_u64("minSessions").unwrap(), Some(10));
    assert_eq!(conn.properties().get("maxSessions"), Some("400"));
}
