//! The backend executor seam.
//!
//! The binding core never talks to a database itself. Statements are handed
//! to an [`Executor`] as SQL with `@pN` markers plus the rendered parameter
//! map; DDL scripts are handed over as one batch.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{BindError, BindResult};
use crate::store::NamedParameters;
use crate::types::{CanonicalType, SqlType, Value};

/// SQL with `@pN` markers and the parameters they refer to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundStatement {
    pub sql: String,
    pub params: NamedParameters,
}

impl BoundStatement {
    pub fn new(sql: impl Into<String>, params: NamedParameters) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// What a statement produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExecuteResult {
    Rows(ResultSet),
    UpdateCount(u64),
}

/// A result column and the backend type of its values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: CanonicalType,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>, ty: CanonicalType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Rows returned by a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    columns: Vec<ResultColumn>,
    rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<ResultColumn>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[ResultColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Value at a 0-based row and 1-based column.
    pub fn get(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row)?.get(column.checked_sub(1)?)
    }

    pub fn metadata(&self) -> ResultSetMetadata {
        ResultSetMetadata {
            columns: self.columns.clone(),
        }
    }
}

/// Column descriptions of a result set. Column indexes are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSetMetadata {
    columns: Vec<ResultColumn>,
}

impl ResultSetMetadata {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    fn column(&self, index: usize) -> Option<&ResultColumn> {
        self.columns.get(index.checked_sub(1)?)
    }

    pub fn column_label(&self, index: usize) -> Option<&str> {
        self.column(index).map(|c| c.name.as_str())
    }

    pub fn column_type(&self, index: usize) -> Option<SqlType> {
        self.column(index).map(|c| c.ty.sql_type())
    }

    /// Backend type name, e.g. `INT64` or `ARRAY<STRING>`.
    pub fn column_type_name(&self, index: usize) -> Option<String> {
        self.column(index).map(|c| c.ty.to_string())
    }

    pub fn column_class_name(&self, index: usize) -> Option<&'static str> {
        self.column(index).map(|c| c.ty.class_name())
    }
}

/// Runs statements against a backend.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Execute one statement.
    async fn execute(&self, statement: &BoundStatement) -> BindResult<ExecuteResult>;

    /// Apply `statements` as a single unit: either all of them take effect or none.
    async fn execute_batch(&self, statements: &[String]) -> BindResult<()>;

    /// Execute `sql` once per parameter set and return the update counts.
    ///
    /// A failure is reported as [`BindError::Batch`] naming the row. This
    /// default runs the rows one by one; transactional backends override it
    /// so that a failing row leaves nothing applied.
    async fn execute_many(&self, sql: &str, rows: &[NamedParameters]) -> BindResult<Vec<u64>> {
        let mut counts = Vec::with_capacity(rows.len());
        for (i, params) in rows.iter().enumerate() {
            let statement = BoundStatement::new(sql, params.clone());
            match self.execute(&statement).await {
                Ok(ExecuteResult::UpdateCount(count)) => counts.push(count),
                Ok(ExecuteResult::Rows(_)) => {
                    return Err(BindError::batch(i + 1, rows_in_batch()));
                }
                Err(e) => return Err(BindError::batch(i + 1, e)),
            }
        }
        Ok(counts)
    }
}

/// The error for a batched statement that produced rows.
pub(crate) fn rows_in_batch() -> BindError {
    BindError::Execution("batched statement returned a result set".to_string())
}
