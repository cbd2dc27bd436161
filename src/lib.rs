//! # spanbind: positional parameters for named-parameter backends
//!
//! spanbind is the binding layer of a statement-oriented SQL driver whose
//! backend only accepts typed, named parameters. It turns `?`-style
//! positional setter calls into a typed parameter map, coerces every value
//! into the backend's small type system, reads streams into memory, and
//! splits DDL scripts into one atomic batch.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use spanbind::prelude::*;
//!
//! let conn = Connection::connect("sqlite::memory:;lenient=true").await?;
//! let mut stmt = conn.prepare("INSERT INTO users (id, name) VALUES (?, ?)");
//! stmt.set_long(1, 42)?;
//! stmt.set_string(2, "ada")?;
//! stmt.execute_update().await?;
//! ```
//!
//! ## Data flow
//!
//! | Step | Module |
//! |------|--------|
//! | setter call | [`statement`] |
//! | stream read | [`stream`] |
//! | category → backend type + reported class | [`coerce`] |
//! | position → typed slot | [`store`] |
//! | `p1..pN` map handed to the backend | [`executor`], [`engine`] |

pub mod batch;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod param;
pub mod properties;
pub mod sql;
pub mod statement;
pub mod store;
pub mod stream;
pub mod types;

pub mod prelude {
    pub use crate::batch::split_script;
    pub use crate::engine::SqlxExecutor;
    pub use crate::error::*;
    pub use crate::executor::{
        BoundStatement, ExecuteResult, Executor, ResultColumn, ResultSet, ResultSetMetadata,
    };
    pub use crate::param::{Blob, Clob, Date, Parameter, SqlArray, Time, Timestamp};
    pub use crate::properties::{ResolvedProperties, list_properties, resolve_property};
    pub use crate::statement::{Connection, PreparedStatement};
    pub use crate::store::{NamedParameters, ParameterMetadata, ParameterStore};
    pub use crate::stream::StreamKind;
    pub use crate::types::{CanonicalType, SqlType, TypedValue, Value};
}

/// Split a DDL script into statements.
///
/// # Example
///
/// ```
/// let statements = spanbind::split("create table t (a int64);   ;drop table u;");
/// assert_eq!(statements, vec!["create table t (a int64)", "drop table u"]);
/// ```
pub fn split(script: &str) -> Vec<String> {
    batch::split_script(script)
}
