//! Error types for spanbind.

use thiserror::Error;

/// Classification of a [`BindError`].
///
/// Callers that only care about the broad category (for example to map
/// errors onto a driver-level status code) match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The caller passed something the driver cannot accept.
    InvalidArgument,
    /// Reading a stream parameter failed.
    IoFailure,
    /// The object is in a state that does not allow the operation.
    StateError,
    /// The backend executor reported a failure.
    Backend,
}

/// The main error type for spanbind operations.
#[derive(Debug, Error)]
pub enum BindError {
    /// Parameter positions are 1-based.
    #[error("Invalid parameter position {0}: positions start at 1")]
    InvalidPosition(usize),

    /// The parameter kind or declared SQL type cannot be represented by the backend.
    #[error("Unsupported parameter type: {kind}")]
    Unsupported { kind: String },

    /// A value could not be converted to the requested type.
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// A connection property name or value was rejected.
    #[error("Invalid connection property '{name}': {message}")]
    InvalidProperty { name: String, message: String },

    /// Reading a stream parameter failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The parameter store or statement has been closed.
    #[error("Statement is closed")]
    Closed,

    /// Updates are not allowed on a read-only connection.
    #[error("Connection is read-only: {0}")]
    ReadOnly(String),

    /// Query execution error.
    #[error("Execution error: {0}")]
    Execution(String),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A row of a statement batch failed; `row` is 1-based.
    #[error("Batch row {row} failed: {source}")]
    Batch {
        row: usize,
        #[source]
        source: Box<BindError>,
    },
}

impl BindError {
    /// Create an unsupported-type error.
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::Unsupported { kind: kind.into() }
    }

    /// Create an invalid property error.
    pub fn property(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProperty {
            name: name.into(),
            message: message.into(),
        }
    }

    /// The classification of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidPosition(_)
            | Self::Unsupported { .. }
            | Self::InvalidValue(_)
            | Self::InvalidProperty { .. } => ErrorCode::InvalidArgument,
            Self::Io(_) => ErrorCode::IoFailure,
            Self::Closed | Self::ReadOnly(_) => ErrorCode::StateError,
            Self::Execution(_) | Self::Connection(_) => ErrorCode::Backend,
            Self::Batch { source, .. } => source.code(),
        }
    }

    /// Wrap the failure of batch row `row` (1-based).
    pub fn batch(row: usize, source: BindError) -> Self {
        Self::Batch {
            row,
            source: Box::new(source),
        }
    }

    /// Whether this error rejects a parameter kind the backend cannot represent.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Result type alias for spanbind operations.
pub type BindResult<T> = Result<T, BindError>;
