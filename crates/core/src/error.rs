//! Error types for Tally tables.
//!
//! `Error` covers structural misuse (a wrong call contract); it is returned
//! through `Result`. `ComputationSkipped` is the soft, row-level outcome of a
//! failed extractor: callers drop the row or null the field and carry on.

use crate::types::DataType;
use std::fmt;

/// Result type alias for Tally operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a per-row computation (extractor, predicate, key function).
pub type RowResult<T> = std::result::Result<T, ComputationSkipped>;

/// Error types for Tally operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A record violates an invariant the table depends on.
    Validation {
        field: String,
        message: String,
    },
    /// Invalid operation (e.g. a zero-width window).
    InvalidOperation {
        message: String,
    },
    /// Invalid configuration value.
    InvalidConfig {
        key: String,
        message: String,
    },
    /// Query name or parameters not understood.
    InvalidQuery {
        query: String,
    },
    /// Input could not be parsed.
    Parse {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation { field, message } => {
                write!(f, "Validation failed on field {}: {}", field, message)
            }
            Error::InvalidOperation { message } => {
                write!(f, "Invalid operation: {}", message)
            }
            Error::InvalidConfig { key, message } => {
                write!(f, "Invalid configuration for {}: {}", key, message)
            }
            Error::InvalidQuery { query } => {
                write!(f, "Unknown query: {}", query)
            }
            Error::Parse { message } => {
                write!(f, "Parse error: {}", message)
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an unknown query error.
    pub fn invalid_query(query: impl Into<String>) -> Self {
        Error::InvalidQuery {
            query: query.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::parse(err.to_string())
    }
}

/// A per-row computation could not produce a value.
///
/// Never aborts a whole view: `filter` excludes the row, `select` and
/// `with_columns` store `Value::Null` in the affected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputationSkipped {
    /// Field the computation needed or produced, when known.
    pub field: Option<String>,
    /// Human readable reason.
    pub reason: String,
}

impl ComputationSkipped {
    /// A computation gave up for the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            field: None,
            reason: reason.into(),
        }
    }

    /// The row has no value for a field the computation reads.
    pub fn missing(field: impl Into<String>) -> Self {
        let field = field.into();
        Self {
            reason: format!("missing field {}", field),
            field: Some(field),
        }
    }

    /// The row holds a value of the wrong type for a field.
    pub fn wrong_type(field: impl Into<String>, expected: DataType) -> Self {
        let field = field.into();
        Self {
            reason: format!("field {} is not {:?}", field, expected),
            field: Some(field),
        }
    }

    /// Attaches the field the computation was producing.
    pub fn in_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }
}

impl fmt::Display for ComputationSkipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "computation skipped ({}): {}", field, self.reason),
            None => write!(f, "computation skipped: {}", self.reason),
        }
    }
}
