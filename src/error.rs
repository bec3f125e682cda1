//! Error types for quarry.
//!
//! Every fallible operation returns [`QuarryError`]. Driver failures are kept as
//! boxed sources so the native error stays reachable through
//! [`std::error::Error::source`].

use std::error::Error as StdError;

/// Boxed error reported by a vendor driver.
pub type DriverError = Box<dyn StdError + Send + Sync>;

/// Crate-wide result alias.
pub type Result<T, E = QuarryError> = std::result::Result<T, E>;

/// Error raised when a cell cannot be coerced into the requested Rust type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueExtractionError {
    /// The cell is NULL and the target type has no representation for it
    #[error("value is NULL")]
    NullValue,
    /// The cell holds a value of an incompatible kind
    #[error("type mismatch: expected {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },
    /// The cell has the right kind but the conversion failed (range, format)
    #[error("conversion error: {0}")]
    ConversionError(String),
}

impl ValueExtractionError {
    pub(crate) fn mismatch(expected: &str, actual: impl Into<String>) -> Self {
        ValueExtractionError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.into(),
        }
    }
}

/// Quarry error type
#[derive(Debug, thiserror::Error)]
pub enum QuarryError {
    /// Opening or closing the underlying connection failed
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: DriverError,
    },
    /// An operation was attempted on a closed client
    #[error("client is not connected")]
    NotConnected,
    /// The query model is incomplete or unsafe to render
    #[error("query build error: {0}")]
    QueryBuild(String),
    /// The driver rejected or failed a statement
    #[error("query execution failed for `{sql}`: {source}")]
    QueryExecution {
        sql: String,
        #[source]
        source: DriverError,
    },
    /// A scalar or singular expectation was violated
    #[error("cardinality error: expected {expected}, got {rows} row(s) x {columns} column(s)")]
    Cardinality {
        expected: &'static str,
        rows: usize,
        columns: usize,
    },
    /// An entity member cannot be resolved against the result
    #[error("mapping error on {entity}.{member}: {reason}")]
    Mapping {
        entity: &'static str,
        member: String,
        reason: String,
    },
    /// A cell could not be converted outside of entity mapping
    #[error(transparent)]
    Conversion(#[from] ValueExtractionError),
    /// A transaction was aborted
    #[error("{}", describe_transaction(.statement, .rolled_back, .source))]
    Transaction {
        /// Index of the failing statement, `None` when the commit itself failed
        statement: Option<usize>,
        rolled_back: bool,
        #[source]
        source: Box<QuarryError>,
    },
    /// Vendor catalog metadata could not be read or parsed
    #[error("introspection of table `{table}` failed: {reason}")]
    Introspection { table: String, reason: String },
    /// Driver-level failure outside of statement execution
    #[error("driver error: {0}")]
    Driver(String),
    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

fn describe_transaction(
    statement: &Option<usize>,
    rolled_back: &bool,
    source: &QuarryError,
) -> String {
    let outcome = if *rolled_back {
        "rolled back"
    } else {
        "rollback failed"
    };
    match statement {
        Some(index) => format!("transaction {outcome} at statement {index}: {source}"),
        None => format!("transaction commit failed ({outcome}): {source}"),
    }
}

impl QuarryError {
    pub(crate) fn connection(message: impl Into<String>, source: impl Into<DriverError>) -> Self {
        QuarryError::Connection {
            message: message.into(),
            source: source.into(),
        }
    }

    pub(crate) fn execution(sql: impl Into<String>, source: impl Into<DriverError>) -> Self {
        QuarryError::QueryExecution {
            sql: sql.into(),
            source: source.into(),
        }
    }

    pub(crate) fn mapping(
        entity: &'static str,
        member: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        QuarryError::Mapping {
            entity,
            member: member.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn introspection(table: impl Into<String>, reason: impl Into<String>) -> Self {
        QuarryError::Introspection {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Index of the failed statement when this is a transaction abort.
    pub fn failed_statement(&self) -> Option<usize> {
        match self {
            QuarryError::Transaction { statement, .. } => *statement,
            _ => None,
        }
    }

    /// The error that triggered a transaction abort, or `self` otherwise.
    pub fn root_cause(&self) -> &QuarryError {
        match self {
            QuarryError::Transaction { source, .. } => source.root_cause(),
            other => other,
        }
    }
}
