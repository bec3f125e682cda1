//! Value classification
//!
//! Drivers hand back loosely typed cells; [`ValueKind`] is the small vocabulary
//! used to decide how a cell is represented as a `sea_query::Value` and how a
//! declared column type is interpreted.

use sea_query::Value;

/// The logical kind of a column or cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Integer,
    Float,
    Text,
    Bytes,
    Date,
    Time,
    DateTime,
    DateTimeTz,
    Json,
    Uuid,
    /// No declared type (expression columns, untyped SQLite columns)
    Unknown,
}

impl ValueKind {
    /// Classify a vendor's declared column type name.
    ///
    /// Follows SQLite's type-affinity rules, extended with the temporal, JSON,
    /// UUID and boolean names PostgreSQL and MySQL report. Matching is
    /// case-insensitive and ignores length/precision suffixes.
    pub fn from_declared_type(declared: &str) -> ValueKind {
        let upper = declared.trim().to_ascii_uppercase();
        if upper.is_empty() {
            return ValueKind::Unknown;
        }
        if upper.contains("UUID") {
            return ValueKind::Uuid;
        }
        if upper.contains("JSON") {
            return ValueKind::Json;
        }
        if upper.starts_with("BOOL") {
            return ValueKind::Bool;
        }
        if upper.contains("TIMESTAMPTZ") || upper.contains("WITH TIME ZONE") {
            return if upper.starts_with("TIME ") || upper == "TIMETZ" {
                ValueKind::Time
            } else {
                ValueKind::DateTimeTz
            };
        }
        if upper.contains("DATETIME") || upper.contains("TIMESTAMP") {
            return ValueKind::DateTime;
        }
        if upper.starts_with("DATE") {
            return ValueKind::Date;
        }
        if upper.starts_with("TIME") {
            return ValueKind::Time;
        }
        if upper.contains("INT") || upper.contains("SERIAL") {
            return ValueKind::Integer;
        }
        if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            return ValueKind::Text;
        }
        if upper.contains("BLOB") || upper.contains("BYTEA") || upper.contains("BINARY") {
            return ValueKind::Bytes;
        }
        if upper.contains("REAL")
            || upper.contains("FLOA")
            || upper.contains("DOUB")
            || upper.contains("NUMERIC")
            || upper.contains("DECIMAL")
        {
            return ValueKind::Float;
        }
        ValueKind::Text
    }

    /// Classify a value by its variant.
    pub fn of(value: &Value) -> ValueKind {
        match value {
            Value::Bool(_) => ValueKind::Bool,
            Value::TinyInt(_)
            | Value::SmallInt(_)
            | Value::Int(_)
            | Value::BigInt(_)
            | Value::TinyUnsigned(_)
            | Value::SmallUnsigned(_)
            | Value::Unsigned(_)
            | Value::BigUnsigned(_) => ValueKind::Integer,
            Value::Float(_) | Value::Double(_) => ValueKind::Float,
            Value::String(_) | Value::Char(_) => ValueKind::Text,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Json(_) => ValueKind::Json,
            Value::ChronoDate(_) => ValueKind::Date,
            Value::ChronoTime(_) => ValueKind::Time,
            Value::ChronoDateTime(_) => ValueKind::DateTime,
            Value::ChronoDateTimeUtc(_)
            | Value::ChronoDateTimeLocal(_)
            | Value::ChronoDateTimeWithTimeZone(_) => ValueKind::DateTimeTz,
            Value::Uuid(_) => ValueKind::Uuid,
            #[allow(unreachable_patterns)]
            _ => ValueKind::Unknown,
        }
    }

    /// The typed NULL for this kind.
    pub fn null_value(self) -> Value {
        match self {
            ValueKind::Bool => Value::Bool(None),
            ValueKind::Integer => Value::BigInt(None),
            ValueKind::Float => Value::Double(None),
            ValueKind::Text | ValueKind::Unknown => Value::String(None),
            ValueKind::Bytes => Value::Bytes(None),
            ValueKind::Date => Value::ChronoDate(None),
            ValueKind::Time => Value::ChronoTime(None),
            ValueKind::DateTime => Value::ChronoDateTime(None),
            ValueKind::DateTimeTz => Value::ChronoDateTimeUtc(None),
            ValueKind::Json => Value::Json(None),
            ValueKind::Uuid => Value::Uuid(None),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Bool => "bool",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Bytes => "bytes",
            ValueKind::Date => "date",
            ValueKind::Time => "time",
            ValueKind::DateTime => "datetime",
            ValueKind::DateTimeTz => "datetime with time zone",
            ValueKind::Json => "json",
            ValueKind::Uuid => "uuid",
            ValueKind::Unknown => "unknown",
        }
    }
}

/// Whether a value is a SQL NULL of any type.
pub fn is_null(value: &Value) -> bool {
    *value == value.as_null()
}
