//! Coercion of loosely typed cells into Rust types
//!
//! Drivers do not agree on representations: SQLite hands back temporal columns
//! as text or unix seconds, MySQL reports booleans as `TINYINT(1)`, and the
//! PostgreSQL driver yields native temporal values. [`TryGetable`] accepts each
//! of these shapes for a target type and rejects everything else with a
//! [`ValueExtractionError`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sea_query::Value;

use crate::error::ValueExtractionError;
use crate::value::types::{is_null, ValueKind};

/// Trait for safe value extraction from a result cell
///
/// ```rust
/// use quarry::value::TryGetable;
/// use quarry::ValueExtractionError;
/// use sea_query::Value;
///
/// assert_eq!(i32::try_get(&Value::BigInt(Some(42))), Ok(42));
/// assert_eq!(i32::try_get(&Value::Int(None)), Err(ValueExtractionError::NullValue));
/// assert_eq!(Option::<i32>::try_get(&Value::Int(None)), Ok(None));
/// ```
pub trait TryGetable: Sized {
    /// Convert a cell, failing on NULL, on an incompatible kind or on overflow.
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError>;

    /// The value a NULL cell maps to, if the type defines one.
    ///
    /// `None` means a NULL cell leaves the member at its `Default`. Temporal
    /// types map NULL to epoch zero; `Option<T>` maps it to `None`.
    fn null_default() -> Option<Self> {
        None
    }
}

impl<T: TryGetable> TryGetable for Option<T> {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        if is_null(value) {
            return Ok(None);
        }
        T::try_get(value).map(Some)
    }

    fn null_default() -> Option<Self> {
        Some(None)
    }
}

fn kind_of(value: &Value) -> &'static str {
    ValueKind::of(value).name()
}

fn integer_of(value: &Value) -> Result<i128, ValueExtractionError> {
    if is_null(value) {
        return Err(ValueExtractionError::NullValue);
    }
    let n = match value {
        Value::TinyInt(Some(v)) => i128::from(*v),
        Value::SmallInt(Some(v)) => i128::from(*v),
        Value::Int(Some(v)) => i128::from(*v),
        Value::BigInt(Some(v)) => i128::from(*v),
        Value::TinyUnsigned(Some(v)) => i128::from(*v),
        Value::SmallUnsigned(Some(v)) => i128::from(*v),
        Value::Unsigned(Some(v)) => i128::from(*v),
        Value::BigUnsigned(Some(v)) => i128::from(*v),
        Value::Bool(Some(v)) => i128::from(*v),
        other => return Err(ValueExtractionError::mismatch("integer", kind_of(other))),
    };
    Ok(n)
}

macro_rules! integer_getable {
    ($($t:ty),* $(,)?) => {
        $(
            impl TryGetable for $t {
                fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
                    let n = integer_of(value)?;
                    <$t>::try_from(n).map_err(|_| {
                        ValueExtractionError::ConversionError(format!(
                            "{} is out of range for {}",
                            n,
                            stringify!($t)
                        ))
                    })
                }
            }
        )*
    };
}

integer_getable!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl TryGetable for f64 {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Double(Some(v)) => Ok(*v),
            Value::Float(Some(v)) => Ok(f64::from(*v)),
            other if ValueKind::of(other) == ValueKind::Integer => {
                integer_of(other).map(|n| n as f64)
            }
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::mismatch("float", kind_of(other))),
        }
    }
}

impl TryGetable for f32 {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Float(Some(v)) => Ok(*v),
            other => f64::try_get(other).map(|v| v as f32),
        }
    }
}

impl TryGetable for bool {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Bool(Some(v)) => Ok(*v),
            other if ValueKind::of(other) == ValueKind::Integer => match integer_of(other)? {
                0 => Ok(false),
                1 => Ok(true),
                n => Err(ValueExtractionError::ConversionError(format!(
                    "{n} is not a boolean"
                ))),
            },
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::mismatch("bool", kind_of(other))),
        }
    }
}

impl TryGetable for String {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::String(Some(s)) => Ok(s.as_ref().clone()),
            Value::Char(Some(c)) => Ok(c.to_string()),
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::mismatch("text", kind_of(other))),
        }
    }
}

impl TryGetable for Vec<u8> {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Bytes(Some(b)) => Ok(b.as_ref().clone()),
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::mismatch("bytes", kind_of(other))),
        }
    }
}

impl TryGetable for serde_json::Value {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Json(Some(j)) => Ok(j.as_ref().clone()),
            Value::String(Some(s)) => serde_json::from_str(s)
                .map_err(|e| ValueExtractionError::ConversionError(format!("invalid json: {e}"))),
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::mismatch("json", kind_of(other))),
        }
    }
}

impl TryGetable for uuid::Uuid {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::Uuid(Some(u)) => Ok(**u),
            Value::String(Some(s)) => uuid::Uuid::parse_str(s)
                .map_err(|e| ValueExtractionError::ConversionError(format!("invalid uuid: {e}"))),
            Value::Bytes(Some(b)) => uuid::Uuid::from_slice(b)
                .map_err(|e| ValueExtractionError::ConversionError(format!("invalid uuid: {e}"))),
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::mismatch("uuid", kind_of(other))),
        }
    }
}

/// Parse the textual timestamp shapes drivers store: ISO-8601 with a space or
/// `T` separator, RFC 3339 with an offset, or a bare date.
fn parse_datetime_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn datetime_from_seconds(seconds: i128) -> Result<NaiveDateTime, ValueExtractionError> {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            ValueExtractionError::ConversionError(format!("{seconds} is not a valid unix timestamp"))
        })
}

impl TryGetable for NaiveDateTime {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::ChronoDateTime(Some(dt)) => Ok(**dt),
            Value::ChronoDateTimeUtc(Some(dt)) => Ok(dt.naive_utc()),
            Value::ChronoDateTimeLocal(Some(dt)) => Ok(dt.naive_utc()),
            Value::ChronoDateTimeWithTimeZone(Some(dt)) => Ok(dt.naive_utc()),
            Value::ChronoDate(Some(d)) => Ok(d.and_time(NaiveTime::MIN)),
            Value::String(Some(s)) => parse_datetime_text(s).ok_or_else(|| {
                ValueExtractionError::ConversionError(format!("`{s}` is not a timestamp"))
            }),
            other if ValueKind::of(other) == ValueKind::Integer => {
                datetime_from_seconds(integer_of(other)?)
            }
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::mismatch("datetime", kind_of(other))),
        }
    }

    fn null_default() -> Option<Self> {
        Some(DateTime::UNIX_EPOCH.naive_utc())
    }
}

impl TryGetable for DateTime<Utc> {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::ChronoDateTimeUtc(Some(dt)) => Ok(**dt),
            Value::ChronoDateTimeLocal(Some(dt)) => Ok(dt.with_timezone(&Utc)),
            Value::ChronoDateTimeWithTimeZone(Some(dt)) => Ok(dt.with_timezone(&Utc)),
            other => NaiveDateTime::try_get(other).map(|dt| dt.and_utc()),
        }
    }

    fn null_default() -> Option<Self> {
        Some(DateTime::UNIX_EPOCH)
    }
}

impl TryGetable for NaiveDate {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::ChronoDate(Some(d)) => Ok(**d),
            Value::String(Some(s)) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .ok()
                .or_else(|| parse_datetime_text(s).map(|dt| dt.date()))
                .ok_or_else(|| {
                    ValueExtractionError::ConversionError(format!("`{s}` is not a date"))
                }),
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            Value::ChronoTime(_) | Value::Bytes(_) | Value::Bool(_) => {
                Err(ValueExtractionError::mismatch("date", kind_of(value)))
            }
            other => NaiveDateTime::try_get(other).map(|dt| dt.date()),
        }
    }

    fn null_default() -> Option<Self> {
        Some(DateTime::UNIX_EPOCH.naive_utc().date())
    }
}

impl TryGetable for NaiveTime {
    fn try_get(value: &Value) -> Result<Self, ValueExtractionError> {
        match value {
            Value::ChronoTime(Some(t)) => Ok(**t),
            Value::ChronoDateTime(Some(dt)) => Ok(dt.time()),
            Value::String(Some(s)) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .ok()
                .or_else(|| parse_datetime_text(s).map(|dt| dt.time()))
                .ok_or_else(|| {
                    ValueExtractionError::ConversionError(format!("`{s}` is not a time"))
                }),
            other if is_null(other) => Err(ValueExtractionError::NullValue),
            other => Err(ValueExtractionError::mismatch("time", kind_of(other))),
        }
    }

    fn null_default() -> Option<Self> {
        Some(NaiveTime::MIN)
    }
}
