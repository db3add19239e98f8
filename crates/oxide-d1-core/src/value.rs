//! Values crossing the D1 boundary in both directions.
//!
//! - [`SqlValue`] is what goes out: statement parameters and the bound
//!   arguments of a schema clause.
//! - [`RawValue`] is what comes back: an untyped JSON cell.
//! - [`TypedScalar`] is what the caller gets after decoding.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::codec;

/// A SQL value that can be used as a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// Text value.
    Text(String),
    /// Binary blob value, tunneled through the escape codec on the wire.
    Blob(Vec<u8>),
    /// Timestamp, sent as RFC 3339 text.
    Timestamp(DateTime<Utc>),
}

impl SqlValue {
    /// Converts the value to its JSON wire form.
    ///
    /// Returns `None` for non-finite floats, which JSON cannot carry.
    #[must_use]
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value;

        Some(match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Float(f) => Value::Number(serde_json::Number::from_f64(*f)?),
            Self::Text(s) => Value::String(s.clone()),
            Self::Blob(b) => Value::String(codec::encode(b)),
            Self::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        })
    }

    /// Returns the SQL representation for inline use (escaped).
    ///
    /// Returns `None` for non-finite floats, which have no SQL literal.
    ///
    /// **Warning**: Prefer using parameterized queries instead.
    #[must_use]
    pub fn to_sql_inline(&self) -> Option<String> {
        Some(match self {
            Self::Null => String::from("NULL"),
            Self::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Self::Int(n) => format!("{n}"),
            Self::Float(f) if !f.is_finite() => return None,
            Self::Float(f) => format!("{f:?}"),
            Self::Text(s) => quote_literal(s),
            Self::Blob(b) => {
                let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
                format!("X'{hex}'")
            }
            Self::Timestamp(ts) => {
                quote_literal(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        })
    }
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Trait for types that can be converted to SQL values.
pub trait ToSqlValue {
    /// Converts the value to a `SqlValue`.
    fn to_sql_value(self) -> SqlValue;
}

impl ToSqlValue for SqlValue {
    fn to_sql_value(self) -> SqlValue {
        self
    }
}

impl ToSqlValue for bool {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Bool(self)
    }
}

impl ToSqlValue for i64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(self)
    }
}

impl ToSqlValue for i32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for u32 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Int(i64::from(self))
    }
}

impl ToSqlValue for f64 {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Float(self)
    }
}

impl ToSqlValue for String {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(self)
    }
}

impl ToSqlValue for &str {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Text(String::from(self))
    }
}

impl ToSqlValue for Vec<u8> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self)
    }
}

impl ToSqlValue for &[u8] {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Blob(self.to_vec())
    }
}

impl ToSqlValue for DateTime<Utc> {
    fn to_sql_value(self) -> SqlValue {
        SqlValue::Timestamp(self)
    }
}

impl<T: ToSqlValue> ToSqlValue for Option<T> {
    fn to_sql_value(self) -> SqlValue {
        self.map_or(SqlValue::Null, ToSqlValue::to_sql_value)
    }
}

/// An untyped result cell as it arrives from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// JSON null.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// A number the transport delivered exactly as an integer.
    Integer(i64),
    /// Any other number; subject to the integral-vs-real rule.
    Number(f64),
    /// JSON string.
    Text(String),
    /// A timestamp that is already structured (not from JSON).
    Timestamp(DateTime<Utc>),
    /// Arrays, objects and anything else outside the recognized kinds.
    Other(serde_json::Value),
}

impl RawValue {
    /// Short name of this value's kind, used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) | Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Timestamp(_) => "timestamp",
            Self::Other(serde_json::Value::Array(_)) => "array",
            Self::Other(serde_json::Value::Object(_)) => "object",
            Self::Other(_) => "unknown",
        }
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::String(s) => Self::Text(s),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                // u64 beyond i64::MAX and every float land here.
                None => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            other => Self::Other(other),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for RawValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// A decoded, typed result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedScalar {
    /// NULL.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer (including integral values that arrived as floats).
    Integer(i64),
    /// Non-integral number.
    Real(f64),
    /// Text.
    Text(String),
    /// Bytes recovered from escaped text.
    Bytes(Vec<u8>),
    /// Timestamp.
    Timestamp(DateTime<Utc>),
}

impl TypedScalar {
    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer value, if this is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers widen.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f),
            Self::Integer(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Returns the boolean value, if this is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the text, if this is text.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns raw bytes. Text yields its UTF-8 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Returns the timestamp, if this is a timestamp.
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }
}
