//! Turning untyped result rows into typed rows.
//!
//! D1 returns every cell as plain JSON, so the type of a cell has to be
//! recovered from its shape and its column name:
//!
//! 1. Columns named like `created_at` / `update_time` hold timestamps. Their
//!    text is parsed, and a parse failure fails the whole row.
//! 2. Text that is fully escaped (see [`crate::codec`]) is decoded to bytes.
//! 3. Everything else keeps its JSON kind. Numbers with no fractional part
//!    become integers.
//!
//! # Known limitations
//!
//! Rule 2 cannot tell escaped bytes from a text value that happens to have
//! the same shape. Give the decoder a [`ColumnHint`] for such columns (for
//! example via [`crate::ddl::DdlDocument::column_hints`]). The empty string
//! matches the shape trivially; without a hint it is kept as text.
//!
//! Rule 3 runs on `f64`. Integral floats above 2^53 have already lost
//! precision before they reach the decoder, so the integer they turn into
//! may not be the one that was stored.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::codec;
use crate::error::{Error, Result};
use crate::value::{RawValue, TypedScalar};

/// Column names whose text values are parsed as timestamps.
pub const TEMPORAL_COLUMNS: [&str; 6] = [
    "created_at",
    "updated_at",
    "deleted_at",
    "creation_time",
    "update_time",
    "delete_time",
];

/// Returns true if `column` is one of the recognized timestamp columns.
#[must_use]
pub fn is_temporal_column(column: &str) -> bool {
    let lower = column.to_ascii_lowercase();
    TEMPORAL_COLUMNS.contains(&lower.as_str())
}

/// How text in a column should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColumnHint {
    /// Apply the shape heuristic.
    #[default]
    Auto,
    /// Always text, even if it looks escaped.
    Text,
    /// Always bytes.
    Bytes,
}

impl ColumnHint {
    /// Derives a hint from a declared column type, using SQLite's affinity
    /// rules for the text/blob split.
    #[must_use]
    pub fn from_type_clause(type_clause: &str) -> Self {
        let upper = type_clause.to_ascii_uppercase();
        if upper.contains("BLOB") || upper.contains("BINARY") || upper.contains("BYTEA") {
            Self::Bytes
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else {
            Self::Auto
        }
    }
}

/// Applies the integral-vs-real rule to a transported number.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn classify_number(n: f64) -> TypedScalar {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range.
    let in_range = n >= i64::MIN as f64 && n < i64::MAX as f64;
    if n.is_finite() && n.trunc() == n && in_range {
        TypedScalar::Integer(n as i64)
    } else {
        TypedScalar::Real(n)
    }
}

/// Parses the timestamp text found in temporal columns.
///
/// Accepts RFC 3339 (with or without fractional seconds) and SQLite's
/// `CURRENT_TIMESTAMP` form, which is taken to be UTC.
///
/// # Errors
///
/// Returns [`Error::InvalidTimestamp`] if neither form matches.
pub fn parse_timestamp(column: &str, text: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::InvalidTimestamp {
            column: column.to_string(),
            value: text.to_string(),
        })
}

/// Decodes untyped rows into [`TypedScalar`] rows.
#[derive(Debug, Clone, Default)]
pub struct ResultDecoder {
    hints: HashMap<String, ColumnHint>,
}

impl ResultDecoder {
    /// Creates a decoder that relies on the heuristics alone.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the hint for one column. Column names match case-insensitively.
    #[must_use]
    pub fn with_hint(mut self, column: impl AsRef<str>, hint: ColumnHint) -> Self {
        self.hints
            .insert(column.as_ref().to_ascii_lowercase(), hint);
        self
    }

    /// Sets hints for several columns.
    #[must_use]
    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnHint)>,
        S: AsRef<str>,
    {
        for (column, hint) in hints {
            self = self.with_hint(column, hint);
        }
        self
    }

    /// Returns the hint in effect for `column`.
    #[must_use]
    pub fn hint(&self, column: &str) -> ColumnHint {
        self.hints
            .get(&column.to_ascii_lowercase())
            .copied()
            .unwrap_or_default()
    }

    /// Decodes one row. Cells are matched to columns by position.
    ///
    /// # Errors
    ///
    /// Fails on a column/value count mismatch or on the first cell that
    /// cannot be decoded; no partially typed row is returned.
    pub fn decode_row<S: AsRef<str>>(
        &self,
        columns: &[S],
        values: Vec<RawValue>,
    ) -> Result<Vec<TypedScalar>> {
        if columns.len() != values.len() {
            return Err(Error::ColumnCountMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        columns
            .iter()
            .zip(values)
            .map(|(column, value)| self.decode_cell(column.as_ref(), value))
            .collect()
    }

    /// Decodes every row of a result set, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// See [`ResultDecoder::decode_row`].
    pub fn decode_rows<S: AsRef<str>>(
        &self,
        columns: &[S],
        rows: Vec<Vec<RawValue>>,
    ) -> Result<Vec<Vec<TypedScalar>>> {
        rows.into_iter()
            .map(|row| self.decode_row(columns, row))
            .collect()
    }

    /// Decodes a single cell belonging to `column`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTimestamp`], [`Error::MalformedEscape`] or
    /// [`Error::UnsupportedValueKind`].
    pub fn decode_cell(&self, column: &str, value: RawValue) -> Result<TypedScalar> {
        match value {
            RawValue::Null => Ok(TypedScalar::Null),
            RawValue::Text(text) if is_temporal_column(column) => {
                parse_timestamp(column, &text).map(TypedScalar::Timestamp)
            }
            RawValue::Text(text) => self.decode_text(column, text),
            RawValue::Bool(b) => Ok(TypedScalar::Bool(b)),
            RawValue::Integer(n) => Ok(TypedScalar::Integer(n)),
            RawValue::Number(n) => Ok(classify_number(n)),
            RawValue::Timestamp(ts) => Ok(TypedScalar::Timestamp(ts)),
            other @ RawValue::Other(_) => Err(Error::UnsupportedValueKind {
                column: column.to_string(),
                kind: other.kind(),
            }),
        }
    }

    fn decode_text(&self, column: &str, text: String) -> Result<TypedScalar> {
        match self.hint(column) {
            ColumnHint::Text => Ok(TypedScalar::Text(text)),
            ColumnHint::Bytes if codec::is_fully_escaped(&text) => {
                codec::decode(&text).map(TypedScalar::Bytes)
            }
            ColumnHint::Bytes => Ok(TypedScalar::Bytes(text.into_bytes())),
            ColumnHint::Auto if !text.is_empty() && codec::is_fully_escaped(&text) => {
                codec::decode(&text).map(TypedScalar::Bytes)
            }
            ColumnHint::Auto => Ok(TypedScalar::Text(text)),
        }
    }
}
