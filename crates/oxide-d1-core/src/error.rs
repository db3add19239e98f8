//! Error types for schema editing and value decoding.

use std::fmt;

use thiserror::Error;

/// What kind of schema item an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// A table column.
    Column,
    /// A named table constraint.
    Constraint,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column => f.write_str("column"),
            Self::Constraint => f.write_str("constraint"),
        }
    }
}

/// Errors produced by the core transforms.
///
/// None of these are retried internally; they are all handed back to the
/// caller as-is.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The schema text is not a single `CREATE TABLE` statement.
    #[error("malformed schema: {0}")]
    MalformedSchema(String),

    /// A named column or constraint does not exist.
    #[error("{kind} '{name}' not found")]
    FieldNotFound {
        /// Column or constraint.
        kind: FieldKind,
        /// The name that was looked up.
        name: String,
    },

    /// A column or constraint with this name already exists.
    #[error("{kind} '{name}' already exists")]
    DuplicateField {
        /// Column or constraint.
        kind: FieldKind,
        /// The conflicting name.
        name: String,
    },

    /// The edit would leave the table without columns.
    #[error("table '{0}' would have no columns left")]
    EmptyTable(String),

    /// A clause's `?` placeholders don't match the arguments supplied with it.
    #[error("clause has {expected} placeholder(s) but {found} argument(s) were supplied")]
    ArgumentCount {
        /// Placeholders found in the clause text.
        expected: usize,
        /// Arguments supplied.
        found: usize,
    },

    /// A string shaped like escaped bytes could not be decoded.
    #[error("malformed escape at byte {position}: {reason}")]
    MalformedEscape {
        /// Byte offset of the offending unit.
        position: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// A result cell had a kind outside the recognized set.
    #[error("unsupported value kind '{kind}' in column '{column}'")]
    UnsupportedValueKind {
        /// Column the cell belongs to.
        column: String,
        /// The kind that was received.
        kind: &'static str,
    },

    /// A temporal column held text that is not a valid timestamp.
    #[error("invalid timestamp '{value}' in column '{column}'")]
    InvalidTimestamp {
        /// Column the cell belongs to.
        column: String,
        /// The text that failed to parse.
        value: String,
    },

    /// A float argument is NaN or infinite and has no SQL literal.
    #[error("argument {index} is a non-finite float")]
    NonFiniteFloat {
        /// Position of the argument.
        index: usize,
    },

    /// A row had a different number of cells than there are columns.
    #[error("row has {values} value(s) but result has {columns} column(s)")]
    ColumnCountMismatch {
        /// Declared column count.
        columns: usize,
        /// Cells in the row.
        values: usize,
    },
}

impl Error {
    pub(crate) fn column_not_found(name: impl Into<String>) -> Self {
        Self::FieldNotFound {
            kind: FieldKind::Column,
            name: name.into(),
        }
    }

    pub(crate) fn constraint_not_found(name: impl Into<String>) -> Self {
        Self::FieldNotFound {
            kind: FieldKind::Constraint,
            name: name.into(),
        }
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_not_found_message() {
        let err = Error::column_not_found("email");
        assert_eq!(err.to_string(), "column 'email' not found");

        let err = Error::constraint_not_found("fk_user");
        assert_eq!(err.to_string(), "constraint 'fk_user' not found");
    }
}
