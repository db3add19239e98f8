//! JSON shapes exchanged with the D1 API.

use chrono::{DateTime, Utc};
use oxide_d1_core::value::SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Every v4 API response is wrapped in this envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Whether the call succeeded.
    pub success: bool,
    /// Errors, when `success` is false.
    #[serde(default)]
    pub errors: Vec<ApiError>,
    /// Informational messages.
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    /// The payload.
    pub result: Option<T>,
    /// Pagination details for list endpoints.
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

impl<T> Envelope<T> {
    /// Returns the payload, or the API errors if the call failed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] for `success: false` and
    /// [`ClientError::MissingResult`] if a successful response has no
    /// payload.
    pub fn into_result(self) -> Result<T> {
        if !self.success {
            return Err(ClientError::Api(self.errors));
        }
        self.result.ok_or(ClientError::MissingResult)
    }
}

/// An error entry of the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Cloudflare error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// A message entry of the envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Message code.
    #[serde(default)]
    pub code: i64,
    /// Message text.
    #[serde(default)]
    pub message: String,
    /// Message type, free-form.
    #[serde(rename = "type", default)]
    pub kind: Option<Value>,
}

/// Pagination details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultInfo {
    /// Items in this page.
    pub count: u64,
    /// Page number.
    pub page: u64,
    /// Page size.
    pub per_page: u64,
    /// Items across all pages.
    pub total_count: u64,
}

/// A database as returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    /// Database UUID.
    pub uuid: String,
    /// Database name.
    pub name: String,
    /// Storage backend version.
    #[serde(default)]
    pub version: String,
    /// Creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Size on disk, in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Number of tables.
    #[serde(default)]
    pub num_tables: Option<u64>,
}

/// Result of the token verification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStatus {
    /// Token id.
    pub id: String,
    /// Token status, `active` for a usable token.
    pub status: String,
}

impl TokenStatus {
    /// Returns true for an active token.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// Execution details reported with every statement result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryMeta {
    /// Whether the statement modified the database.
    pub changed_db: bool,
    /// Rows changed.
    pub changes: u64,
    /// Duration in milliseconds.
    pub duration: f64,
    /// Rowid of the last inserted row.
    pub last_row_id: i64,
    /// Rows read.
    pub rows_read: u64,
    /// Rows written.
    pub rows_written: u64,
    /// Region or colo that served the query.
    pub served_by: String,
    /// Database size after the statement, in bytes.
    pub size_after: u64,
}

/// One statement result. `R` is the row payload, which differs between the
/// `/query` and `/raw` endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StatementResult<R> {
    /// Execution details.
    #[serde(default)]
    pub meta: QueryMeta,
    /// Row payload.
    pub results: Option<R>,
    /// Whether the statement succeeded.
    #[serde(default)]
    pub success: bool,
}

/// Rows in the `/raw` form: column names plus positional values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RawRows {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// One array of cells per row.
    pub rows: Vec<Vec<Value>>,
}

/// A SQL statement with positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// SQL text.
    pub sql: String,
    /// Parameters in wire form.
    pub params: Vec<Value>,
}

impl Statement {
    /// Marshals parameters to their wire form.
    ///
    /// Byte sequences are escaped and timestamps become RFC 3339 text.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NonFiniteFloat`] for NaN or infinite floats.
    pub fn new(sql: impl Into<String>, params: &[SqlValue]) -> Result<Self> {
        let params = params
            .iter()
            .enumerate()
            .map(|(index, value)| value.to_json().ok_or(ClientError::NonFiniteFloat { index }))
            .collect::<Result<_>>()?;
        Ok(Self {
            sql: sql.into(),
            params,
        })
    }
}
