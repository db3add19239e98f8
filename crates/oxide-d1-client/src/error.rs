//! Error types for the D1 client.

use thiserror::Error;

use crate::wire::ApiError;

/// Errors returned by D1 client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The connection string is empty.
    #[error("dsn is empty")]
    EmptyDsn,

    /// The connection string is too short to be valid.
    #[error("dsn specified is impossibly short")]
    ShortDsn,

    /// The connection string doesn't use the `d1` scheme.
    #[error("dsn does not start with 'd1'")]
    NotD1,

    /// The connection string could not be parsed as a URL.
    #[error("invalid dsn: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The database id is not a 36 character UUID.
    #[error("invalid database id '{0}'")]
    InvalidDatabaseId(String),

    /// The `timeout` query parameter is not a whole number of seconds.
    #[error("invalid timeout specified: '{0}'")]
    InvalidTimeout(String),

    /// The connection was closed.
    #[error("d1: connection is closed")]
    Closed,

    /// The transport failed to deliver the request.
    #[error("transport error: {0}")]
    Transport(String),

    /// The API answered with `success: false`.
    #[error("{}", format_api_errors(.0))]
    Api(Vec<ApiError>),

    /// A query response didn't contain exactly one result.
    #[error("result should have exactly one element, got {0}")]
    UnexpectedResultCount(usize),

    /// A successful response carried no `result`.
    #[error("response has no result")]
    MissingResult,

    /// A float parameter was NaN or infinite.
    #[error("parameter {index} is not a finite number")]
    NonFiniteFloat {
        /// Zero-based parameter position.
        index: usize,
    },

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A result cell could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] oxide_d1_core::Error),
}

impl ClientError {
    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Formats API errors one per line as `[idx] code: N, message: 'M'`.
fn format_api_errors(errors: &[ApiError]) -> String {
    if errors.is_empty() {
        return "api call failed without error details".to_string();
    }
    errors
        .iter()
        .enumerate()
        .map(|(idx, e)| format!("[{idx}] code: {}, message: '{}'", e.code, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
