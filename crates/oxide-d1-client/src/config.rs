//! Connection string parsing.
//!
//! A D1 connection string looks like
//!
//! ```text
//! d1://<account-id>:<api-token>@<database-id>?timeout=<seconds>
//! ```
//!
//! The account id and token may be omitted (both become empty), the
//! database id must be a 36 character UUID and the timeout defaults to
//! 30 seconds.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{ClientError, Result};
use crate::redact::Redactor;

/// Base URL of the Cloudflare v4 API.
pub const API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Request timeout used when the connection string doesn't set one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Length of a D1 database id (a hyphenated UUID).
pub const DATABASE_ID_LEN: usize = 36;

/// Shortest string that could possibly be a connection string.
const MIN_DSN_LEN: usize = 7;

/// Parsed connection settings.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Cloudflare account id.
    pub account_id: String,
    /// API token sent as a bearer token.
    pub api_token: String,
    /// D1 database UUID.
    pub database_id: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// API base URL, without a trailing slash.
    pub api_base: String,
}

impl ConnectionConfig {
    /// Creates a config with the default timeout and API base.
    pub fn new(
        account_id: impl Into<String>,
        api_token: impl Into<String>,
        database_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            api_token: api_token.into(),
            database_id: database_id.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            api_base: API_BASE.to_string(),
        }
    }

    /// Parses a `d1://` connection string.
    ///
    /// # Errors
    ///
    /// Returns the matching [`ClientError`] config variant for an empty,
    /// short, non-`d1` or unparseable string, a database id that isn't 36
    /// characters, or a non-numeric timeout.
    pub fn parse(dsn: &str) -> Result<Self> {
        if dsn.is_empty() {
            return Err(ClientError::EmptyDsn);
        }
        if dsn.len() < MIN_DSN_LEN {
            return Err(ClientError::ShortDsn);
        }
        if !dsn.starts_with("d1") {
            return Err(ClientError::NotD1);
        }

        let url = Url::parse(dsn)?;

        let database_id = url.host_str().unwrap_or_default();
        if database_id.len() != DATABASE_ID_LEN {
            return Err(ClientError::InvalidDatabaseId(database_id.to_string()));
        }

        let timeout = match url.query_pairs().find(|(key, _)| key == "timeout") {
            Some((_, value)) => value
                .parse::<u64>()
                .map_err(|_| ClientError::InvalidTimeout(value.to_string()))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let mut config = Self::new(
            url.username(),
            url.password().unwrap_or_default(),
            database_id,
        );
        config.timeout = Duration::from_secs(timeout);
        Ok(config)
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Points the client at a different API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Returns a redactor that masks this config's secrets.
    #[must_use]
    pub fn redactor(&self) -> Redactor {
        Redactor::new().with_secret(&self.api_token)
    }

    pub(crate) fn account_url(&self, endpoint: &str) -> String {
        format!("{}/accounts/{}{endpoint}", self.api_base, self.account_id)
    }

    pub(crate) fn database_url(&self, endpoint: &str) -> String {
        self.account_url(&format!("/d1/database/{}{endpoint}", self.database_id))
    }
}

impl FromStr for ConnectionConfig {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("account_id", &self.account_id)
            .field("api_token", &self.redactor().redact(&self.api_token))
            .field("database_id", &self.database_id)
            .field("timeout", &self.timeout)
            .field("api_base", &self.api_base)
            .finish()
    }
}
