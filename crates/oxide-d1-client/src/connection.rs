//! A connection to one D1 database.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use oxide_d1_core::decode::ResultDecoder;
use oxide_d1_core::value::{RawValue, SqlValue, TypedScalar};
use rand::RngExt;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::{ClientError, Result};
use crate::redact::Redactor;
use crate::transport::{HttpRequest, Method, Transport};
use crate::wire::{
    DatabaseInfo, Envelope, QueryMeta, RawRows, Statement, StatementResult, TokenStatus,
};

/// Decoded rows of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Rows {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Typed rows.
    pub rows: Vec<Vec<TypedScalar>>,
    /// Execution details.
    pub meta: QueryMeta,
}

impl Rows {
    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column (case-insensitive).
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Returns the cell at `row` in column `name`.
    #[must_use]
    pub fn get(&self, row: usize, name: &str) -> Option<&TypedScalar> {
        let index = self.column_index(name)?;
        self.rows.get(row)?.get(index)
    }
}

/// Outcome of a statement executed for its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Rows changed.
    pub rows_affected: u64,
    /// Rowid of the last inserted row.
    pub last_insert_id: i64,
}

/// A connection to a D1 database over the HTTP API.
///
/// D1 is stateless, so a connection is just credentials plus a transport.
/// Every request and response body that gets traced passes through the
/// connection's [`Redactor`] first.
pub struct Connection {
    id: String,
    config: ConnectionConfig,
    redactor: Redactor,
    transport: Arc<dyn Transport>,
    closed: AtomicBool,
}

impl Connection {
    /// Parses `dsn`, then verifies the API token.
    ///
    /// # Errors
    ///
    /// Returns a config error for a bad connection string, or whatever
    /// token verification fails with.
    pub async fn open(dsn: &str, transport: Arc<dyn Transport>) -> Result<Self> {
        let config = ConnectionConfig::parse(dsn)?;
        let conn = Self::with_config(config, transport);
        debug!(conn = %conn.id, config = ?conn.config, "Opening D1 connection");
        conn.verify_token().await?;
        Ok(conn)
    }

    /// Creates a connection without contacting the API.
    pub fn with_config(config: ConnectionConfig, transport: Arc<dyn Transport>) -> Self {
        let redactor = config.redactor();
        Self {
            id: generate_connection_id(),
            config,
            redactor,
            transport,
            closed: AtomicBool::new(false),
        }
    }

    /// Identifier of this connection in traces.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The parsed configuration.
    #[must_use]
    pub const fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Marks the connection as closed. Safe to call more than once.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(conn = %self.id, "Closed D1 connection");
        }
    }

    /// Returns true once [`close`](Self::close) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Checks that the API token is valid and active.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if the API rejects the token.
    pub async fn verify_token(&self) -> Result<TokenStatus> {
        let url = format!("{}/user/tokens/verify", self.config.api_base);
        let status: TokenStatus = self.call(Method::Get, url, None).await?.into_result()?;
        if !status.is_active() {
            warn!(conn = %self.id, status = %status.status, "API token is not active");
        }
        Ok(status)
    }

    /// Lists the account's databases.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Api`] if the API call fails.
    pub async fn list_databases(&self) -> Result<Vec<DatabaseInfo>> {
        let url = self.config.account_url("/d1/database");
        self.call(Method::Get, url, None).await?.into_result()
    }

    /// Runs a query and decodes its rows.
    ///
    /// # Errors
    ///
    /// Fails on API errors, a result count other than one, or a cell that
    /// can't be decoded.
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Rows> {
        self.query_with(sql, params, &ResultDecoder::new()).await
    }

    /// Runs a query and decodes its rows with the given decoder, e.g. one
    /// carrying per-column hints.
    ///
    /// # Errors
    ///
    /// See [`query`](Self::query).
    pub async fn query_with(
        &self,
        sql: &str,
        params: &[SqlValue],
        decoder: &ResultDecoder,
    ) -> Result<Rows> {
        let url = self.config.database_url("/raw");
        let result: StatementResult<RawRows> = self.statement(url, sql, params).await?;
        let raw = result.results.unwrap_or_default();

        let rows = raw
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(RawValue::from).collect())
            .collect::<Vec<Vec<RawValue>>>();
        let rows = decoder.decode_rows(&raw.columns, rows)?;

        debug!(conn = %self.id, rows = rows.len(), "Query OK");
        Ok(Rows {
            columns: raw.columns,
            rows,
            meta: result.meta,
        })
    }

    /// Executes a statement for its side effects.
    ///
    /// # Errors
    ///
    /// Fails on API errors or a result count other than one.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<ExecResult> {
        let url = self.config.database_url("/query");
        let result: StatementResult<serde_json::Value> = self.statement(url, sql, params).await?;
        debug!(
            conn = %self.id,
            changes = result.meta.changes,
            last_row_id = result.meta.last_row_id,
            "Exec OK"
        );
        Ok(ExecResult {
            rows_affected: result.meta.changes,
            last_insert_id: result.meta.last_row_id,
        })
    }

    async fn statement<R: DeserializeOwned>(
        &self,
        url: String,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<StatementResult<R>> {
        let body = serde_json::to_string(&Statement::new(sql, params)?)?;
        debug!(conn = %self.id, params = params.len(), "Sending statement");

        let mut results: Vec<StatementResult<R>> =
            self.call(Method::Post, url, Some(body)).await?.into_result()?;
        if results.len() != 1 {
            warn!(conn = %self.id, count = results.len(), "Result should have exactly one element");
            return Err(ClientError::UnexpectedResultCount(results.len()));
        }
        Ok(results.remove(0))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<String>,
    ) -> Result<Envelope<T>> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }

        debug!(
            conn = %self.id,
            %method,
            url = %url,
            body = %self.redactor.redact(body.as_deref().unwrap_or_default()),
            "D1 request"
        );

        let request = HttpRequest {
            method,
            url,
            headers: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_token),
                ),
            ],
            body,
            timeout: self.config.timeout,
        };

        let response = self.transport.send(request).await.map_err(|e| {
            warn!(conn = %self.id, error = %self.redactor.redact(&e.to_string()), "D1 request failed");
            e
        })?;

        debug!(
            conn = %self.id,
            status = response.status,
            body = %self.redactor.redact(&response.body),
            "D1 response"
        );

        let envelope: Envelope<T> = serde_json::from_str(&response.body)?;
        if !envelope.success {
            warn!(conn = %self.id, errors = envelope.errors.len(), "D1 API call failed");
        }
        Ok(envelope)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Generates a random id shaped like a UUID, used to tell connections apart
/// in traces.
fn generate_connection_id() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);
    let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
