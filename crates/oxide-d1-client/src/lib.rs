//! Client for the Cloudflare D1 HTTP API.
//!
//! Statements go out as JSON with their parameters marshaled through
//! [`oxide_d1_core::value::SqlValue`] (byte sequences escaped, timestamps as
//! RFC 3339), and results come back through
//! [`oxide_d1_core::decode::ResultDecoder`] as typed rows.
//!
//! The network itself sits behind the [`Transport`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use oxide_d1_client::prelude::*;
//!
//! let conn = Connection::open(
//!     "d1://account:token@3f2a1b4c-5d6e-4f70-8192-a3b4c5d6e7f8",
//!     Arc::new(MyHttpTransport::default()),
//! )
//! .await?;
//! let rows = conn.query("SELECT id, name FROM users WHERE id = ?", &[SqlValue::Int(1)]).await?;
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod redact;
pub mod transport;
pub mod wire;

pub use error::{ClientError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::ConnectionConfig;
    pub use crate::connection::{Connection, ExecResult, Rows};
    pub use crate::error::{ClientError, Result};
    pub use crate::redact::Redactor;
    pub use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
    pub use crate::wire::{DatabaseInfo, TokenStatus};
    pub use oxide_d1_core::value::{SqlValue, TypedScalar};
}
