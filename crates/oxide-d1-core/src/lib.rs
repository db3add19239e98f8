//! Schema evolution and value transport for Cloudflare D1.
//!
//! D1 speaks SQLite over a JSON API, which leaves two gaps this crate fills:
//!
//! - **Schema evolution.** `ALTER TABLE` only appends columns, so other
//!   changes are made by recreating the table. [`ddl::DdlDocument`] parses a
//!   table's `CREATE TABLE` text into an editable structure and
//!   [`plan::MigrationPlanner`] turns an edit into the statements of the
//!   recreate protocol.
//! - **Values.** JSON has no bytes and one number type. [`codec`] tunnels
//!   byte sequences through text, and [`decode::ResultDecoder`] turns untyped
//!   result cells back into [`value::TypedScalar`]s.
//!
//! Everything here is synchronous and free of I/O; executing statements is
//! left to the caller.
//!
//! # Example
//!
//! ```rust
//! use oxide_d1_core::prelude::*;
//!
//! let doc = DdlDocument::parse("CREATE TABLE t (id INTEGER, name TEXT)").unwrap();
//! let plan = MigrationPlanner::new()
//!     .plan_column_edit(&doc, &ColumnEdit::Drop("name".into()))
//!     .unwrap();
//!
//! assert_eq!(plan.preserved_columns, vec!["id"]);
//! assert_eq!(plan.temp_table, "t__temp");
//! assert_eq!(plan.target.to_string(), "CREATE TABLE t (id INTEGER)");
//! ```

pub mod codec;
pub mod ddl;
pub mod decode;
pub mod error;
pub mod plan;
pub mod value;

pub use error::{Error, FieldKind, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::codec;
    pub use crate::ddl::{ColumnDef, ConstraintDef, DdlDocument};
    pub use crate::decode::{ColumnHint, ResultDecoder};
    pub use crate::error::{Error, FieldKind, Result};
    pub use crate::plan::{
        ColumnEdit, ConstraintEdit, DependentObject, MigrationPlan, MigrationPlanner,
        RecreateStatement, RecreateStep, SchemaEdit,
    };
    pub use crate::value::{RawValue, SqlValue, ToSqlValue, TypedScalar};
}
