//! `CREATE TABLE` parsing, editing and regeneration.
//!
//! D1 cannot alter columns or constraints in place, so schema changes are
//! made by editing a [`DdlDocument`] parsed from the catalog and recreating
//! the table from the compiled result.

mod document;
mod ident;
mod scanner;

pub use document::{ColumnDef, ConstraintDef, DdlDocument};
pub use ident::{is_plain_identifier, is_reserved, quote_identifier, render_identifier};
pub use scanner::inline_placeholders;
pub(crate) use scanner::mentions_identifier;
