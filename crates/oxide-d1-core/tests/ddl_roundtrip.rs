//! Round-trip and editing tests for `DdlDocument` against realistic
//! catalog text.

mod common;

use common::{assert_round_trip, parse, parse_err};
use oxide_d1_core::ddl::ConstraintDef;
use oxide_d1_core::plan::{ColumnEdit, ConstraintEdit, MigrationPlanner};
use oxide_d1_core::Error;

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn round_trip_catalog_shapes() {
    for sql in [
        "CREATE TABLE t (id INTEGER, name TEXT)",
        "CREATE TABLE \"users\" (\n  \"id\" INTEGER PRIMARY KEY AUTOINCREMENT,\n  \"email\" VARCHAR(255) NOT NULL UNIQUE,\n  \"created_at\" TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n)",
        "CREATE TABLE items (price DECIMAL(10, 2), note TEXT DEFAULT 'a, (b)')",
        "CREATE TABLE posts (id INTEGER, user_id INTEGER, CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE, UNIQUE (id, user_id))",
        "CREATE TABLE kv (k TEXT PRIMARY KEY, v BLOB) WITHOUT ROWID",
        "CREATE TABLE strict_t (a INT, b ANY) STRICT, WITHOUT ROWID",
        "CREATE TABLE [odd name] ([select] INT, `from` TEXT, \"a\"\"b\" INT)",
        "CREATE TABLE typeless (a, b, c)",
        "CREATE TABLE d1_migrations (\n\t\tid INTEGER PRIMARY KEY AUTOINCREMENT,\n\t\tname TEXT UNIQUE,\n\t\tapplied_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP NOT NULL\n)",
        "CREATE TABLE c (a INT CHECK (a > 0) /* positive */, b INT -- trailing\n)",
    ] {
        assert_round_trip(sql);
    }
}

#[test]
fn round_trip_after_edits() {
    let mut doc = parse(
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT, body TEXT, CONSTRAINT ck CHECK (length(title) > 0))",
    );
    doc.drop_column("body").unwrap();
    doc.add_column("published", "BOOLEAN DEFAULT FALSE").unwrap();
    doc.rename_constraint("ck", "title_not_empty").unwrap();
    doc.add_constraint("uq_title", "UNIQUE (title)").unwrap();

    let (sql, _) = doc.compile();
    assert_eq!(
        sql,
        "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT, published BOOLEAN DEFAULT FALSE, \
         CONSTRAINT title_not_empty CHECK (length(title) > 0), CONSTRAINT uq_title UNIQUE (title))"
    );
    assert_eq!(parse(&sql), doc);
}

#[test]
fn round_trip_after_loosely_written_edits() {
    let mut doc = parse("CREATE TABLE t (id INTEGER, name TEXT, CONSTRAINT ck CHECK (id > 0))");
    doc.add_column("note", "TEXT  NOT NULL DEFAULT ''").unwrap();
    doc.alter_column("id", "INTEGER -- key", vec![]).unwrap();
    doc.alter_constraint("ck", "CHECK (\n  id > 0\n)", vec![]).unwrap();
    doc.add_constraint_def(ConstraintDef::anonymous("UNIQUE (name)  /* one per name */"))
        .unwrap();

    let (sql, _) = doc.compile();
    assert_eq!(
        sql,
        "CREATE TABLE t (id INTEGER, name TEXT, note TEXT NOT NULL DEFAULT '', \
         CONSTRAINT ck CHECK ( id > 0 ), UNIQUE (name))"
    );
    assert_eq!(parse(&sql), doc);
    assert_round_trip(&sql);
}

#[test]
fn whitespace_and_quoting_are_normalized() {
    let loose = parse("create   table  \"t\"(\n\t\"id\"   INTEGER ,\n\tname TEXT\n) ;");
    let tight = parse("CREATE TABLE t (id INTEGER, name TEXT)");
    assert_eq!(loose, tight);
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn malformed_schema_text() {
    assert!(matches!(
        parse_err("CREATE VIEW v AS SELECT 1"),
        Error::MalformedSchema(_)
    ));
    assert!(matches!(
        parse_err("CREATE TABLE t (a INT, b TEXT DEFAULT 'x)"),
        Error::MalformedSchema(_)
    ));
}

#[test]
fn anonymous_constraints_are_not_addressable() {
    let doc = parse("CREATE TABLE t (a INT, UNIQUE (a))");
    assert_eq!(doc.constraints(), &[ConstraintDef::anonymous("UNIQUE (a)")]);
    assert!(matches!(
        MigrationPlanner::new()
            .plan_constraint_edit(&doc, &ConstraintEdit::Drop("UNIQUE".into())),
        Err(Error::FieldNotFound { .. })
    ));
}

// =============================================================================
// Planning against parsed catalog text
// =============================================================================

#[test]
fn plan_keeps_unedited_constraints_verbatim() {
    let doc = parse(
        "CREATE TABLE posts (id INTEGER, user_id INTEGER, slug TEXT, \
         CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users (id), UNIQUE (slug))",
    );
    let plan = MigrationPlanner::new()
        .plan_column_edit(&doc, &ColumnEdit::Drop("id".into()))
        .unwrap();

    assert_eq!(plan.preserved_columns, vec!["user_id", "slug"]);
    assert_eq!(
        plan.statements()[0].sql,
        "CREATE TABLE posts__temp (user_id INTEGER, slug TEXT, \
         CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users (id), UNIQUE (slug))"
    );
}

#[test]
fn plan_does_not_touch_source_document() {
    let doc = parse("CREATE TABLE t (id INTEGER, name TEXT)");
    let before = doc.clone();
    let _ = MigrationPlanner::new()
        .plan_column_edit(&doc, &ColumnEdit::Drop("name".into()))
        .unwrap();
    let _ = MigrationPlanner::new().plan_column_edit(&doc, &ColumnEdit::Drop("missing".into()));
    assert_eq!(doc, before);
}
