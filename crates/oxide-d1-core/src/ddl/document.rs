//! Structured, editable form of one `CREATE TABLE` statement.

use std::fmt;

use super::ident::render_identifier;
use super::scanner::{count_placeholders, count_unquoted, replace_identifier, split_top_level, Cursor};
use crate::decode::ColumnHint;
use crate::error::{Error, FieldKind, Result};
use crate::value::SqlValue;

/// Keywords that open a table constraint rather than a column.
const CONSTRAINT_KEYWORDS: [&str; 5] = ["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

/// A column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name, unquoted.
    pub name: String,
    /// Type and modifiers, verbatim (e.g. `INTEGER NOT NULL DEFAULT 0`).
    pub type_clause: String,
    /// Arguments bound to `?` placeholders in `type_clause`.
    pub args: Vec<SqlValue>,
}

impl ColumnDef {
    /// Creates a column definition without bound arguments.
    pub fn new(name: impl Into<String>, type_clause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_clause: type_clause.into(),
            args: Vec::new(),
        }
    }

    /// Binds arguments to the placeholders in the type clause.
    #[must_use]
    pub fn bind(mut self, args: Vec<SqlValue>) -> Self {
        self.args = args;
        self
    }

    fn render(&self) -> String {
        let name = render_identifier(&self.name);
        if self.type_clause.is_empty() {
            name
        } else {
            format!("{name} {}", self.type_clause)
        }
    }
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintDef {
    /// Name given with `CONSTRAINT <name>`, if any. Anonymous constraints
    /// cannot be addressed by edits.
    pub name: Option<String>,
    /// Constraint body after the name (e.g. `FOREIGN KEY (a) REFERENCES b (id)`).
    pub clause: String,
    /// Arguments bound to `?` placeholders in `clause`.
    pub args: Vec<SqlValue>,
}

impl ConstraintDef {
    /// Creates a named constraint without bound arguments.
    pub fn named(name: impl Into<String>, clause: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            clause: clause.into(),
            args: Vec::new(),
        }
    }

    /// Creates an anonymous constraint.
    pub fn anonymous(clause: impl Into<String>) -> Self {
        Self {
            name: None,
            clause: clause.into(),
            args: Vec::new(),
        }
    }

    /// Binds arguments to the placeholders in the clause.
    #[must_use]
    pub fn bind(mut self, args: Vec<SqlValue>) -> Self {
        self.args = args;
        self
    }

    fn is_named(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|own| own.eq_ignore_ascii_case(name))
    }

    fn render(&self) -> String {
        match &self.name {
            Some(name) => format!("CONSTRAINT {} {}", render_identifier(name), self.clause),
            None => self.clause.clone(),
        }
    }
}

/// One table's schema: name, ordered columns, ordered constraints and
/// trailing table options.
///
/// Lookups by column or constraint name are case-insensitive, as they are in
/// SQLite.
///
/// # Example
///
/// ```
/// use oxide_d1_core::ddl::DdlDocument;
///
/// let mut doc = DdlDocument::parse("CREATE TABLE t (id INTEGER, name TEXT)").unwrap();
/// doc.drop_column("name").unwrap();
/// assert_eq!(doc.compile().0, "CREATE TABLE t (id INTEGER)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DdlDocument {
    table_name: String,
    columns: Vec<ColumnDef>,
    constraints: Vec<ConstraintDef>,
    trailing_options: String,
}

impl DdlDocument {
    /// Creates an empty document for `table_name`.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            trailing_options: String::new(),
        }
    }

    /// Parses schema text as reported by the backend's catalog.
    ///
    /// Accepts `CREATE [TEMP|TEMPORARY] TABLE [IF NOT EXISTS] name (...)
    /// [options]`. The `TEMP` and `IF NOT EXISTS` modifiers and any schema
    /// qualifier are not kept. Catalog text never carries parameters, so a
    /// `?` placeholder outside quotes is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSchema`] if the text is not a single
    /// `CREATE TABLE` statement with at least one column, and
    /// [`Error::DuplicateField`] if a name repeats.
    pub fn parse(schema_text: &str) -> Result<Self> {
        let mut cursor = Cursor::new(schema_text);

        if !cursor.eat_keyword("CREATE") {
            return Err(Error::MalformedSchema(
                "expected CREATE TABLE statement".to_string(),
            ));
        }
        let _ = cursor.eat_keyword("TEMP") || cursor.eat_keyword("TEMPORARY");
        if !cursor.eat_keyword("TABLE") {
            return Err(Error::MalformedSchema(
                "only CREATE TABLE statements are supported".to_string(),
            ));
        }
        if cursor.eat_keyword("IF") && !(cursor.eat_keyword("NOT") && cursor.eat_keyword("EXISTS")) {
            return Err(Error::MalformedSchema(
                "expected IF NOT EXISTS".to_string(),
            ));
        }

        let mut table_name = cursor.read_identifier()?;
        cursor.skip_whitespace_and_comments();
        if cursor.eat('.') {
            table_name = cursor.read_identifier()?;
        }

        let body = cursor.read_parenthesized()?;
        let mut doc = Self::new(table_name);

        for item in split_top_level(body)? {
            let expected = count_placeholders(&item);
            if expected > 0 {
                return Err(Error::ArgumentCount { expected, found: 0 });
            }
            if is_constraint_item(&item) {
                doc.add_constraint_def(parse_constraint(&item)?)?;
            } else {
                doc.add_column_def(parse_column(&item)?)?;
            }
        }

        if doc.columns.is_empty() {
            return Err(Error::MalformedSchema(format!(
                "table '{}' declares no columns",
                doc.table_name
            )));
        }

        doc.trailing_options = parse_trailing_options(cursor.rest())?;
        Ok(doc)
    }

    /// Returns the table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns column names in declaration order.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Returns the column definitions in declaration order.
    #[must_use]
    pub fn column_defs(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the constraints in declaration order.
    #[must_use]
    pub fn constraints(&self) -> &[ConstraintDef] {
        &self.constraints
    }

    /// Returns the trailing table options, e.g. `WITHOUT ROWID, STRICT`.
    #[must_use]
    pub fn trailing_options(&self) -> &str {
        &self.trailing_options
    }

    /// Sets the trailing table options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSchema`] if the options don't scan or hold
    /// more than one statement.
    pub fn set_trailing_options(&mut self, options: &str) -> Result<()> {
        self.trailing_options = parse_trailing_options(options)?;
        Ok(())
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Looks up a named constraint.
    #[must_use]
    pub fn constraint(&self, name: &str) -> Option<&ConstraintDef> {
        self.constraints.iter().find(|c| c.is_named(name))
    }

    /// Returns true if the column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns true if the named constraint exists.
    #[must_use]
    pub fn has_constraint(&self, name: &str) -> bool {
        self.constraint(name).is_some()
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::column_not_found(name))
    }

    fn constraint_index(&self, name: &str) -> Result<usize> {
        self.constraints
            .iter()
            .position(|c| c.is_named(name))
            .ok_or_else(|| Error::constraint_not_found(name))
    }

    /// Renames the table.
    ///
    /// Whole-token references to the old name in the trailing options are
    /// rewritten too. Constraint clauses are left as they are.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSchema`] if the trailing options contain an
    /// unterminated quote.
    pub fn rename_table(&mut self, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        self.trailing_options = replace_identifier(
            &self.trailing_options,
            &self.table_name,
            &new_name,
            &render_identifier(&new_name),
        )?;
        self.table_name = new_name;
        Ok(())
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateField`] if the name is taken.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        type_clause: impl Into<String>,
    ) -> Result<()> {
        self.add_column_def(ColumnDef::new(name, type_clause))
    }

    /// Appends a column definition, with any bound arguments.
    ///
    /// The type clause is stored in the same canonical form parsing
    /// produces.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateField`] if the name is taken,
    /// [`Error::MalformedSchema`] if the clause is not a single item, or
    /// [`Error::ArgumentCount`] if placeholders and arguments disagree.
    pub fn add_column_def(&mut self, mut column: ColumnDef) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(Error::DuplicateField {
                kind: FieldKind::Column,
                name: column.name,
            });
        }
        column.type_clause = canonical_clause(&column.type_clause)?;
        check_args(&column.type_clause, &column.args)?;
        self.columns.push(column);
        Ok(())
    }

    /// Removes a column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if the column doesn't exist.
    pub fn drop_column(&mut self, name: &str) -> Result<ColumnDef> {
        let index = self.column_index(name)?;
        Ok(self.columns.remove(index))
    }

    /// Replaces a column's type clause and bound arguments in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if the column doesn't exist,
    /// [`Error::MalformedSchema`] if the clause is not a single item, or
    /// [`Error::ArgumentCount`] if placeholders and arguments disagree.
    pub fn alter_column(
        &mut self,
        name: &str,
        type_clause: impl Into<String>,
        args: Vec<SqlValue>,
    ) -> Result<()> {
        let index = self.column_index(name)?;
        let type_clause = canonical_clause(&type_clause.into())?;
        check_args(&type_clause, &args)?;
        let column = &mut self.columns[index];
        column.type_clause = type_clause;
        column.args = args;
        Ok(())
    }

    /// Appends a named constraint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateField`] if the name is taken.
    pub fn add_constraint(
        &mut self,
        name: impl Into<String>,
        clause: impl Into<String>,
    ) -> Result<()> {
        self.add_constraint_def(ConstraintDef::named(name, clause))
    }

    /// Appends a constraint definition, named or anonymous.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateField`] if a named constraint's name is
    /// taken, [`Error::MalformedSchema`] if the clause is empty or not a
    /// single item, or [`Error::ArgumentCount`] if placeholders and
    /// arguments disagree.
    pub fn add_constraint_def(&mut self, mut constraint: ConstraintDef) -> Result<()> {
        if let Some(name) = &constraint.name {
            if self.has_constraint(name) {
                return Err(Error::DuplicateField {
                    kind: FieldKind::Constraint,
                    name: name.clone(),
                });
            }
        }
        constraint.clause = canonical_constraint_clause(&constraint.clause)?;
        check_args(&constraint.clause, &constraint.args)?;
        self.constraints.push(constraint);
        Ok(())
    }

    /// Removes a named constraint. Absent names are ignored.
    ///
    /// Returns the removed constraint, if there was one.
    pub fn remove_constraint(&mut self, name: &str) -> Option<ConstraintDef> {
        let index = self.constraint_index(name).ok()?;
        Some(self.constraints.remove(index))
    }

    /// Replaces a named constraint's clause and bound arguments in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if the constraint doesn't exist,
    /// [`Error::MalformedSchema`] if the clause is empty or not a single
    /// item, or [`Error::ArgumentCount`] if placeholders and arguments
    /// disagree.
    pub fn alter_constraint(
        &mut self,
        name: &str,
        clause: impl Into<String>,
        args: Vec<SqlValue>,
    ) -> Result<()> {
        let index = self.constraint_index(name)?;
        let clause = canonical_constraint_clause(&clause.into())?;
        check_args(&clause, &args)?;
        let constraint = &mut self.constraints[index];
        constraint.clause = clause;
        constraint.args = args;
        Ok(())
    }

    /// Renames a named constraint, keeping its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldNotFound`] if `from` doesn't exist, or
    /// [`Error::DuplicateField`] if `to` is another constraint's name.
    pub fn rename_constraint(&mut self, from: &str, to: impl Into<String>) -> Result<()> {
        let index = self.constraint_index(from)?;
        let to = to.into();
        if !from.eq_ignore_ascii_case(&to) && self.has_constraint(&to) {
            return Err(Error::DuplicateField {
                kind: FieldKind::Constraint,
                name: to,
            });
        }
        self.constraints[index].name = Some(to);
        Ok(())
    }

    /// Regenerates the schema text and the arguments bound to it.
    ///
    /// Columns come first, then constraints. Arguments follow the same
    /// order, so placeholders and arguments line up.
    #[must_use]
    pub fn compile(&self) -> (String, Vec<SqlValue>) {
        let items: Vec<String> = self
            .columns
            .iter()
            .map(ColumnDef::render)
            .chain(self.constraints.iter().map(ConstraintDef::render))
            .collect();

        let mut sql = format!(
            "CREATE TABLE {} ({})",
            render_identifier(&self.table_name),
            items.join(", ")
        );
        if !self.trailing_options.is_empty() {
            sql.push(' ');
            sql.push_str(&self.trailing_options);
        }

        let args = self
            .columns
            .iter()
            .flat_map(|c| c.args.iter().cloned())
            .chain(self.constraints.iter().flat_map(|c| c.args.iter().cloned()))
            .collect();

        (sql, args)
    }

    /// Derives result decoding hints from the column type clauses.
    #[must_use]
    pub fn column_hints(&self) -> Vec<(String, ColumnHint)> {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), ColumnHint::from_type_clause(&c.type_clause)))
            .collect()
    }
}

impl fmt::Display for DdlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.compile().0)
    }
}

/// Normalizes a clause the way parsing does: comments dropped, whitespace
/// collapsed. The clause must stay one item of a table body.
fn canonical_clause(clause: &str) -> Result<String> {
    let mut items = split_top_level(clause)?;
    if items.len() > 1 {
        return Err(Error::MalformedSchema(format!(
            "clause '{clause}' spans more than one table item"
        )));
    }
    let item = items.pop().unwrap_or_default();
    if count_unquoted(&item, ';') > 0 {
        return Err(Error::MalformedSchema(format!(
            "clause '{clause}' contains a statement separator"
        )));
    }
    Ok(item)
}

fn canonical_constraint_clause(clause: &str) -> Result<String> {
    let clause = canonical_clause(clause)?;
    if clause.is_empty() {
        return Err(Error::MalformedSchema(
            "constraint has no body".to_string(),
        ));
    }
    Ok(clause)
}

fn check_args(clause: &str, args: &[SqlValue]) -> Result<()> {
    let expected = count_placeholders(clause);
    if expected == args.len() {
        Ok(())
    } else {
        Err(Error::ArgumentCount {
            expected,
            found: args.len(),
        })
    }
}

fn is_constraint_item(item: &str) -> bool {
    let word = Cursor::new(item).peek_word();
    CONSTRAINT_KEYWORDS
        .iter()
        .any(|keyword| word.eq_ignore_ascii_case(keyword))
}

fn parse_column(item: &str) -> Result<ColumnDef> {
    let mut cursor = Cursor::new(item);
    let name = cursor.read_identifier()?;
    Ok(ColumnDef::new(name, cursor.rest().trim()))
}

fn parse_constraint(item: &str) -> Result<ConstraintDef> {
    let mut cursor = Cursor::new(item);
    if !cursor.eat_keyword("CONSTRAINT") {
        return Ok(ConstraintDef::anonymous(item));
    }
    let name = cursor.read_identifier()?;
    let clause = cursor.rest().trim();
    if clause.is_empty() {
        return Err(Error::MalformedSchema(format!(
            "constraint '{name}' has no body"
        )));
    }
    Ok(ConstraintDef::named(name, clause))
}

fn parse_trailing_options(rest: &str) -> Result<String> {
    let mut items = split_top_level(rest)?;
    if let Some(last) = items.last_mut() {
        if let Some(stripped) = last.strip_suffix(';') {
            *last = stripped.trim_end().to_string();
        }
    }
    items.retain(|item| !item.is_empty());
    if items.iter().any(|item| count_unquoted(item, ';') > 0) {
        return Err(Error::MalformedSchema(
            "expected a single statement".to_string(),
        ));
    }
    Ok(items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> DdlDocument {
        DdlDocument::parse(text).unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let doc = parse("CREATE TABLE t (id INTEGER, name TEXT)");
        assert_eq!(doc.table_name(), "t");
        assert_eq!(doc.columns(), vec!["id", "name"]);
        assert_eq!(doc.column("name").unwrap().type_clause, "TEXT");
        assert!(doc.constraints().is_empty());
        assert_eq!(doc.trailing_options(), "");
    }

    #[test]
    fn test_compile_is_byte_identical_for_canonical_text() {
        let text = "CREATE TABLE t (id INTEGER, name TEXT)";
        assert_eq!(parse(text).compile(), (text.to_string(), vec![]));
    }

    #[test]
    fn test_parse_nested_type_modifiers() {
        let doc = parse("CREATE TABLE items (price DECIMAL(10,2) NOT NULL, qty INT)");
        assert_eq!(doc.columns(), vec!["price", "qty"]);
        assert_eq!(doc.column("price").unwrap().type_clause, "DECIMAL(10,2) NOT NULL");
    }

    #[test]
    fn test_parse_constraints() {
        let doc = parse(
            "CREATE TABLE posts (
                id INTEGER,
                user_id INTEGER,
                PRIMARY KEY (id),
                CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users (id),
                CHECK (id > 0)
            )",
        );
        assert_eq!(doc.columns(), vec!["id", "user_id"]);
        assert_eq!(doc.constraints().len(), 3);
        assert_eq!(doc.constraints()[0], ConstraintDef::anonymous("PRIMARY KEY (id)"));
        assert_eq!(
            doc.constraint("FK_USER").unwrap().clause,
            "FOREIGN KEY (user_id) REFERENCES users (id)"
        );
        assert_eq!(doc.constraints()[2].name, None);
    }

    #[test]
    fn test_parse_header_variants() {
        for text in [
            "create table if not exists t (a INT)",
            "CREATE TEMP TABLE \"t\" (a INT);",
            "CREATE TEMPORARY TABLE main.[t] (a INT)",
            "/* header */ CREATE TABLE `t`(a INT) ; -- done",
        ] {
            let doc = parse(text);
            assert_eq!(doc.table_name(), "t", "{text}");
            assert_eq!(doc.columns(), vec!["a"], "{text}");
            assert_eq!(doc.trailing_options(), "", "{text}");
        }
    }

    #[test]
    fn test_parse_quoted_column_names() {
        let doc = parse("CREATE TABLE t (\"first name\" TEXT, [order] INT, `x` BLOB)");
        assert_eq!(doc.columns(), vec!["first name", "order", "x"]);
        assert_eq!(
            doc.compile().0,
            "CREATE TABLE t (\"first name\" TEXT, \"order\" INT, x BLOB)"
        );
    }

    #[test]
    fn test_parse_trailing_options() {
        let doc = parse("CREATE TABLE t (id INTEGER PRIMARY KEY) WITHOUT ROWID,  STRICT;");
        assert_eq!(doc.trailing_options(), "WITHOUT ROWID, STRICT");
        assert_eq!(
            doc.compile().0,
            "CREATE TABLE t (id INTEGER PRIMARY KEY) WITHOUT ROWID, STRICT"
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for text in [
            "",
            "SELECT 1",
            "CREATE INDEX i ON t (a)",
            "CREATE TABLE t",
            "CREATE TABLE t ()",
            "CREATE TABLE t (a INT",
            "CREATE TABLE t (a INT,)",
            "CREATE TABLE t (a INT); DROP TABLE t",
            "CREATE TABLE IF t (a INT)",
            "CREATE TABLE t (CONSTRAINT c)",
        ] {
            assert!(
                matches!(DdlDocument::parse(text), Err(Error::MalformedSchema(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_duplicates_and_placeholders() {
        assert!(matches!(
            DdlDocument::parse("CREATE TABLE t (a INT, A TEXT)"),
            Err(Error::DuplicateField {
                kind: FieldKind::Column,
                ..
            })
        ));
        assert!(matches!(
            DdlDocument::parse("CREATE TABLE t (a INT DEFAULT ?)"),
            Err(Error::ArgumentCount {
                expected: 1,
                found: 0
            })
        ));
    }

    #[test]
    fn test_clone_is_independent() {
        let original = parse("CREATE TABLE t (id INTEGER, name TEXT)");
        let mut copy = original.clone();
        copy.drop_column("name").unwrap();
        copy.rename_table("u").unwrap();
        assert_eq!(original.columns(), vec!["id", "name"]);
        assert_eq!(original.table_name(), "t");
    }

    #[test]
    fn test_rename_table_rewrites_whole_tokens_only() {
        let mut doc = DdlDocument::new("t");
        doc.add_column("id", "INTEGER").unwrap();
        doc.set_trailing_options("WITHOUT ROWID").unwrap();
        doc.add_constraint("c", "CHECK (id > 0)").unwrap();
        doc.rename_table("t__temp").unwrap();
        assert_eq!(doc.table_name(), "t__temp");
        assert_eq!(doc.trailing_options(), "WITHOUT ROWID");

        let mut doc = DdlDocument::new("users");
        doc.add_column("id", "INTEGER").unwrap();
        doc.set_trailing_options("users users_x \"users\"").unwrap();
        doc.rename_table("members").unwrap();
        assert_eq!(doc.trailing_options(), "members users_x \"members\"");
    }

    #[test]
    fn test_add_then_remove_constraint_restores_list() {
        let mut doc = parse("CREATE TABLE t (a INT, b INT, CONSTRAINT u UNIQUE (a), CHECK (b > 0))");
        let before = doc.constraints().to_vec();
        doc.add_constraint("ck_b", "CHECK (b < 10)").unwrap();
        assert_eq!(doc.constraints().len(), 3);
        assert!(doc.remove_constraint("ck_b").is_some());
        assert_eq!(doc.constraints(), before.as_slice());
        assert!(doc.remove_constraint("ck_b").is_none());
        assert_eq!(doc.constraints(), before.as_slice());
    }

    #[test]
    fn test_column_edits() {
        let mut doc = parse("CREATE TABLE t (a INT, b INT, c INT)");
        doc.alter_column("B", "TEXT NOT NULL", vec![]).unwrap();
        doc.drop_column("a").unwrap();
        doc.add_column("d", "BLOB").unwrap();
        assert_eq!(doc.compile().0, "CREATE TABLE t (b TEXT NOT NULL, c INT, d BLOB)");

        assert_eq!(doc.drop_column("zz"), Err(Error::column_not_found("zz")));
        assert!(matches!(
            doc.add_column("c", "INT"),
            Err(Error::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_constraint_edits() {
        let mut doc = parse("CREATE TABLE t (a INT, CONSTRAINT one CHECK (a > 0), CONSTRAINT two UNIQUE (a))");
        doc.rename_constraint("one", "positive").unwrap();
        doc.alter_constraint("two", "CHECK (a < ?)", vec![SqlValue::Int(100)]).unwrap();
        assert_eq!(
            doc.compile(),
            (
                "CREATE TABLE t (a INT, CONSTRAINT positive CHECK (a > 0), CONSTRAINT two CHECK (a < ?))"
                    .to_string(),
                vec![SqlValue::Int(100)]
            )
        );
        assert!(matches!(
            doc.rename_constraint("positive", "two"),
            Err(Error::DuplicateField { .. })
        ));
        assert_eq!(
            doc.rename_constraint("missing", "x"),
            Err(Error::constraint_not_found("missing"))
        );
    }

    #[test]
    fn test_bound_arguments_survive_unrelated_edits() {
        let mut doc = DdlDocument::new("t");
        doc.add_column("a", "INT").unwrap();
        doc.add_column_def(ColumnDef::new("b", "TEXT DEFAULT ?").bind(vec![SqlValue::Text("x".into())]))
            .unwrap();
        doc.add_constraint_def(
            ConstraintDef::named("ck", "CHECK (a BETWEEN ? AND ?)")
                .bind(vec![SqlValue::Int(1), SqlValue::Int(9)]),
        )
        .unwrap();
        doc.drop_column("a").unwrap();
        doc.add_column("c", "INT").unwrap();

        let (sql, args) = doc.compile();
        assert_eq!(
            sql,
            "CREATE TABLE t (b TEXT DEFAULT ?, c INT, CONSTRAINT ck CHECK (a BETWEEN ? AND ?))"
        );
        assert_eq!(
            args,
            vec![SqlValue::Text("x".into()), SqlValue::Int(1), SqlValue::Int(9)]
        );
    }

    #[test]
    fn test_edited_clauses_are_canonical() {
        let mut doc = parse("CREATE TABLE t (id INTEGER, name TEXT)");
        doc.add_column("note", "TEXT  NOT NULL\n DEFAULT ''").unwrap();
        doc.alter_column("id", "INTEGER -- key", vec![]).unwrap();
        doc.add_constraint("ck", "CHECK (id > 0) /* positive */").unwrap();

        assert_eq!(doc.column("note").unwrap().type_clause, "TEXT NOT NULL DEFAULT ''");
        assert_eq!(doc.column("id").unwrap().type_clause, "INTEGER");
        assert_eq!(doc.constraint("ck").unwrap().clause, "CHECK (id > 0)");
        assert_eq!(parse(&doc.compile().0), doc);
    }

    #[test]
    fn test_edited_clauses_must_be_one_item() {
        let mut doc = parse("CREATE TABLE t (id INTEGER)");
        for clause in ["INTEGER, evil TEXT", "INTEGER); DROP TABLE t; --", "INT (", "INT; DROP TABLE t"] {
            assert!(
                matches!(doc.alter_column("id", clause, vec![]), Err(Error::MalformedSchema(_))),
                "accepted {clause:?}"
            );
        }
        assert!(matches!(
            doc.add_constraint("empty", "  -- nothing"),
            Err(Error::MalformedSchema(_))
        ));
        assert_eq!(doc.compile().0, "CREATE TABLE t (id INTEGER)");
    }

    #[test]
    fn test_argument_count_is_checked() {
        let mut doc = DdlDocument::new("t");
        assert_eq!(
            doc.add_column_def(ColumnDef::new("a", "INT DEFAULT ?")),
            Err(Error::ArgumentCount {
                expected: 1,
                found: 0
            })
        );
        doc.add_column("a", "INT").unwrap();
        assert_eq!(
            doc.alter_column("a", "INT", vec![SqlValue::Int(1)]),
            Err(Error::ArgumentCount {
                expected: 0,
                found: 1
            })
        );
    }

    #[test]
    fn test_column_hints() {
        let doc = parse("CREATE TABLE t (id INTEGER, payload BLOB, note TEXT)");
        assert_eq!(
            doc.column_hints(),
            vec![
                ("id".to_string(), ColumnHint::Auto),
                ("payload".to_string(), ColumnHint::Bytes),
                ("note".to_string(), ColumnHint::Text),
            ]
        );
    }
}
