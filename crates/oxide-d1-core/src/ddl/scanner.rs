//! Character-level scanning of schema text.
//!
//! Only what `CREATE TABLE` editing needs: keywords, identifiers in any of
//! SQLite's quoting styles, string literals, balanced parentheses and
//! comments. Everything else is carried through as opaque text.

use crate::error::{Error, Result};
use crate::value::SqlValue;

/// A cursor over schema text.
pub(crate) struct Cursor<'a> {
    /// The input source text.
    input: &'a str,
    /// The current byte position.
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a new cursor at the start of `input`.
    pub(crate) const fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Returns the unconsumed input.
    pub(crate) fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Returns true once all input is consumed.
    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Consumes `c` if it is next.
    pub(crate) fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skips a comment if one starts here. Returns whether one was skipped.
    fn skip_comment(&mut self) -> bool {
        if self.peek() == Some('-') && self.peek_next() == Some('-') {
            while self.peek().is_some_and(|c| c != '\n') {
                self.advance();
            }
            return true;
        }

        if self.peek() == Some('/') && self.peek_next() == Some('*') {
            self.advance();
            self.advance();
            loop {
                match self.advance() {
                    Some('*') if self.peek() == Some('/') => {
                        self.advance();
                        break;
                    }
                    None => break,
                    _ => {}
                }
            }
            return true;
        }

        false
    }

    /// Skips whitespace and comments.
    pub(crate) fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }
            if !self.skip_comment() {
                break;
            }
        }
    }

    /// Consumes `keyword` (case-insensitive, whole word) after any
    /// whitespace. Leaves the cursor untouched if it isn't there.
    pub(crate) fn eat_keyword(&mut self, keyword: &str) -> bool {
        let saved = self.pos;
        self.skip_whitespace_and_comments();
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.advance();
        }
        if self.input[start..self.pos].eq_ignore_ascii_case(keyword) {
            true
        } else {
            self.pos = saved;
            false
        }
    }

    /// Reads a bare word without consuming it.
    pub(crate) fn peek_word(&self) -> &'a str {
        let rest = self.rest();
        let end = rest
            .char_indices()
            .find(|&(_, c)| !is_word_char(c))
            .map_or(rest.len(), |(i, _)| i);
        &rest[..end]
    }

    /// Reads an identifier: bare, `"double"`, `` `backtick` `` or
    /// `[bracket]` quoted. Quotes are removed and doubled quotes unescaped.
    pub(crate) fn read_identifier(&mut self) -> Result<String> {
        self.skip_whitespace_and_comments();
        match self.peek() {
            Some(quote @ ('"' | '`')) => {
                let content = self.read_quoted(quote, quote)?;
                let doubled = format!("{quote}{quote}");
                Ok(content.replace(&doubled, &quote.to_string()))
            }
            Some('[') => self.read_quoted('[', ']').map(str::to_string),
            Some(c) if is_word_char(c) => {
                let word = self.peek_word();
                self.pos += word.len();
                Ok(word.to_string())
            }
            Some(c) => Err(Error::MalformedSchema(format!(
                "expected identifier, found '{c}'"
            ))),
            None => Err(Error::MalformedSchema(
                "expected identifier, found end of input".to_string(),
            )),
        }
    }

    /// Consumes a quoted run starting at `open` and returns its raw content.
    fn read_quoted(&mut self, open: char, close: char) -> Result<&'a str> {
        self.advance(); // opening quote
        let content_start = self.pos;
        loop {
            match self.peek() {
                Some(c) if c == close => {
                    // Doubled quotes are escapes, except for brackets.
                    if open == close && self.peek_next() == Some(close) {
                        self.advance();
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(Error::MalformedSchema(format!(
                        "unterminated {open}...{close} quote"
                    )));
                }
            }
        }
        let content = &self.input[content_start..self.pos];
        self.advance(); // closing quote
        Ok(content)
    }

    /// Consumes a parenthesized group starting at `(` and returns the text
    /// between the outer parentheses.
    pub(crate) fn read_parenthesized(&mut self) -> Result<&'a str> {
        self.skip_whitespace_and_comments();
        if !self.eat('(') {
            return Err(Error::MalformedSchema(
                "expected '(' after table name".to_string(),
            ));
        }
        let body_start = self.pos;
        let mut depth = 1_usize;
        loop {
            if self.skip_comment() {
                continue;
            }
            match self.peek() {
                Some(quote @ ('\'' | '"' | '`')) => {
                    self.read_quoted(quote, quote)?;
                }
                Some('[') => {
                    self.read_quoted('[', ']')?;
                }
                Some('(') => {
                    depth += 1;
                    self.advance();
                }
                Some(')') => {
                    depth -= 1;
                    if depth == 0 {
                        let body = &self.input[body_start..self.pos];
                        self.advance();
                        return Ok(body);
                    }
                    self.advance();
                }
                Some(_) => {
                    self.advance();
                }
                None => {
                    return Err(Error::MalformedSchema(
                        "unbalanced parentheses in table body".to_string(),
                    ));
                }
            }
        }
    }
}

/// Characters that may appear in a bare identifier or keyword.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Splits a table body on top-level commas.
///
/// Commas inside parentheses, string literals and quoted identifiers don't
/// split. Comments are dropped and runs of whitespace outside quotes become
/// a single space, so the items come back in canonical form.
pub(crate) fn split_top_level(body: &str) -> Result<Vec<String>> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut depth = 0_usize;
    let mut cursor = Cursor::new(body);

    while !cursor.is_at_end() {
        if cursor.skip_comment() {
            push_space(&mut current);
            continue;
        }
        let Some(c) = cursor.peek() else { break };
        match c {
            '\'' | '"' | '`' | '[' => {
                let start = cursor.pos;
                let close = if c == '[' { ']' } else { c };
                cursor.read_quoted(c, close)?;
                current.push_str(&body[start..cursor.pos]);
            }
            '(' => {
                depth += 1;
                current.push(c);
                cursor.advance();
            }
            ')' => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    Error::MalformedSchema("unbalanced ')' in table body".to_string())
                })?;
                current.push(c);
                cursor.advance();
            }
            ',' if depth == 0 => {
                items.push(current.trim().to_string());
                current.clear();
                cursor.advance();
            }
            c if c.is_whitespace() => {
                push_space(&mut current);
                cursor.advance();
            }
            _ => {
                current.push(c);
                cursor.advance();
            }
        }
    }

    if depth != 0 {
        return Err(Error::MalformedSchema(
            "unbalanced '(' in table body".to_string(),
        ));
    }
    items.push(current.trim().to_string());

    if items.len() == 1 && items[0].is_empty() {
        return Ok(Vec::new());
    }
    if items.iter().any(String::is_empty) {
        return Err(Error::MalformedSchema(
            "empty item in table body".to_string(),
        ));
    }
    Ok(items)
}

fn push_space(out: &mut String) {
    if !out.is_empty() && !out.ends_with(' ') {
        out.push(' ');
    }
}

/// Visits every top-level piece of `text`, telling quoted runs apart from
/// plain text. `visit` receives `(piece, quote)` where `quote` is the opening
/// quote character for quoted runs.
fn for_each_piece<'a>(
    text: &'a str,
    mut visit: impl FnMut(&'a str, Option<char>),
) -> Result<()> {
    let mut cursor = Cursor::new(text);
    let mut plain_start = 0;
    while let Some(c) = cursor.peek() {
        if matches!(c, '\'' | '"' | '`' | '[') {
            if plain_start < cursor.pos {
                visit(&text[plain_start..cursor.pos], None);
            }
            let start = cursor.pos;
            let close = if c == '[' { ']' } else { c };
            cursor.read_quoted(c, close)?;
            visit(&text[start..cursor.pos], Some(c));
            plain_start = cursor.pos;
        } else {
            cursor.advance();
        }
    }
    if plain_start < text.len() {
        visit(&text[plain_start..], None);
    }
    Ok(())
}

/// Counts occurrences of `target` outside string literals and quoted
/// identifiers.
pub(crate) fn count_unquoted(text: &str, target: char) -> usize {
    let mut count = 0;
    // Unterminated quotes simply end the count early.
    let _ = for_each_piece(text, |piece, quote| {
        if quote.is_none() {
            count += piece.matches(target).count();
        }
    });
    count
}

/// Counts `?` placeholders outside string literals and quoted identifiers.
pub(crate) fn count_placeholders(clause: &str) -> usize {
    count_unquoted(clause, '?')
}

/// Substitutes each `?` placeholder with the inline SQL form of the matching
/// argument.
///
/// # Errors
///
/// Returns [`Error::ArgumentCount`] if placeholders and arguments differ in
/// number, or [`Error::NonFiniteFloat`] for a NaN or infinite argument.
pub fn inline_placeholders(sql: &str, args: &[SqlValue]) -> Result<String> {
    let expected = count_placeholders(sql);
    if expected != args.len() {
        return Err(Error::ArgumentCount {
            expected,
            found: args.len(),
        });
    }

    let literals = args
        .iter()
        .enumerate()
        .map(|(index, arg)| arg.to_sql_inline().ok_or(Error::NonFiniteFloat { index }))
        .collect::<Result<Vec<_>>>()?;

    let mut out = String::with_capacity(sql.len());
    let mut next = literals.iter().peekable();
    for_each_piece(sql, |piece, quote| {
        if quote.is_some() {
            out.push_str(piece);
            return;
        }
        for c in piece.chars() {
            match (c, next.peek()) {
                ('?', Some(arg)) => {
                    out.push_str(arg);
                    next.next();
                }
                _ => out.push(c),
            }
        }
    })?;
    Ok(out)
}

/// Replaces whole-token occurrences of identifier `old` in `text`.
///
/// Bare occurrences become `bare_new`; quoted occurrences keep their quote
/// style and get `raw_new` inside. String literals are left alone.
pub(crate) fn replace_identifier(
    text: &str,
    old: &str,
    raw_new: &str,
    bare_new: &str,
) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    for_each_piece(text, |piece, quote| match quote {
        Some('\'') => out.push_str(piece),
        Some(open) => {
            let close = closing_quote(open);
            if unquote(piece, open).eq_ignore_ascii_case(old) {
                let escaped = if open == close {
                    raw_new.replace(open, &format!("{open}{open}"))
                } else {
                    raw_new.to_string()
                };
                out.push(open);
                out.push_str(&escaped);
                out.push(close);
            } else {
                out.push_str(piece);
            }
        }
        None => replace_bare_words(piece, old, bare_new, &mut out),
    })?;
    Ok(out)
}

/// Returns true if identifier `name` occurs in `text` as a whole token,
/// bare or quoted. String literals don't count.
pub(crate) fn mentions_identifier(text: &str, name: &str) -> Result<bool> {
    let mut found = false;
    for_each_piece(text, |piece, quote| {
        found |= match quote {
            Some('\'') => false,
            Some(open) => unquote(piece, open).eq_ignore_ascii_case(name),
            None => piece
                .split(|c: char| !is_word_char(c))
                .any(|word| word.eq_ignore_ascii_case(name)),
        };
    })?;
    Ok(found)
}

const fn closing_quote(open: char) -> char {
    if open == '[' {
        ']'
    } else {
        open
    }
}

/// Strips the quotes from a quoted identifier piece, undoing doubled quotes.
fn unquote(piece: &str, open: char) -> String {
    let close = closing_quote(open);
    let inner = &piece[open.len_utf8()..piece.len() - close.len_utf8()];
    if open == close {
        inner.replace(&format!("{open}{open}"), &open.to_string())
    } else {
        inner.to_string()
    }
}

fn replace_bare_words(piece: &str, old: &str, new: &str, out: &mut String) {
    let mut word_start: Option<usize> = None;
    for (i, c) in piece.char_indices() {
        if is_word_char(c) {
            word_start.get_or_insert(i);
        } else {
            if let Some(start) = word_start.take() {
                push_word(&piece[start..i], old, new, out);
            }
            out.push(c);
        }
    }
    if let Some(start) = word_start {
        push_word(&piece[start..], old, new, out);
    }
}

fn push_word(word: &str, old: &str, new: &str, out: &mut String) {
    if word.eq_ignore_ascii_case(old) {
        out.push_str(new);
    } else {
        out.push_str(word);
    }
}
