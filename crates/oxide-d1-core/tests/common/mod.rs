#![allow(dead_code)]

use oxide_d1_core::ddl::DdlDocument;
use oxide_d1_core::Error;

pub fn parse(sql: &str) -> DdlDocument {
    DdlDocument::parse(sql).unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e:?}"))
}

pub fn parse_err(sql: &str) -> Error {
    DdlDocument::parse(sql).expect_err(&format!("Expected parse error for: {sql}"))
}

/// Verifies the round-trip law: compiling a parsed document and parsing the
/// result yields an equal document, and compiling again is a fixed point.
pub fn assert_round_trip(sql: &str) -> DdlDocument {
    let doc = parse(sql);
    let (compiled, args) = doc.compile();
    assert!(args.is_empty(), "catalog text should carry no arguments");

    let reparsed = parse(&compiled);
    assert_eq!(reparsed, doc, "round trip changed the document for: {sql}");
    assert_eq!(
        reparsed.compile().0,
        compiled,
        "compile is not a fixed point for: {sql}"
    );
    doc
}
