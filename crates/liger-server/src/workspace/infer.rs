//! Heuristic type inference for value expressions.
//!
//! Used when extracting constants and when resolving the receiver of a
//! method call from a variable assignment. Pattern-matches literals and a
//! handful of well-known calls; everything unrecognized is `Object`.

use std::sync::LazyLock;

use regex::Regex;

static NEW_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]\w*(?:::[A-Z]\w*)*)(?:\([^)]*\))?\.new\b").expect("new-call pattern")
});

static FROM_JSON_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]\w*(?:::[A-Z]\w*)*)\.from_json\b").expect("from_json pattern")
});

static BARE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z]\w*(?:::[A-Z]\w*)*)$").expect("bare-type pattern"));

static RANGE_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.]+\s*\.\.\.?\s*[\w.]+$").expect("range pattern"));

/// Return types of chained calls we recognize regardless of receiver.
const KNOWN_CALL_RETURNS: &[(&str, &str)] = &[
    (".to_s", "String"),
    (".to_i", "Int32"),
    (".to_i32", "Int32"),
    (".to_i64", "Int64"),
    (".to_f", "Float64"),
    (".to_f32", "Float32"),
    (".size", "Int32"),
    (".empty?", "Bool"),
    (".split", "Array(String)"),
    (".chars", "Array(Char)"),
    (".keys", "Array"),
    (".values", "Array"),
    (".join", "String"),
    (".inspect", "String"),
];

/// Infer a type name from a right-hand-side expression.
pub fn infer_type(expression: &str) -> String {
    let expr = expression.trim();
    if expr.is_empty() {
        return "Object".to_string();
    }

    // Literals
    if expr.starts_with('"') || expr.starts_with("String.build") {
        return "String".to_string();
    }
    if expr.starts_with('\'') {
        return "Char".to_string();
    }
    if expr.starts_with('[') {
        return "Array".to_string();
    }
    if expr.starts_with('{') {
        return "Hash".to_string();
    }
    if expr.starts_with('/') && expr.len() > 1 {
        return "Regex".to_string();
    }
    if expr.starts_with(':') {
        return "Symbol".to_string();
    }
    if expr == "true" || expr == "false" {
        return "Bool".to_string();
    }
    if expr == "nil" {
        return "Nil".to_string();
    }
    if let Some(kind) = infer_numeric(expr) {
        return kind;
    }

    // Well-known constructor shapes
    if let Some(captures) = NEW_CALL.captures(expr) {
        return captures[1].to_string();
    }
    if let Some(captures) = FROM_JSON_CALL.captures(expr) {
        return captures[1].to_string();
    }

    // Known-return chained calls
    for (suffix, return_type) in KNOWN_CALL_RETURNS {
        if strip_call_arguments(expr).ends_with(suffix) {
            return (*return_type).to_string();
        }
    }

    if RANGE_LITERAL.is_match(expr) {
        return "Range".to_string();
    }

    // A bare capitalized path names itself
    if let Some(captures) = BARE_TYPE.captures(expr) {
        return captures[1].to_string();
    }

    "Object".to_string()
}

/// Numeric literal classification, honoring type suffixes.
fn infer_numeric(expr: &str) -> Option<String> {
    let body = expr.trim_start_matches(['-', '+']);
    if body.is_empty() || !body.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    for (suffix, name) in [
        ("_i8", "Int8"),
        ("_i16", "Int16"),
        ("_i32", "Int32"),
        ("_i64", "Int64"),
        ("_u8", "UInt8"),
        ("_u16", "UInt16"),
        ("_u32", "UInt32"),
        ("_u64", "UInt64"),
        ("_f32", "Float32"),
        ("_f64", "Float64"),
        ("i8", "Int8"),
        ("i16", "Int16"),
        ("i32", "Int32"),
        ("i64", "Int64"),
        ("u8", "UInt8"),
        ("u16", "UInt16"),
        ("u32", "UInt32"),
        ("u64", "UInt64"),
        ("f32", "Float32"),
        ("f64", "Float64"),
    ] {
        if body.ends_with(suffix) && body[..body.len() - suffix.len()].chars().all(|c| c.is_ascii_digit() || c == '_' || c == '.') {
            return Some(name.to_string());
        }
    }
    let numeric = body.chars().all(|c| c.is_ascii_digit() || c == '_' || c == '.' || c == 'e' || c == 'x' || c.is_ascii_hexdigit());
    if !numeric {
        return None;
    }
    if body.contains('.') || body.contains('e') && !body.starts_with("0x") {
        Some("Float64".to_string())
    } else {
        Some("Int32".to_string())
    }
}

/// Drop a trailing argument list so `x.split(",")` matches `.split`.
fn strip_call_arguments(expr: &str) -> &str {
    if expr.ends_with(')') {
        if let Some(open) = expr.rfind('(') {
            return &expr[..open];
        }
    }
    expr
}
