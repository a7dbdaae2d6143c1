use super::*;

#[test]
fn test_quote_ident_simple() {
    assert_eq!(quote_ident("users"), r#""users""#);
}

#[test]
fn test_quote_ident_with_embedded_quotes() {
    assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
}

#[test]
fn test_quote_ident_empty() {
    assert_eq!(quote_ident(""), r#""""#);
}

#[test]
fn test_quote_ident_with_dots() {
    assert_eq!(quote_ident("schema.table"), r#""schema.table""#);
}

#[test]
fn test_quote_backtick() {
    assert_eq!(quote_backtick("n"), "`n`");
    assert_eq!(quote_backtick("we`ird"), "`we\\`ird`");
    assert_eq!(quote_backtick("back\\slash"), "`back\\\\slash`");
}

#[test]
fn test_escape_sql_string() {
    assert_eq!(escape_sql_string("hello"), "hello");
    assert_eq!(escape_sql_string("it's"), "it''s");
    assert_eq!(escape_sql_string("O'Brien's"), "O''Brien''s");
}

#[test]
fn test_escape_backslash_string() {
    assert_eq!(escape_backslash_string("it's"), "it\\'s");
    assert_eq!(escape_backslash_string("a\\b"), "a\\\\b");
    assert_eq!(escape_backslash_string("line\nbreak"), "line\\nbreak");
}
