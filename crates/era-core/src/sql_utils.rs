//! SQL identifier and string literal quoting utilities
//!
//! Generated SQL embeds user supplied attribute and table names; every one of
//! them goes through these helpers.

/// Quote a SQL identifier with double quotes.
///
/// Embedded double quotes are doubled, following the SQL standard. Used by
/// Postgres, Snowflake and Redshift.
///
/// # Examples
/// ```
/// use era_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("users"), r#""users""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote a SQL identifier with backticks (BigQuery).
///
/// Backslashes and embedded backticks are escaped with a backslash.
///
/// # Examples
/// ```
/// use era_core::sql_utils::quote_backtick;
/// assert_eq!(quote_backtick("users"), "`users`");
/// assert_eq!(quote_backtick("a`b"), "`a\\`b`");
/// ```
pub fn quote_backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('\\', "\\\\").replace('`', "\\`"))
}

/// Escape a SQL string literal value by doubling single quotes.
///
/// This is for use inside single-quoted SQL string literals, not identifiers.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Escape a string literal value for dialects that use backslash escapes
/// inside quoted strings (BigQuery).
pub fn escape_backslash_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[path = "sql_utils_test.rs"]
mod tests;
