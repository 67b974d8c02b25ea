//! Statement Classification and Literal Quoting
//!
//! The generic SQL executor decides between "returns rows" and "returns an
//! affected-row count" from the statement's leading keyword. Comments are
//! stripped first so `/* hint */ SELECT ...` still counts as a query.
//!
//! Several statements this crate builds cannot use bound parameters
//! (`INTO DUMPFILE` paths, `SONAME`, UDF arguments in ad-hoc `SELECT`s), so
//! strings are inlined through [`quote_string_literal`], never interpolated raw.

/// How a statement is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// Returns a row set
    Query,
    /// Returns an affected-row count
    Mutation,
}

/// Leading keywords whose statements return rows
const ROW_KEYWORDS: &[&str] = &["SELECT", "SHOW", "DESCRIBE", "DESC", "EXPLAIN", "WITH"];

/// Classify a statement by its leading keyword
///
/// Returns `None` for an empty (or comment-only) statement.
#[must_use]
pub fn classify(sql: &str) -> Option<StatementKind> {
    let keyword = leading_keyword(sql)?;
    if ROW_KEYWORDS.contains(&keyword.as_str()) {
        Some(StatementKind::Query)
    } else {
        Some(StatementKind::Mutation)
    }
}

/// First keyword of the statement, uppercased, with comments removed
#[must_use]
pub fn leading_keyword(sql: &str) -> Option<String> {
    let stripped = strip_comments(sql);
    let word: String = stripped
        .trim_start()
        .trim_start_matches('(')
        .chars()
        .take_while(|c| c.is_ascii_alphabetic() || *c == '_')
        .collect();

    if word.is_empty() {
        None
    } else {
        Some(word.to_ascii_uppercase())
    }
}

/// Strip SQL comments from a statement
///
/// Handles:
/// - Line comments: -- comment and # comment
/// - Block comments: /* comment */
///
/// Quoted strings are copied verbatim so comment markers inside them survive.
#[must_use]
pub fn strip_comments(sql: &str) -> String {
    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' | '`' => {
                result.push(ch);
                let quote = ch;
                while let Some(inner) = chars.next() {
                    result.push(inner);
                    if inner == '\\' && quote != '`' {
                        if let Some(escaped) = chars.next() {
                            result.push(escaped);
                        }
                    } else if inner == quote {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                chars.next();
                skip_line(&mut chars, &mut result);
            }
            '#' => skip_line(&mut chars, &mut result),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
                result.push(' ');
            }
            _ => result.push(ch),
        }
    }

    result
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, result: &mut String) {
    for ch in chars.by_ref() {
        if ch == '\n' {
            result.push('\n');
            break;
        }
    }
}

/// Quote `value` as a MySQL single-quoted string literal
///
/// Escapes backslash, single and double quote, NUL, newline, carriage return
/// and Ctrl-Z, the same set the server's own `QUOTE()` escapes.
#[must_use]
pub fn quote_string_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '"' => quoted.push_str("\\\""),
            '\0' => quoted.push_str("\\0"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\u{1a}' => quoted.push_str("\\Z"),
            _ => quoted.push(ch),
        }
    }
    quoted.push('\'');
    quoted
}
