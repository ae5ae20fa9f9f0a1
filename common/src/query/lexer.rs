//! Statement boundary scanning for duckdb sql text.
//!
//! Tracks enough lexical state to find a top-level `;`: single quoted and
//! `E'..'` escape strings, double quoted identifiers, `$$`/`$tag$` dollar
//! quoted strings, line comments and block comments.

#[derive(Clone, Copy, PartialEq, Eq)]
enum Lex {
    Code,
    SingleQuoted,
    EscapeQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

/// `$tag$` delimiter opening at `at`, if the `$` there opens a dollar quote
///
/// `$1` style parameters and `$` inside identifiers are not quotes.
fn dollar_delimiter(text: &str, at: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if at > 0 && is_ident_byte(bytes[at - 1]) {
        return None;
    }

    let tag_len = bytes[at + 1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count();
    let close = at + 1 + tag_len;

    if bytes.get(close) != Some(&b'$') {
        return None;
    }
    if tag_len > 0 && bytes[at + 1].is_ascii_digit() {
        return None;
    }
    Some(&text[at..=close])
}

/// Byte offset of the first `;` in `text` outside literals and comments.
///
/// `at_newline` is called with the offset of every newline seen in code
/// state; returning `Some(end)` stops the scan there. Returns `None` when
/// the text ends first.
pub(crate) fn statement_end(
    text: &str,
    mut at_newline: impl FnMut(usize) -> Option<usize>,
) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut state = Lex::Code;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        let next = bytes.get(i + 1).copied();

        match state {
            Lex::Code => match b {
                b';' => return Some(i),
                b'\'' => {
                    let escaped = i > 0
                        && matches!(bytes[i - 1], b'e' | b'E')
                        && (i < 2 || !is_ident_byte(bytes[i - 2]));
                    state = if escaped {
                        Lex::EscapeQuoted
                    } else {
                        Lex::SingleQuoted
                    };
                }
                b'"' => state = Lex::DoubleQuoted,
                b'$' => {
                    if let Some(delim) = dollar_delimiter(text, i) {
                        let body = i + delim.len();
                        match text[body..].find(delim) {
                            Some(close) => i = body + close + delim.len() - 1,
                            None => return None,
                        }
                    }
                }
                b'-' if next == Some(b'-') => {
                    state = Lex::LineComment;
                    i += 1;
                }
                b'/' if next == Some(b'*') => {
                    state = Lex::BlockComment;
                    i += 1;
                }
                b'\n' => {
                    if let Some(end) = at_newline(i) {
                        return Some(end);
                    }
                }
                _ => {}
            },
            Lex::SingleQuoted | Lex::DoubleQuoted => {
                let quote = if state == Lex::SingleQuoted { b'\'' } else { b'"' };
                if b == quote {
                    if next == Some(quote) {
                        i += 1;
                    } else {
                        state = Lex::Code;
                    }
                }
            }
            Lex::EscapeQuoted => match b {
                b'\\' => i += 1,
                b'\'' if next == Some(b'\'') => i += 1,
                b'\'' => state = Lex::Code,
                _ => {}
            },
            Lex::LineComment => {
                if b == b'\n' {
                    state = Lex::Code;
                    continue;
                }
            }
            Lex::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    state = Lex::Code;
                    i += 1;
                }
            }
        }

        i += 1;
    }

    None
}

/// `text` with leading whitespace and comments removed
pub(crate) fn skip_trivia(text: &str) -> &str {
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, tail)| tail).unwrap_or("");
        } else {
            return rest;
        }
    }
}

/// true when `sql` holds at most one statement
///
/// A trailing `;` followed only by whitespace, comments or more `;` is
/// still one statement.
pub(crate) fn is_single_statement(sql: &str) -> bool {
    let Some(end) = statement_end(sql, |_| None) else {
        return true;
    };

    let mut rest = &sql[end + 1..];
    loop {
        rest = skip_trivia(rest);
        match rest.strip_prefix(';') {
            Some(after) => rest = after,
            None => return rest.is_empty(),
        }
    }
}
