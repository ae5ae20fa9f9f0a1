//! Extraction of one SQL statement from free-text model output.
//!
//! Grammar, applied in order:
//!
//! 1. The trimmed text must be non-empty.
//! 2. If it contains a ```` ``` ```` fence, the body is the text after the
//!    first fence (minus an optional language tag) up to the next fence or end
//!    of text. When a statement already starts before that first fence, the
//!    fence closes it instead and the body is the text before the fence.
//!    Otherwise the body is the whole text, with one pair of wrapping single
//!    backticks removed.
//! 3. The statement starts at the first line whose first word is a SQL leading
//!    keyword or that opens with `(`. A prefix ending in `:` such as `SQL:` or
//!    `Here is the query:` is skipped. Earlier lines are commentary.
//! 4. The statement ends at the first `;` outside string literals (including
//!    `E'..'` and dollar quoted ones), quoted identifiers and comments, or at
//!    end of body. Outside a fence, a line break also ends it when the next
//!    line reads as prose: a capitalised non-keyword word opening a line that
//!    ends in `.` or `:`, or anything but SQL after a blank line.

use crate::error::{DuckAskError, Result};
use crate::query::lexer::statement_end;

const FENCE: &str = "```";

/// keywords a statement may start with
const LEADING_KEYWORDS: &[&str] = &[
    "ALTER", "ATTACH", "CALL", "COPY", "CREATE", "DELETE", "DESCRIBE", "DETACH", "DROP", "EXPLAIN",
    "FROM", "INSERT", "MERGE", "PIVOT", "PRAGMA", "SELECT", "SHOW", "SUMMARIZE", "TABLE",
    "TRUNCATE", "UNPIVOT", "UPDATE", "VALUES", "WITH",
];

/// keywords that may open a continuation line after a blank line
const CONTINUATION_KEYWORDS: &[&str] = &[
    "AND", "AS", "ASC", "BY", "CASE", "CROSS", "DESC", "ELSE", "END", "EXCEPT", "FETCH", "FULL",
    "GROUP", "HAVING", "IN", "INNER", "INTERSECT", "JOIN", "LEFT", "LIMIT", "NATURAL", "NOT",
    "OFFSET", "ON", "OR", "ORDER", "OUTER", "QUALIFY", "RIGHT", "THEN", "UNION", "USING", "WHEN",
    "WHERE", "WINDOW",
];

fn first_word(line: &str) -> &str {
    let line = line.trim_start();
    let end = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(line.len());
    &line[..end]
}

fn is_keyword(word: &str, set: &[&str]) -> bool {
    !word.is_empty() && set.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Body to extract from and whether it came from inside a fence.
///
/// A fence after the start of an unfenced statement closes that statement.
fn select_body(text: &str) -> (&str, bool) {
    let Some(open) = text.find(FENCE) else {
        return (unwrap_backticks(text), false);
    };

    let before = text[..open].trim_end();
    if !before.ends_with(':') && statement_start(before).is_some() {
        return (before, false);
    }

    let mut body = &text[open + FENCE.len()..];

    // optional info string such as `sql` or `duckdb`
    let tag = first_word(body);
    if body.starts_with(tag) && !tag.is_empty() && !is_keyword(tag, LEADING_KEYWORDS) {
        body = &body[tag.len()..];
    }

    match body.find(FENCE) {
        Some(close) => (&body[..close], true),
        None => (body, true),
    }
}

fn unwrap_backticks(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(trimmed)
}

/// `line` without a leading `label:` or `some words:` prefix
fn strip_label(line: &str) -> &str {
    let trimmed = line.trim_start();
    if starts_statement(trimmed) {
        return trimmed;
    }

    trimmed
        .match_indices(':')
        .map(|(at, _)| trimmed[at + 1..].trim_start())
        .find(|rest| starts_statement(rest))
        .unwrap_or(trimmed)
}

fn starts_statement(line: &str) -> bool {
    line.starts_with('(') || is_keyword(first_word(line), LEADING_KEYWORDS)
}

/// byte offset in `body` where the statement begins
fn statement_start(body: &str) -> Option<usize> {
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let candidate = strip_label(line);
        if starts_statement(candidate) {
            return Some(offset + (line.len() - candidate.len()));
        }
        offset += line.len();
    }
    None
}

fn reads_as_sql(line: &str) -> bool {
    let line = line.trim_start();
    match line.chars().next() {
        None => false,
        Some(c) if c.is_ascii_alphabetic() => {
            let word = first_word(line);
            is_keyword(word, LEADING_KEYWORDS) || is_keyword(word, CONTINUATION_KEYWORDS)
        }
        Some(_) => !line.starts_with(FENCE),
    }
}

/// prose closing a statement: `This returns every employee.`
fn reads_as_prose(line: &str) -> bool {
    let line = line.trim();
    let capitalised = line.chars().next().is_some_and(|c| c.is_ascii_uppercase());
    let word = first_word(line);

    capitalised
        && !is_keyword(word, LEADING_KEYWORDS)
        && !is_keyword(word, CONTINUATION_KEYWORDS)
        && (line.ends_with('.') || line.ends_with(':'))
}

/// when the newline at `at` is followed by prose, the statement ends at `at`
fn prose_break(text: &str, at: usize) -> Option<usize> {
    let rest = &text[at + 1..];
    let mut lines = rest.split('\n');
    let first = lines.next()?;

    if !first.trim().is_empty() {
        return reads_as_prose(first).then_some(at);
    }

    match lines.find(|l| !l.trim().is_empty()) {
        Some(line) if reads_as_sql(line) => None,
        _ => Some(at),
    }
}

/// extract the first sql statement from model output
pub fn extract_sql(output: &str) -> Result<String> {
    let text = output.trim();

    if text.is_empty() {
        return Err(DuckAskError::NoSqlFound("model returned empty output".to_string()));
    }

    let (body, fenced) = select_body(text);

    let start = statement_start(body).ok_or_else(|| {
        DuckAskError::NoSqlFound("output does not contain a sql statement".to_string())
    })?;

    let rest = &body[start..];
    let end = statement_end(rest, |at| {
        if fenced {
            None
        } else {
            prose_break(rest, at)
        }
    })
    .unwrap_or(rest.len());
    let statement = rest[..end].trim();

    if statement.is_empty() {
        return Err(DuckAskError::NoSqlFound("sql statement is empty".to_string()));
    }

    Ok(statement.to_string())
}
