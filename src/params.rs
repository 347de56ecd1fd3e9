//! Named statement parameters.
//!
//! Callers reference parameters by name in statement text (`@Name` or
//! `:Name`) and supply values through a [`Params`] set. Most wire protocols
//! only accept positional placeholders, so before execution the statement is
//! expanded: each named token is replaced with the backend's placeholder
//! style and the matching values are laid out in reference order.
//!
//! The scanner only recognizes tokens outside string literals, quoted
//! identifiers, comments, `::` casts and `@@` variables. Backends whose
//! dialect escapes quotes with a backslash (MySQL's default sql_mode) opt
//! into that on top of the doubled-quote rule. The scanner does not parse or
//! validate SQL beyond that.

use crate::error::{DbError, DbResult};
use crate::value::SqlValue;
use std::fmt::Write as _;

/// A named parameter set for one statement execution.
///
/// Lookup is case-insensitive and ignores a leading sigil, so `@Name`,
/// `:name` and `Name` all refer to the same entry. Order is irrelevant.
#[derive(Debug, Clone, Default)]
pub struct Params {
    entries: Vec<(String, SqlValue)>,
}

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, replacing any existing entry with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|(existing, _)| names_match(existing, &name))
        {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
        self
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a parameter by name (sigil- and case-insensitive).
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(existing, _)| names_match(existing, name))
            .map(|(_, value)| value)
    }

    /// Number of parameters in the set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Strip the leading parameter sigil, if any.
fn bare(name: &str) -> &str {
    name.strip_prefix(['@', ':']).unwrap_or(name)
}

fn names_match(a: &str, b: &str) -> bool {
    bare(a).eq_ignore_ascii_case(bare(b))
}

/// Placeholder style of a backend's wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParamStyle {
    /// PostgreSQL: `$1`, `$2`, ...
    Numbered,
    /// MySQL and SQLite: `?`
    Question,
    /// SQL Server: `@P1`, `@P2`, ...
    AtNumbered,
    /// Oracle-style engines keep named markers; the `:` sigil is ensured on
    /// every marker even when the caller wrote `@name` or omitted the prefix
    /// in the parameter set.
    ColonNamed,
}

/// Expand named parameter markers into the backend's placeholder style.
///
/// Returns the rewritten statement and the values to bind, in reference
/// order. A marker repeated in the statement binds its value again. A marker
/// with no matching entry in `params` fails with `InvalidArgument` before any
/// I/O happens.
pub(crate) fn expand(
    sql: &str,
    params: &Params,
    style: ParamStyle,
    backslash_escapes: bool,
) -> DbResult<(String, Vec<SqlValue>)> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len() + 16);
    let mut ordered: Vec<SqlValue> = Vec::with_capacity(params.len());
    let mut i = 0;
    // Start of the verbatim run not yet copied into `out`
    let mut run = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' | b'`' => i = skip_quoted(bytes, i, backslash_escapes),
            b'[' => i = skip_bracketed(bytes, i),
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            // PostgreSQL cast operator, not a parameter marker
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            // T-SQL system variables like @@IDENTITY
            b'@' if bytes.get(i + 1) == Some(&b'@') => {
                i += 2;
                while i < bytes.len() && is_ident(bytes[i]) {
                    i += 1;
                }
            }
            sigil @ (b'@' | b':')
                if i + 1 < bytes.len() && is_ident_start(bytes[i + 1]) =>
            {
                out.push_str(&sql[run..i]);
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident(bytes[end]) {
                    end += 1;
                }
                let name = &sql[start..end];
                let value = params.get(name).ok_or_else(|| {
                    DbError::invalid_argument(format!(
                        "no value supplied for parameter '{}{}'",
                        sigil as char, name
                    ))
                })?;
                ordered.push(value.clone());
                match style {
                    ParamStyle::Numbered => {
                        let _ = write!(out, "${}", ordered.len());
                    }
                    ParamStyle::Question => out.push('?'),
                    ParamStyle::AtNumbered => {
                        let _ = write!(out, "@P{}", ordered.len());
                    }
                    ParamStyle::ColonNamed => {
                        out.push(':');
                        out.push_str(name);
                    }
                }
                i = end;
                run = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[run..]);
    Ok((out, ordered))
}

fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Skip a quoted region, honoring doubled-quote escapes and, when the
/// dialect uses them, backslash escapes. An unterminated quote runs to the
/// end of the statement; the backend will reject it.
fn skip_quoted(bytes: &[u8], start: usize, backslash_escapes: bool) -> usize {
    let quote = bytes[start];
    // Backslash escaping never applies inside backtick identifiers
    let backslash = backslash_escapes && quote != b'`';
    let mut i = start + 1;
    while i < bytes.len() {
        if backslash && bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    i.min(bytes.len())
}

fn skip_bracketed(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != b']' {
        i += 1;
    }
    (i + 1).min(bytes.len())
}

fn skip_line_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i + 1 < bytes.len() {
        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
            return i + 2;
        }
        i += 1;
    }
    bytes.len()
}
