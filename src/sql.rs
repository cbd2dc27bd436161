//! Placeholder lexer using nom.
//!
//! Splits SQL text into segments so that parameter markers can be found and
//! rewritten without touching string literals or comments.
//!
//! ```text
//! SELECT * FROM t WHERE a = ? AND b = '?' -- ?
//! ─────────┬───────────────┬ ───────┬┬┬─ ──┬─
//!          │               │        │││    └── Comment
//!          │               │        ││└── Literal
//!          │               │        │└── Text
//!          │               └── Positional
//!          └── Text
//! ```

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take, take_until, take_while, take_while1},
    character::complete::char,
    combinator::{map, recognize, rest, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{pair, preceded, terminated},
    IResult,
};

/// A lexical piece of a SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// A quoted string or identifier, quotes included.
    Literal(&'a str),
    Comment(&'a str),
    /// A `?` marker.
    Positional,
    /// An `@name` marker, without the `@`.
    Named(&'a str),
}

/// Split `sql` into segments.
pub fn parse_segments(sql: &str) -> Vec<Segment<'_>> {
    match many0(segment)(sql) {
        Ok((_, segments)) => segments,
        Err(_) => vec![Segment::Text(sql)],
    }
}

fn segment(input: &str) -> IResult<&str, Segment<'_>> {
    alt((
        map(quoted, Segment::Literal),
        map(line_comment, Segment::Comment),
        map(block_comment, Segment::Comment),
        value(Segment::Positional, char('?')),
        map(preceded(char('@'), identifier), Segment::Named),
        map(is_not("'\"`?@-/"), Segment::Text),
        map(take(1usize), Segment::Text),
    ))(input)
}

/// A quoted literal. Backslash escapes the next character; an unterminated
/// literal runs to the end of the input.
fn quoted(input: &str) -> IResult<&str, &str> {
    let mut chars = input.char_indices();
    let quote = match chars.next() {
        Some((_, c @ ('\'' | '"' | '`'))) => c,
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Char))),
    };
    let mut escaped = false;
    for (i, c) in chars {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            let end = i + c.len_utf8();
            return Ok((&input[end..], &input[..end]));
        }
    }
    Ok(("", input))
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(tag("--"), take_while(|c: char| c != '\n')))(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        tag("/*"),
        alt((terminated(take_until("*/"), tag("*/")), rest)),
    ))(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Number of `?` markers outside literals and comments.
pub fn count_placeholders(sql: &str) -> usize {
    parse_segments(sql)
        .iter()
        .filter(|s| matches!(s, Segment::Positional))
        .count()
}

/// Rewrite each `?` marker to `@pN` in order of appearance.
///
/// Numbering starts after the highest `@pN` already written in the
/// statement, so `SELECT @p1, ?` becomes `SELECT @p1, @p2`.
pub fn to_named_parameters(sql: &str) -> String {
    let segments = parse_segments(sql);
    let mut n = segments
        .iter()
        .filter_map(|s| match s {
            Segment::Named(name) => parameter_position(name),
            _ => None,
        })
        .max()
        .unwrap_or(0);

    let mut out = String::with_capacity(sql.len() + 8);
    for segment in segments {
        match segment {
            Segment::Positional => {
                n += 1;
                out.push_str(&format!("@p{}", n));
            }
            Segment::Named(name) => {
                out.push('@');
                out.push_str(name);
            }
            Segment::Text(s) | Segment::Literal(s) | Segment::Comment(s) => out.push_str(s),
        }
    }
    out
}

/// SQL with numbered `$k` markers and the parameter position bound to each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedSql {
    pub sql: String,
    /// `order[k - 1]` is the 1-based parameter position `$k` refers to.
    pub order: Vec<usize>,
}

/// Rewrite `@pN` markers to `$1`, `$2`, ... in order of appearance.
///
/// A parameter referenced twice gets two markers. Named markers that are not
/// of the form `pN` are left in place.
pub fn to_numbered_parameters(sql: &str) -> NumberedSql {
    let mut out = String::with_capacity(sql.len());
    let mut order = Vec::new();
    for segment in parse_segments(sql) {
        match segment {
            Segment::Named(name) => match parameter_position(name) {
                Some(position) => {
                    order.push(position);
                    out.push_str(&format!("${}", order.len()));
                }
                None => {
                    out.push('@');
                    out.push_str(name);
                }
            },
            Segment::Positional => out.push('?'),
            Segment::Text(s) | Segment::Literal(s) | Segment::Comment(s) => out.push_str(s),
        }
    }
    NumberedSql { sql: out, order }
}

fn parameter_position(name: &str) -> Option<usize> {
    let digits = name.strip_prefix('p').or_else(|| name.strip_prefix('P'))?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

/// Whether the statement returns rows.
pub fn is_query(sql: &str) -> bool {
    let first_word = parse_segments(sql)
        .into_iter()
        .filter_map(|s| match s {
            Segment::Text(t) => Some(t),
            _ => None,
        })
        .flat_map(|t| t.split(|c: char| c.is_whitespace() || c == '('))
        .find(|w| !w.is_empty());
    match first_word {
        Some(w) => ["select", "with", "values", "show", "explain", "table"]
            .iter()
            .any(|k| w.eq_ignore_ascii_case(k)),
        None => false,
    }
}
