//! Tag array literals.
//!
//! A snippet's tags live in a single text column as a brace-delimited list of
//! double-quoted entries, e.g. `{"rust","say \"hi\""}`. Inside quotes `\` and
//! `"` are backslash-escaped. Readers also accept bare (unquoted) entries.

use std::{iter::Peekable, str::Chars};

pub const EMPTY: &str = "{}";

pub fn encode<S: AsRef<str>>(tags: &[S]) -> String {
    if tags.is_empty() {
        return EMPTY.to_owned();
    }

    let mut out = String::from("{");
    for (i, tag) in tags.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push('"');
        for c in tag.as_ref().chars() {
            if c == '\\' || c == '"' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
    }
    out.push('}');
    out
}

/// Malformed input decodes to an empty list.
pub fn decode(raw: &str) -> Vec<String> {
    try_decode(raw).unwrap_or_default()
}

/// `decode` for nullable columns.
pub fn decode_opt(raw: Option<&str>) -> Vec<String> {
    raw.map(decode).unwrap_or_default()
}

fn try_decode(raw: &str) -> Option<Vec<String>> {
    let inner = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    if inner.is_empty() {
        return Some(Vec::new());
    }

    let mut tags = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        let tag = if chars.peek() == Some(&'"') {
            chars.next();
            quoted(&mut chars)?
        } else {
            bare(&mut chars)
        };
        tags.push(tag);

        match chars.next() {
            Some(',') => continue,
            None => return Some(tags),
            Some(_) => return None,
        }
    }
}

fn quoted(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let mut tag = String::new();
    loop {
        match chars.next()? {
            '\\' => tag.push(chars.next()?),
            '"' => return Some(tag),
            c => tag.push(c),
        }
    }
}

fn bare(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut tag = String::new();
    while let Some(&c) = chars.peek() {
        if c == ',' {
            break;
        }
        tag.push(c);
        chars.next();
    }
    tag
}
