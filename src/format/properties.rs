use super::{scalar_text, utf8, Codec};
use crate::config::ConfigError;
use crate::node::{Mapping, Node};

/// Java `.properties` files: a flat mapping of string keys to string values.
///
/// Dotted keys are kept verbatim rather than expanded into nested mappings.
/// Only top-level scalars are written; nested values have no representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesCodec;

impl Codec for PropertiesCodec {
    fn extensions(&self) -> &[&'static str] {
        &["properties"]
    }

    fn parse(&self, input: &[u8]) -> Result<Node, ConfigError> {
        parse_properties(utf8(input)?).map(Node::Mapping)
    }

    fn serialize(&self, root: &Mapping, _pretty: bool) -> Result<Vec<u8>, ConfigError> {
        let mut out = String::new();
        for (key, value) in root {
            let Some(text) = scalar_text(value) else {
                continue;
            };
            out.push_str(&escape_key(key));
            out.push_str(" = ");
            out.push_str(&escape_value(&text));
            out.push('\n');
        }
        Ok(out.into_bytes())
    }
}

fn parse_properties(text: &str) -> Result<Mapping, ConfigError> {
    let mut map = Mapping::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line = raw.trim_start_matches(is_blank);
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut logical = line.to_owned();
        while continues(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let key = unescape(key).map_err(|e| e.at_line(index + 1))?;
        let value = unescape(value).map_err(|e| e.at_line(index + 1))?;
        map.insert(key, Node::String(value));
    }

    Ok(map)
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

/// A line continues when it ends in an odd number of backslashes.
fn continues(line: &str) -> bool {
    line.bytes().rev().take_while(|b| *b == b'\\').count() % 2 == 1
}

/// Splits a logical line at the first unescaped `=`, `:` or blank.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                break;
            }
            c if is_blank(c) => {
                key_end = i;
                break;
            }
            _ => {}
        }
    }

    let rest = line[key_end..].trim_start_matches(is_blank);
    let rest = rest
        .strip_prefix(|c: char| c == '=' || c == ':')
        .unwrap_or(rest)
        .trim_start_matches(is_blank);
    (&line[..key_end], rest)
}

fn unescape(raw: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| ConfigError::parse(format!("malformed \\u{hex} escape")))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

/// A leading `#` or `!` is escaped too, or the line would read as a comment.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for (i, c) in key.chars().enumerate() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0c' => out.push_str("\\f"),
            '#' | '!' if i == 0 => {
                out.push('\\');
                out.push(c);
            }
            ' ' | ':' | '=' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0c' => out.push_str("\\f"),
            ' ' if i == 0 => out.push_str("\\ "),
            c => out.push(c),
        }
    }
    out
}
