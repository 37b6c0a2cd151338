use super::{scalar_text, utf8, Codec};
use crate::config::ConfigError;
use crate::node::{child_mapping, Mapping, Node};

/// INI files with sections.
///
/// Dotted section and key names expand into nested mappings, `key[] = v`
/// appends to a sequence and `key[name] = v` sets a nested entry. Values are
/// always strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct IniCodec;

impl Codec for IniCodec {
    fn extensions(&self) -> &[&'static str] {
        &["ini"]
    }

    fn parse(&self, input: &[u8]) -> Result<Node, ConfigError> {
        parse_ini(utf8(input)?).map(Node::Mapping)
    }

    fn serialize(&self, root: &Mapping, _pretty: bool) -> Result<Vec<u8>, ConfigError> {
        let mut out = String::new();
        write_entries(&mut out, root)?;
        write_sections(&mut out, root, &mut Vec::new())?;
        Ok(out.into_bytes())
    }
}

fn parse_ini(text: &str) -> Result<Mapping, ConfigError> {
    let mut root = Mapping::new();
    let mut section: Vec<String> = Vec::new();
    let mut parsed_any = false;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
            continue;
        }

        if let Some(header) = line.strip_prefix('[') {
            let name = header
                .split_once(']')
                .map(|(name, _)| name)
                .ok_or_else(|| {
                    ConfigError::parse("syntax error, unexpected end of line, expecting ']'")
                        .at_line(line_no)
                        .with_code("syntax")
                })?;
            section = split_path(name);
            ensure_mapping(&mut root, &section);
            parsed_any = true;
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| {
            ConfigError::parse(format!("syntax error, expected '=' after '{line}'"))
                .at_line(line_no)
                .with_code("syntax")
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::parse("syntax error, missing key before '='").at_line(line_no));
        }
        let value = parse_value(value.trim()).map_err(|e| e.at_line(line_no))?;

        let mut path = section.clone();
        let mut append = false;
        match key.split_once('[') {
            Some((base, rest)) if rest.ends_with(']') => {
                path.extend(split_path(base));
                let inner = rest[..rest.len() - 1].trim();
                if inner.is_empty() {
                    append = true;
                } else {
                    path.push(inner.to_owned());
                }
            }
            _ => path.extend(split_path(key)),
        }
        insert_at(&mut root, &path, Node::String(value), append);
        parsed_any = true;
    }

    if !parsed_any {
        return Err(ConfigError::parse("No parsable content in data."));
    }
    Ok(root)
}

fn split_path(name: &str) -> Vec<String> {
    name.split('.').map(|part| part.trim().to_owned()).collect()
}

/// Strips quotes from a quoted value, or an inline `;` comment from a bare one.
fn parse_value(raw: &str) -> Result<String, ConfigError> {
    for quote in ['"', '\''] {
        if let Some(rest) = raw.strip_prefix(quote) {
            return rest
                .split_once(quote)
                .map(|(inner, _)| inner.to_owned())
                .ok_or_else(|| ConfigError::parse("syntax error, unterminated quoted string"));
        }
    }
    let bare = raw.split_once(';').map_or(raw, |(value, _)| value);
    Ok(bare.trim_end().to_owned())
}

fn ensure_mapping(root: &mut Mapping, path: &[String]) {
    let mut current = root;
    for segment in path {
        current = child_mapping(current, segment);
    }
}

fn insert_at(root: &mut Mapping, path: &[String], value: Node, append: bool) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        current = child_mapping(current, segment);
    }
    if !append {
        current.insert(last.clone(), value);
        return;
    }
    match current.get_mut(last) {
        Some(Node::Sequence(items)) => items.push(value),
        _ => {
            current.insert(last.clone(), Node::Sequence(vec![value]));
        }
    }
}

fn write_entries(out: &mut String, map: &Mapping) -> Result<(), ConfigError> {
    for (key, value) in map {
        match value {
            Node::Mapping(_) => {}
            Node::Sequence(items) => {
                for item in items {
                    let text = scalar_text(item).ok_or_else(|| {
                        ConfigError::serialize(
                            "ini",
                            format!("sequence '{key}' holds a {}, only scalars can be listed", item.kind()),
                        )
                    })?;
                    out.push_str(&format!("{key}[]={}\n", quote(key, &text)?));
                }
            }
            leaf => {
                let text = scalar_text(leaf).unwrap_or_default();
                out.push_str(&format!("{key}={}\n", quote(key, &text)?));
            }
        }
    }
    Ok(())
}

fn write_sections(
    out: &mut String,
    map: &Mapping,
    path: &mut Vec<String>,
) -> Result<(), ConfigError> {
    for (key, value) in map {
        if let Node::Mapping(child) = value {
            path.push(key.clone());
            out.push_str(&format!("[{}]\n", path.join(".")));
            write_entries(out, child)?;
            write_sections(out, child, path)?;
            path.pop();
        }
    }
    Ok(())
}

/// Renders a value so the parser reads back exactly `text`.
///
/// Quoted values end at the first matching quote, so a value holding both
/// quote characters and needing quotes has no representation.
fn quote(key: &str, text: &str) -> Result<String, ConfigError> {
    if text.contains(['\n', '\r']) {
        return Err(ConfigError::serialize(
            "ini",
            format!("value of '{key}' spans several lines"),
        ));
    }
    let needs_quotes = text.is_empty()
        || text.contains(';')
        || text.starts_with(['"', '\''])
        || text.trim() != text;
    if !needs_quotes {
        return Ok(text.to_owned());
    }
    ['"', '\'']
        .into_iter()
        .find(|q| !text.contains(*q))
        .map(|q| format!("{q}{text}{q}"))
        .ok_or_else(|| {
            ConfigError::serialize(
                "ini",
                format!("value of '{key}' cannot be quoted, it holds both quote characters"),
            )
        })
}
