use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::{line_at, scalar_text, utf8, Codec};
use crate::config::ConfigError;
use crate::node::{Mapping, Node};

/// Key holding an element's attributes.
const ATTRIBUTES_KEY: &str = "@attributes";

/// Element wrapping the whole document on output.
const ROOT_ELEMENT: &str = "config";

/// XML documents via `quick-xml`.
///
/// The root element's name is ignored. Child elements become keys, repeated
/// siblings become a sequence, attributes land under `@attributes`, and text
/// leaves are strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn extensions(&self) -> &[&'static str] {
        &["xml"]
    }

    fn parse(&self, input: &[u8]) -> Result<Node, ConfigError> {
        parse_xml(utf8(input)?).map(Node::Mapping)
    }

    fn serialize(&self, root: &Mapping, pretty: bool) -> Result<Vec<u8>, ConfigError> {
        let mut writer = if pretty {
            Writer::new_with_indent(Vec::new(), b' ', 4)
        } else {
            Writer::new(Vec::new())
        };
        emit(&mut writer, Event::Decl(BytesDecl::new("1.0", None, None)))?;
        emit(&mut writer, Event::Start(BytesStart::new(ROOT_ELEMENT)))?;
        write_children(&mut writer, root)?;
        emit(&mut writer, Event::End(BytesEnd::new(ROOT_ELEMENT)))?;

        let mut bytes = writer.into_inner();
        if pretty {
            bytes.push(b'\n');
        }
        Ok(bytes)
    }
}

/// An element whose end tag has not been seen yet.
struct Element {
    name: String,
    attributes: Mapping,
    children: Mapping,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, ConfigError> {
        let mut attributes = Mapping::new();
        for attribute in start.attributes() {
            let attribute = attribute
                .map_err(|e| ConfigError::parse_from(format!("malformed attribute: {e}"), e))?;
            let value = attribute
                .unescape_value()
                .map_err(|e| ConfigError::parse_from(e.to_string(), e))?;
            attributes.insert(
                String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                Node::String(value.into_owned()),
            );
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            attributes,
            children: Mapping::new(),
            text: String::new(),
        })
    }

    fn add_child(&mut self, name: String, node: Node) {
        match self.children.get_mut(&name) {
            Some(Node::Sequence(items)) => items.push(node),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Node::Sequence(vec![first, node]);
            }
            None => {
                self.children.insert(name, node);
            }
        }
    }

    /// Text-only elements become strings; anything else becomes a mapping.
    fn finish(self) -> (String, Node) {
        if self.children.is_empty() && self.attributes.is_empty() {
            return (self.name, Node::String(self.text));
        }
        let mut map = Mapping::with_capacity(self.children.len() + 1);
        if !self.attributes.is_empty() {
            map.insert(ATTRIBUTES_KEY.to_owned(), Node::Mapping(self.attributes));
        }
        map.extend(self.children);
        (self.name, Node::Mapping(map))
    }
}

fn parse_xml(text: &str) -> Result<Mapping, ConfigError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                let offset = usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX);
                let code = match &e {
                    quick_xml::Error::Syntax(_) => "syntax",
                    quick_xml::Error::IllFormed(_) => "ill-formed",
                    _ => "xml",
                };
                return Err(ConfigError::parse_from(e.to_string(), e)
                    .at_line(line_at(text, offset))
                    .with_code(code));
            }
        };
        match event {
            Event::Start(start) => stack.push(Element::open(&start)?),
            Event::Empty(start) => {
                let element = Element::open(&start)?;
                close(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ConfigError::parse("unexpected closing tag"))?;
                close(element, &mut stack, &mut root)?;
            }
            Event::Text(content) => {
                if let Some(top) = stack.last_mut() {
                    let unescaped = content
                        .unescape()
                        .map_err(|e| ConfigError::parse_from(e.to_string(), e))?;
                    top.text.push_str(&unescaped);
                }
            }
            Event::CData(content) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&content));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ConfigError::parse(format!(
            "unexpected end of document, element <{}> is not closed",
            open.name
        )));
    }
    match root {
        Some(Node::Mapping(map)) => Ok(map),
        Some(_) => Ok(Mapping::new()),
        None => Err(ConfigError::parse("document has no root element")),
    }
}

fn close(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Node>,
) -> Result<(), ConfigError> {
    let (name, node) = element.finish();
    if let Some(parent) = stack.last_mut() {
        parent.add_child(name, node);
        return Ok(());
    }
    if root.is_some() {
        return Err(ConfigError::parse(format!(
            "unexpected element <{name}> after the root element"
        )));
    }
    *root = Some(node);
    Ok(())
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), ConfigError> {
    writer
        .write_event(event)
        .map_err(|e| ConfigError::serialize("xml", e))
}

fn write_children(writer: &mut Writer<Vec<u8>>, map: &Mapping) -> Result<(), ConfigError> {
    for (key, value) in map {
        if key != ATTRIBUTES_KEY {
            write_element(writer, key, value)?;
        }
    }
    Ok(())
}

/// Checks `name` against the XML `Name` production, minus namespace colons.
fn check_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c == '-' || c == '.' || c.is_alphanumeric());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::serialize(
            "xml",
            format!("'{name}' is not a valid element or attribute name"),
        ))
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, node: &Node) -> Result<(), ConfigError> {
    check_name(name)?;
    match node {
        Node::Sequence(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
        }
        Node::Mapping(map) => {
            let mut start = BytesStart::new(name);
            if let Some(Node::Mapping(attributes)) = map.get(ATTRIBUTES_KEY) {
                for (key, value) in attributes {
                    check_name(key)?;
                    if let Some(text) = scalar_text(value) {
                        start.push_attribute((key.as_str(), text.as_str()));
                    }
                }
            }
            emit(writer, Event::Start(start))?;
            write_children(writer, map)?;
            emit(writer, Event::End(BytesEnd::new(name)))?;
        }
        leaf => {
            let text = scalar_text(leaf).unwrap_or_default();
            if text.is_empty() {
                emit(writer, Event::Empty(BytesStart::new(name)))?;
            } else {
                emit(writer, Event::Start(BytesStart::new(name)))?;
                emit(writer, Event::Text(BytesText::new(&text)))?;
                emit(writer, Event::End(BytesEnd::new(name)))?;
            }
        }
    }
    Ok(())
}
