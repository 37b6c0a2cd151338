use serde_yaml::Value;

use super::Codec;
use crate::config::ConfigError;
use crate::node::{Mapping, Node};

/// YAML documents via `serde_yaml`.
///
/// Tags are dropped and non-string scalar keys are stringified.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn extensions(&self) -> &[&'static str] {
        &["yaml", "yml"]
    }

    fn parse(&self, input: &[u8]) -> Result<Node, ConfigError> {
        if input.iter().all(u8::is_ascii_whitespace) {
            return Ok(Node::Null);
        }
        let value: Value = serde_yaml::from_slice(input).map_err(|e| {
            let line = e.location().map(|location| location.line());
            let err = ConfigError::parse_from(e.to_string(), e);
            match line {
                Some(line) => err.at_line(line),
                None => err,
            }
        })?;
        Ok(from_yaml(value))
    }

    fn serialize(&self, root: &Mapping, _pretty: bool) -> Result<Vec<u8>, ConfigError> {
        serde_yaml::to_string(root)
            .map(String::into_bytes)
            .map_err(|e| ConfigError::serialize(self.name(), e))
    }
}

fn from_yaml(value: Value) -> Node {
    match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Bool(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Node::Integer(i),
            None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Node::String(s),
        Value::Sequence(items) => Node::Sequence(items.into_iter().map(from_yaml).collect()),
        Value::Mapping(map) => Node::Mapping(
            map.into_iter()
                .map(|(key, value)| (key_text(key), from_yaml(value)))
                .collect(),
        ),
        Value::Tagged(tagged) => from_yaml(tagged.value),
    }
}

fn key_text(key: Value) -> String {
    match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(&other)
            .map(|text| text.trim_end().to_owned())
            .unwrap_or_default(),
    }
}
