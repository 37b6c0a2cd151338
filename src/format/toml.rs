use toml::Value;

use super::{line_at, utf8, Codec};
use crate::config::ConfigError;
use crate::node::{Mapping, Node};

/// TOML documents via the `toml` crate.
///
/// Datetimes are read as strings. TOML has no null, so trees holding null
/// values cannot be serialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn extensions(&self) -> &[&'static str] {
        &["toml"]
    }

    fn parse(&self, input: &[u8]) -> Result<Node, ConfigError> {
        let text = utf8(input)?;
        let table: toml::Table = toml::from_str(text).map_err(|e| {
            let line = e.span().map(|span| line_at(text, span.start));
            let err = ConfigError::parse_from(e.message().to_owned(), e);
            match line {
                Some(line) => err.at_line(line),
                None => err,
            }
        })?;
        Ok(from_table(table))
    }

    fn serialize(&self, root: &Mapping, pretty: bool) -> Result<Vec<u8>, ConfigError> {
        let encoded = if pretty {
            toml::to_string_pretty(root)
        } else {
            toml::to_string(root)
        };
        encoded
            .map(String::into_bytes)
            .map_err(|e| ConfigError::serialize(self.name(), e))
    }
}

fn from_table(table: toml::Table) -> Node {
    Node::Mapping(
        table
            .into_iter()
            .map(|(key, value)| (key, from_toml(value)))
            .collect(),
    )
}

fn from_toml(value: Value) -> Node {
    match value {
        Value::String(s) => Node::String(s),
        Value::Integer(i) => Node::Integer(i),
        Value::Float(f) => Node::Float(f),
        Value::Boolean(b) => Node::Bool(b),
        Value::Datetime(dt) => Node::String(dt.to_string()),
        Value::Array(items) => Node::Sequence(items.into_iter().map(from_toml).collect()),
        Value::Table(table) => from_table(table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tables() {
        let node = TomlCodec
            .parse_str(
                r#"
                name = "svc"

                [server]
                host = "localhost"
                port = 8080
                "#,
            )
            .unwrap();
        assert_eq!(
            node,
            Node::from(json!({"name": "svc", "server": {"host": "localhost", "port": 8080}}))
        );
    }

    #[test]
    fn test_datetime_becomes_string() {
        let node = TomlCodec.parse_str("at = 1979-05-27T07:32:00Z\n").unwrap();
        assert_eq!(
            node.as_mapping().unwrap().get("at"),
            Some(&Node::from("1979-05-27T07:32:00Z"))
        );
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = TomlCodec.parse_str("a = 1\nb = @\n").unwrap_err();
        assert_eq!(err.location().and_then(|l| l.line), Some(2));
    }

    #[test]
    fn test_null_cannot_be_serialized() {
        let root: Mapping = [("gone".to_owned(), Node::Null)].into_iter().collect();
        assert!(matches!(
            TomlCodec.serialize(&root, true),
            Err(ConfigError::Serialize { .. })
        ));
    }

    #[test]
    fn test_round_trip() {
        let node = Node::from(json!({
            "title": "demo",
            "limits": {"max": 10, "ratio": 0.5},
            "hosts": ["a", "b"]
        }));
        let Node::Mapping(root) = node.clone() else {
            unreachable!()
        };
        let bytes = TomlCodec.serialize(&root, true).unwrap();
        assert_eq!(TomlCodec.parse(&bytes).unwrap(), node);
    }
}
