use std::path::Path;

use serde_json::error::Category;

use super::Codec;
use crate::config::{write_file, ConfigError};
use crate::node::{Mapping, Node};

/// JSON documents via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn parse(&self, input: &[u8]) -> Result<Node, ConfigError> {
        serde_json::from_slice(input).map_err(|e| {
            let line = e.line();
            let code = match e.classify() {
                Category::Io => "io",
                Category::Syntax => "syntax",
                Category::Data => "data",
                Category::Eof => "eof",
            };
            ConfigError::parse_from(e.to_string(), e)
                .at_line(line)
                .with_code(code)
        })
    }

    fn serialize(&self, root: &Mapping, pretty: bool) -> Result<Vec<u8>, ConfigError> {
        let encoded = if pretty {
            serde_json::to_vec_pretty(root)
        } else {
            serde_json::to_vec(root)
        };
        encoded.map_err(|e| ConfigError::serialize(self.name(), e))
    }

    /// Files get a trailing newline; [`Codec::serialize`] output does not.
    fn write_file(&self, root: &Mapping, path: &Path) -> Result<Vec<u8>, ConfigError> {
        let mut bytes = self.serialize(root, true)?;
        bytes.push(b'\n');
        write_file(path, &bytes)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_nested_document() {
        let node = JsonCodec
            .parse_str(r#"{"host": "localhost", "db": {"port": 5432, "ssl": true}}"#)
            .unwrap();
        assert_eq!(
            node,
            Node::from(json!({"host": "localhost", "db": {"port": 5432, "ssl": true}}))
        );
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = JsonCodec.parse_str("{\n  \"host\": \n}").unwrap_err();
        assert_eq!(err.location().and_then(|l| l.line), Some(3));
        assert_eq!(err.location().and_then(|l| l.code), Some("syntax"));
    }

    #[test]
    fn test_compact_and_pretty_output() {
        let root: Mapping = [("foo".to_owned(), Node::from("bar"))].into_iter().collect();
        let compact = JsonCodec.serialize(&root, false).unwrap();
        assert_eq!(compact, br#"{"foo":"bar"}"#);
        let pretty = String::from_utf8(JsonCodec.serialize(&root, true).unwrap()).unwrap();
        assert!(pretty.contains('\n'));
    }

    #[test]
    fn test_round_trip() {
        let node = Node::from(json!({
            "name": "svc",
            "ratio": 0.25,
            "tags": ["a", "b"],
            "nested": {"empty": null, "on": false}
        }));
        let Node::Mapping(root) = node.clone() else {
            unreachable!()
        };
        let bytes = JsonCodec.serialize(&root, true).unwrap();
        assert_eq!(JsonCodec.parse(&bytes).unwrap(), node);
    }

    #[test]
    fn test_write_file_appends_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let root: Mapping = [("a".to_owned(), Node::from(1))].into_iter().collect();
        JsonCodec.write_file(&root, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.ends_with("}\n"));
    }
}
