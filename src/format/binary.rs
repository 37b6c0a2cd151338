use serde::{Deserialize, Serialize};

use super::Codec;
use crate::config::ConfigError;
use crate::node::{Mapping, Node};

/// Compact binary snapshots of a tree, encoded with `bincode`.
///
/// Unlike the text formats this keeps every variant, so decoding an encoded
/// tree gives back exactly the same tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryCodec;

/// Wire form of [`Node`]; bincode needs an explicitly tagged layout.
#[derive(Debug, Serialize, Deserialize)]
enum Packed {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Packed>),
    Mapping(Vec<(String, Packed)>),
}

impl From<&Node> for Packed {
    fn from(node: &Node) -> Self {
        match node {
            Node::Null => Packed::Null,
            Node::Bool(b) => Packed::Bool(*b),
            Node::Integer(i) => Packed::Integer(*i),
            Node::Float(f) => Packed::Float(*f),
            Node::String(s) => Packed::String(s.clone()),
            Node::Sequence(items) => Packed::Sequence(items.iter().map(Packed::from).collect()),
            Node::Mapping(map) => Packed::from(map),
        }
    }
}

impl From<&Mapping> for Packed {
    fn from(map: &Mapping) -> Self {
        Packed::Mapping(
            map.iter()
                .map(|(key, value)| (key.clone(), Packed::from(value)))
                .collect(),
        )
    }
}

impl From<Packed> for Node {
    fn from(packed: Packed) -> Self {
        match packed {
            Packed::Null => Node::Null,
            Packed::Bool(b) => Node::Bool(b),
            Packed::Integer(i) => Node::Integer(i),
            Packed::Float(f) => Node::Float(f),
            Packed::String(s) => Node::String(s),
            Packed::Sequence(items) => Node::Sequence(items.into_iter().map(Node::from).collect()),
            Packed::Mapping(entries) => Node::Mapping(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, Node::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Codec for BinaryCodec {
    fn extensions(&self) -> &[&'static str] {
        &["serialize", "txt"]
    }

    fn parse(&self, input: &[u8]) -> Result<Node, ConfigError> {
        bincode::deserialize::<Packed>(input)
            .map(Node::from)
            .map_err(|e| ConfigError::parse_from(e.to_string(), e))
    }

    fn serialize(&self, root: &Mapping, _pretty: bool) -> Result<Vec<u8>, ConfigError> {
        bincode::serialize(&Packed::from(root)).map_err(|e| ConfigError::serialize(self.name(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_round_trip_keeps_every_variant() {
        let node = Node::from(json!({
            "null": null,
            "flag": true,
            "count": -7,
            "ratio": 2.5,
            "name": "svc",
            "list": [1, "two", [3]],
            "nested": {"deep": {"er": "value"}}
        }));
        let Node::Mapping(root) = node.clone() else {
            unreachable!()
        };
        let bytes = BinaryCodec.serialize(&root, false).unwrap();
        assert_eq!(BinaryCodec.parse(&bytes).unwrap(), node);
    }

    #[test]
    fn test_preserves_key_order() {
        let root: Mapping = ["z", "a", "m"]
            .into_iter()
            .map(|key| (key.to_owned(), Node::Null))
            .collect();
        let bytes = BinaryCodec.serialize(&root, false).unwrap();
        let parsed = BinaryCodec.parse(&bytes).unwrap();
        let keys: Vec<&String> = parsed.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, ["z", "a", "m"]);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = BinaryCodec.parse(b"\xff\xff\xff").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
