//! Format detection and the codecs that turn bytes into [`Node`] trees.
//!
//! A [`Format`] names one of the built-in formats and hands out its codec.
//! A [`FormatRegistry`] picks a codec for a file from its extension, after
//! stripping a trailing `.dist` marker (`app.yaml.dist` is read as YAML).

mod binary;
mod ini;
mod json;
mod properties;
mod toml;
mod xml;
mod yaml;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::{read_file, write_file, ConfigError};
use crate::node::{Mapping, Node};

pub use self::binary::BinaryCodec;
pub use self::ini::IniCodec;
pub use self::json::JsonCodec;
pub use self::properties::PropertiesCodec;
pub use self::toml::TomlCodec;
pub use self::xml::XmlCodec;
pub use self::yaml::YamlCodec;

/// Filename suffix marking a distributable template, skipped during detection.
const DIST_EXTENSION: &str = "dist";

/// Converts raw bytes to a configuration tree and back.
///
/// Implementations declare which extensions they handle; the registry never
/// looks at file contents to decide.
pub trait Codec: Send + Sync + fmt::Debug {
    /// Lowercase extensions (without the dot) this codec accepts.
    fn extensions(&self) -> &[&'static str];

    fn parse(&self, input: &[u8]) -> Result<Node, ConfigError>;

    fn serialize(&self, root: &Mapping, pretty: bool) -> Result<Vec<u8>, ConfigError>;

    /// Name used in error messages.
    fn name(&self) -> &str {
        self.extensions().first().copied().unwrap_or("custom")
    }

    fn parse_str(&self, input: &str) -> Result<Node, ConfigError> {
        self.parse(input.as_bytes())
    }

    fn parse_file(&self, path: &Path) -> Result<Node, ConfigError> {
        let bytes = read_file(path)?;
        self.parse(&bytes).map_err(|e| e.in_file(path))
    }

    /// Serializes `root` into `path`, returning the bytes written.
    fn write_file(&self, root: &Mapping, path: &Path) -> Result<Vec<u8>, ConfigError> {
        let bytes = self.serialize(root, true)?;
        write_file(path, &bytes)?;
        Ok(bytes)
    }
}

/// The built-in formats, one per recognised extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    Ini,
    Json,
    Xml,
    Yaml,
    Yml,
    Properties,
    Toml,
    Serialize,
    Txt,
}

impl Format {
    pub const ALL: [Format; 9] = [
        Format::Ini,
        Format::Json,
        Format::Xml,
        Format::Yaml,
        Format::Yml,
        Format::Properties,
        Format::Toml,
        Format::Serialize,
        Format::Txt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Format::Ini => "ini",
            Format::Json => "json",
            Format::Xml => "xml",
            Format::Yaml => "yaml",
            Format::Yml => "yml",
            Format::Properties => "properties",
            Format::Toml => "toml",
            Format::Serialize => "serialize",
            Format::Txt => "txt",
        }
    }

    /// Returns the shared codec instance for this format.
    pub fn codec(self) -> &'static dyn Codec {
        match self {
            Format::Ini => &IniCodec,
            Format::Json => &JsonCodec,
            Format::Xml => &XmlCodec,
            Format::Yaml | Format::Yml => &YamlCodec,
            Format::Properties => &PropertiesCodec,
            Format::Toml => &TomlCodec,
            Format::Serialize | Format::Txt => &BinaryCodec,
        }
    }

    /// Finds the format named by `extension`, ignoring ASCII case.
    ///
    /// The format's codec must also list the extension as supported.
    pub fn from_extension(extension: &str) -> Option<Format> {
        Format::ALL.into_iter().find(|format| {
            extension.eq_ignore_ascii_case(format.as_str())
                && format.codec().extensions().contains(&format.as_str())
        })
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::from_extension(s).ok_or_else(|| ConfigError::UnsupportedFormat(s.to_owned()))
    }
}

/// Derives the format-detection extension of `path`.
///
/// This is the text after the last `.` of the file name, unless that text is
/// `dist`, in which case the segment before it is used instead. A name with no
/// dot yields the whole name.
pub fn extension_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    let mut parts = name.rsplit('.');
    let extension = parts.next().unwrap_or_default();
    if extension.eq_ignore_ascii_case(DIST_EXTENSION) {
        if let Some(previous) = parts.next() {
            return previous.to_owned();
        }
    }
    extension.to_owned()
}

/// A codec owned by a registry or builder.
#[derive(Debug)]
pub(crate) enum CodecHandle {
    Builtin(&'static dyn Codec),
    Custom(Box<dyn Codec>),
}

impl CodecHandle {
    pub(crate) fn get(&self) -> &dyn Codec {
        match self {
            CodecHandle::Builtin(codec) => *codec,
            CodecHandle::Custom(codec) => codec.as_ref(),
        }
    }
}

/// An ordered set of codecs searched by extension.
///
/// Lookups return the first registered codec that lists the extension, so
/// codecs registered later never shadow earlier ones.
#[derive(Debug)]
pub struct FormatRegistry {
    codecs: Vec<CodecHandle>,
}

impl FormatRegistry {
    /// Creates a registry with no codecs.
    pub fn new() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Creates a registry holding every built-in codec.
    pub fn builtin() -> Self {
        let codecs = [
            Format::Ini,
            Format::Json,
            Format::Xml,
            Format::Yaml,
            Format::Properties,
            Format::Toml,
            Format::Serialize,
        ]
        .into_iter()
        .map(|format| CodecHandle::Builtin(format.codec()))
        .collect();
        Self { codecs }
    }

    /// Appends a codec to the search order.
    pub fn register(&mut self, codec: impl Codec + 'static) -> &mut Self {
        self.codecs.push(CodecHandle::Custom(Box::new(codec)));
        self
    }

    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.register(codec);
        self
    }

    /// Finds the codec for `extension`, ignoring ASCII case.
    pub fn lookup(&self, extension: &str) -> Result<&dyn Codec, ConfigError> {
        self.codecs
            .iter()
            .map(CodecHandle::get)
            .find(|codec| {
                codec
                    .extensions()
                    .iter()
                    .any(|supported| supported.eq_ignore_ascii_case(extension))
            })
            .ok_or_else(|| ConfigError::UnsupportedFormat(extension.to_owned()))
    }

    /// Finds the codec for a file, see [`extension_of`].
    pub fn codec_for_path(&self, path: &Path) -> Result<&dyn Codec, ConfigError> {
        self.lookup(&extension_of(path))
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Unwraps a parsed document into its root mapping.
///
/// Empty documents parse to null and become an empty mapping.
pub(crate) fn into_root(node: Node) -> Result<Mapping, ConfigError> {
    match node {
        Node::Mapping(map) => Ok(map),
        Node::Null => Ok(Mapping::new()),
        other => Err(ConfigError::parse(format!(
            "expected a mapping at the document root, found {}",
            other.kind()
        ))),
    }
}

/// Renders a leaf for the line-oriented formats; containers have no text form.
pub(crate) fn scalar_text(node: &Node) -> Option<String> {
    match node {
        Node::Null => Some(String::new()),
        Node::Bool(b) => Some(b.to_string()),
        Node::Integer(i) => Some(i.to_string()),
        Node::Float(f) => Some(f.to_string()),
        Node::String(s) => Some(s.clone()),
        Node::Sequence(_) | Node::Mapping(_) => None,
    }
}

pub(crate) fn utf8(input: &[u8]) -> Result<&str, ConfigError> {
    std::str::from_utf8(input).map_err(|e| ConfigError::parse_from("input is not valid UTF-8", e))
}

/// 1-based line number of a byte offset.
pub(crate) fn line_at(text: &str, offset: usize) -> usize {
    let end = offset.min(text.len());
    text.as_bytes()[..end].iter().filter(|b| **b == b'\n').count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct UpperCodec;

    impl Codec for UpperCodec {
        fn extensions(&self) -> &[&'static str] {
            &["upper", "json"]
        }

        fn parse(&self, _input: &[u8]) -> Result<Node, ConfigError> {
            Ok(Node::Null)
        }

        fn serialize(&self, _root: &Mapping, _pretty: bool) -> Result<Vec<u8>, ConfigError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_extension_of_plain_file() {
        assert_eq!(extension_of(Path::new("conf/app.json")), "json");
    }

    #[test]
    fn test_extension_of_strips_dist() {
        assert_eq!(extension_of(Path::new("config.yaml.dist")), "yaml");
        assert_eq!(extension_of(Path::new("/etc/app/config.json.dist")), "json");
    }

    #[test]
    fn test_extension_of_name_without_dot() {
        assert_eq!(extension_of(Path::new("ladadeedee")), "ladadeedee");
    }

    #[test]
    fn test_lookup_dist_file_selects_yaml_codec() {
        let registry = FormatRegistry::builtin();
        let codec = registry.codec_for_path(Path::new("config.yaml.dist")).unwrap();
        assert_eq!(codec.name(), "yaml");
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FormatRegistry::builtin();
        assert_eq!(registry.lookup("JSON").unwrap().name(), "json");
        assert_eq!(registry.lookup("Yml").unwrap().name(), "yaml");
    }

    #[test]
    fn test_lookup_unsupported_names_extension() {
        let registry = FormatRegistry::builtin();
        let err = registry.codec_for_path(Path::new("error.lib")).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "lib"));
    }

    #[test]
    fn test_first_registered_codec_wins() {
        let registry = FormatRegistry::builtin().with_codec(UpperCodec);
        assert_eq!(registry.lookup("json").unwrap().name(), "json");
        assert_eq!(registry.lookup("upper").unwrap().name(), "upper");
    }

    #[test]
    fn test_empty_registry_supports_nothing() {
        let registry = FormatRegistry::new();
        assert!(matches!(
            registry.lookup("json"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(Format::from_extension("YML"), Some(Format::Yml));
        assert_eq!(Format::from_extension("txt"), Some(Format::Txt));
        assert_eq!(Format::from_extension("camoo"), None);
        assert_eq!("toml".parse::<Format>().unwrap(), Format::Toml);
    }

    #[test]
    fn test_every_format_is_supported_by_its_codec() {
        for format in Format::ALL {
            assert!(format.codec().extensions().contains(&format.as_str()));
        }
    }

    #[test]
    fn test_into_root_rejects_scalars() {
        assert!(into_root(Node::Null).unwrap().is_empty());
        assert!(matches!(
            into_root(Node::Integer(3)),
            Err(ConfigError::Parse { .. })
        ));
    }
}
