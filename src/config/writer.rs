//! Serializing a store back out through a codec.

use std::path::Path;

use tracing::debug;

use crate::format::{extension_of, Codec, Format};

use super::store::Config;
use super::ConfigError;

impl Config {
    /// Serializes the tree with `codec`.
    pub fn write_bytes(&self, codec: &dyn Codec, pretty: bool) -> Result<Vec<u8>, ConfigError> {
        codec.serialize(self.all(), pretty)
    }

    /// Serializes the tree with `codec` as text.
    ///
    /// Fails with [`ConfigError::Serialize`] when the codec's output is not
    /// UTF-8, as with the binary format.
    pub fn write_string(&self, codec: &dyn Codec, pretty: bool) -> Result<String, ConfigError> {
        let bytes = self.write_bytes(codec, pretty)?;
        String::from_utf8(bytes).map_err(|e| ConfigError::serialize(codec.name(), e))
    }

    /// Writes the tree to `path` in the format named by its extension.
    ///
    /// A trailing `.dist` is skipped, so `app.json.dist` is written as JSON.
    /// Returns the bytes written.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, ConfigError> {
        let path = path.as_ref();
        let extension = extension_of(path);
        let format = Format::from_extension(&extension)
            .ok_or(ConfigError::UnsupportedFormat(extension))?;
        self.to_file_with(path, format.codec())
    }

    /// Writes the tree to `path` with `codec`, whatever the extension.
    pub fn to_file_with(
        &self,
        path: impl AsRef<Path>,
        codec: &dyn Codec,
    ) -> Result<Vec<u8>, ConfigError> {
        let path = path.as_ref();
        let bytes = codec.write_file(self.all(), path)?;
        debug!(path = %path.display(), codec = codec.name(), bytes = bytes.len(), "wrote config file");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{BinaryCodec, JsonCodec, YamlCodec};
    use crate::node::Node;
    use std::fs;

    fn sample() -> Config {
        Config::parse(
            r#"{"name": "dragon", "server": {"port": 8080}, "offset": -1}"#,
            &JsonCodec,
        )
        .unwrap()
    }

    #[test]
    fn test_write_string_round_trips() {
        let config = sample();

        let yaml = config.write_string(&YamlCodec, true).unwrap();
        let reparsed = Config::parse(&yaml, &YamlCodec).unwrap();

        assert_eq!(reparsed.all(), config.all());
    }

    #[test]
    fn test_write_string_rejects_binary_output() {
        let err = sample().write_string(&BinaryCodec, false).unwrap_err();

        assert!(matches!(err, ConfigError::Serialize { .. }));
    }

    #[test]
    fn test_to_file_detects_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json.dist");

        let written = sample().to_file(&path).unwrap();

        assert_eq!(fs::read(&path).unwrap(), written);
        let mut reloaded = Config::builder().with_file(&path, true).build().unwrap();
        assert_eq!(reloaded.get_or("server.port", 0), Node::Integer(8080));
    }

    #[test]
    fn test_to_file_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.camoo");

        let err = sample().to_file(&path).unwrap_err();

        assert!(matches!(err, ConfigError::UnsupportedFormat(ref ext) if ext == "camoo"));
        assert!(!path.exists());
    }

    #[test]
    fn test_to_file_with_overrides_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.conf");

        sample().to_file_with(&path, &BinaryCodec).unwrap();

        let reloaded = Config::builder()
            .with_file(&path, true)
            .with_codec(BinaryCodec)
            .build()
            .unwrap();
        assert_eq!(reloaded.all(), sample().all());
    }

    #[test]
    fn test_failed_write_leaves_data_intact() {
        let mut config = sample();

        let err = config.to_file("/nonexistent/dir/out.json").unwrap_err();

        assert!(matches!(err, ConfigError::WriteError { .. }));
        assert_eq!(config.get_or("name", ""), Node::from("dragon"));
    }
}
