//! File access shared by the loader, the codecs and the writer front-end.

use std::path::Path;

use crate::format::{into_root, Codec};
use crate::node::Mapping;

use super::ConfigError;

/// Reads a whole file.
///
/// A missing file is reported as [`ConfigError::FileNotFound`] so callers can
/// treat it as optional.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.to_path_buf())
        } else {
            ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

pub(crate) fn write_file(path: &Path, contents: &[u8]) -> Result<(), ConfigError> {
    std::fs::write(path, contents).map_err(|source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a config file with `codec` and returns its root mapping.
pub(crate) fn load_file(path: &Path, codec: &dyn Codec) -> Result<Mapping, ConfigError> {
    let node = codec.parse_file(path)?;
    into_root(node).map_err(|e| e.in_file(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Format, JsonCodec};
    use crate::node::Node;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_file_valid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"key": "value"}}"#).unwrap();

        let map = load_file(file.path(), &JsonCodec).unwrap();

        assert_eq!(map.get("key"), Some(&Node::from("value")));
    }

    #[test]
    fn test_load_file_missing() {
        let result = load_file(Path::new("/nonexistent/path/config.json"), &JsonCodec);

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_file_parse_error_names_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{ not json").unwrap();

        let err = load_file(file.path(), Format::Json.codec()).unwrap_err();

        let location = err.location().unwrap();
        assert_eq!(location.path.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_load_file_rejects_scalar_root() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[1, 2, 3]").unwrap();

        let err = load_file(file.path(), &JsonCodec).unwrap_err();

        assert!(err.to_string().contains("found sequence"));
    }

    #[test]
    fn test_write_file_into_missing_directory() {
        let result = write_file(Path::new("/nonexistent/dir/out.json"), b"{}");

        assert!(matches!(result, Err(ConfigError::WriteError { .. })));
    }
}
