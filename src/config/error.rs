use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Where in the input a parse failure happened, when the codec can tell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub path: Option<PathBuf>,
    pub line: Option<usize>,
    /// Short error class reported by the format library, such as `syntax`.
    pub code: Option<&'static str>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, " in '{}'", path.display())?;
        }
        if let Some(line) = self.line {
            write!(f, " on line {line}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("configuration file: [{0}] cannot be found")]
    FileNotFound(PathBuf),

    #[error("no loadable configuration files found in {0}")]
    EmptyDirectory(String),

    #[error("unsupported configuration format: .{0}")]
    UnsupportedFormat(String),

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse configuration{location}: {message}")]
    Parse {
        message: String,
        location: Location,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("failed to serialize configuration as {format}: {message}")]
    Serialize { format: String, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to deserialize config: {0}")]
    DeserializeError(#[from] serde_json::Error),
}

impl ConfigError {
    /// A parse failure with no underlying library error.
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        ConfigError::Parse {
            message: message.into(),
            location: Location::default(),
            source: None,
        }
    }

    /// A parse failure reported by a format library.
    pub(crate) fn parse_from<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::Parse {
            message: message.into(),
            location: Location::default(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn serialize(format: impl Into<String>, message: impl fmt::Display) -> Self {
        ConfigError::Serialize {
            format: format.into(),
            message: message.to_string(),
        }
    }

    /// Attaches a line number to a parse failure; other errors pass through.
    pub(crate) fn at_line(mut self, line: usize) -> Self {
        if let ConfigError::Parse { location, .. } = &mut self {
            location.line = Some(line);
        }
        self
    }

    /// Attaches an error class to a parse failure; other errors pass through.
    pub(crate) fn with_code(mut self, code: &'static str) -> Self {
        if let ConfigError::Parse { location, .. } = &mut self {
            location.code = Some(code);
        }
        self
    }

    /// Attaches the offending file to a parse failure; other errors pass through.
    pub(crate) fn in_file(mut self, path: &Path) -> Self {
        if let ConfigError::Parse { location, .. } = &mut self {
            location.path = Some(path.to_path_buf());
        }
        self
    }

    /// Returns the parse location, if this is a parse failure.
    pub fn location(&self) -> Option<&Location> {
        match self {
            ConfigError::Parse { location, .. } => Some(location),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_includes_location() {
        let err = ConfigError::parse("unexpected token")
            .at_line(3)
            .in_file(Path::new("app.ini"));
        assert_eq!(
            err.to_string(),
            "failed to parse configuration in 'app.ini' on line 3: unexpected token"
        );
    }

    #[test]
    fn test_code_kept_out_of_message() {
        let err = ConfigError::parse("bad tag").with_code("syntax").at_line(2);
        assert_eq!(err.location().and_then(|l| l.code), Some("syntax"));
        assert_eq!(
            err.to_string(),
            "failed to parse configuration on line 2: bad tag"
        );
    }

    #[test]
    fn test_location_ignored_for_other_errors() {
        let err = ConfigError::UnsupportedFormat("lib".into()).at_line(1);
        assert!(err.location().is_none());
        assert_eq!(err.to_string(), "unsupported configuration format: .lib");
    }

    #[test]
    fn test_file_not_found_message() {
        let err = ConfigError::FileNotFound(PathBuf::from("ladadeedee"));
        assert_eq!(
            err.to_string(),
            "configuration file: [ladadeedee] cannot be found"
        );
    }
}
