//! Path lists and their resolution into concrete files.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::ConfigError;

/// Prefix marking a path that may be missing.
const OPTIONAL_MARKER: char = '?';

/// One or more paths to load configuration from.
///
/// A path may name a file or a directory; directories expand to the files
/// directly inside them. Strings prefixed with `?` are optional and skipped
/// when missing:
///
/// ```
/// use dragon_cfg::PathSpec;
///
/// let paths = PathSpec::from(vec!["config/app.yaml", "?config/local.yaml"]);
/// assert_eq!(paths.to_string(), "[config/app.yaml, ?config/local.yaml]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSpec {
    Path { path: PathBuf, optional: bool },
    List(Vec<PathSpec>),
}

impl PathSpec {
    pub fn required(path: impl Into<PathBuf>) -> Self {
        PathSpec::Path {
            path: path.into(),
            optional: false,
        }
    }

    pub fn optional(path: impl Into<PathBuf>) -> Self {
        PathSpec::Path {
            path: path.into(),
            optional: true,
        }
    }

    /// Resolves the paths into files, in order.
    ///
    /// Nested lists are flattened. Missing optional paths are skipped; a
    /// missing required path fails the whole resolution.
    pub fn resolve(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut files = Vec::new();
        self.resolve_into(&mut files)?;
        Ok(files)
    }

    fn resolve_into(&self, files: &mut Vec<PathBuf>) -> Result<(), ConfigError> {
        match self {
            PathSpec::List(items) => {
                for item in items {
                    item.resolve_into(files)?;
                }
                Ok(())
            }
            PathSpec::Path { path, optional } => match expand(path) {
                Ok(found) => {
                    files.extend(found);
                    Ok(())
                }
                Err(ConfigError::FileNotFound(missing)) if *optional => {
                    debug!(path = %missing.display(), "skipping missing optional config path");
                    Ok(())
                }
                Err(e) => Err(e),
            },
        }
    }
}

/// Expands a file to itself and a directory to the files directly inside it.
///
/// Directory entries are returned sorted by path; subdirectories are skipped.
fn expand(path: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let read_error = |source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).map_err(read_error)? {
        let entry_path = entry.map_err(read_error)?.path();
        if entry_path.is_file() {
            files.push(entry_path);
        }
    }
    files.sort();
    Ok(files)
}

impl From<&str> for PathSpec {
    fn from(raw: &str) -> Self {
        match raw.strip_prefix(OPTIONAL_MARKER) {
            Some(rest) => PathSpec::optional(rest.trim_start_matches(OPTIONAL_MARKER)),
            None => PathSpec::required(raw),
        }
    }
}

impl From<String> for PathSpec {
    fn from(raw: String) -> Self {
        PathSpec::from(raw.as_str())
    }
}

impl From<&Path> for PathSpec {
    fn from(path: &Path) -> Self {
        PathSpec::required(path)
    }
}

impl From<PathBuf> for PathSpec {
    fn from(path: PathBuf) -> Self {
        PathSpec::required(path)
    }
}

impl<T: Into<PathSpec>> From<Vec<T>> for PathSpec {
    fn from(items: Vec<T>) -> Self {
        PathSpec::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<PathSpec>, const N: usize> From<[T; N]> for PathSpec {
    fn from(items: [T; N]) -> Self {
        PathSpec::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpec::Path { path, optional } => {
                if *optional {
                    write!(f, "{OPTIONAL_MARKER}")?;
                }
                write!(f, "{}", path.display())
            }
            PathSpec::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_optional_marker_parsed() {
        assert_eq!(
            PathSpec::from("?local.json"),
            PathSpec::optional("local.json")
        );
        assert_eq!(PathSpec::from("app.json"), PathSpec::required("app.json"));
    }

    #[test]
    fn test_resolve_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.json");
        fs::write(&file, "{}").unwrap();

        let files = PathSpec::from(file.clone()).resolve().unwrap();

        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_resolve_missing_required() {
        let result = PathSpec::from("/nonexistent/ladadeedee").resolve();

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_resolve_skips_missing_optional() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.json");
        fs::write(&file, "{}").unwrap();
        let missing = format!("?{}", dir.path().join("missing.json").display());

        let paths = PathSpec::List(vec![PathSpec::from(file.clone()), PathSpec::from(missing)]);
        let files = paths.resolve().unwrap();

        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_resolve_directory_sorted_without_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.yaml"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let files = PathSpec::from(dir.path()).resolve().unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("a.yaml"), dir.path().join("b.json")]
        );
    }

    #[test]
    fn test_resolve_flattens_nested_lists() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        fs::write(&a, "{}").unwrap();
        fs::write(&b, "{}").unwrap();

        let paths = PathSpec::List(vec![
            PathSpec::from(a.clone()),
            PathSpec::from(vec![PathSpec::from(b.clone())]),
        ]);

        assert_eq!(paths.resolve().unwrap(), vec![a, b]);
    }

    #[test]
    fn test_display_marks_optional_entries() {
        let paths = PathSpec::from(["a.json", "?b.json"]);
        assert_eq!(paths.to_string(), "[a.json, ?b.json]");
    }
}
