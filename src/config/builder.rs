use std::path::{Path, PathBuf};

use tracing::debug;

use crate::format::{Codec, CodecHandle, Format, FormatRegistry};
use crate::node::{deep_merge, Mapping};

use super::file::load_file;
use super::source::PathSpec;
use super::store::Config;
use super::ConfigError;

/// The merged result of loading every resolved file.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// Every file merged in order, later files overriding earlier ones.
    pub data: Mapping,
    pub files: Vec<PathBuf>,
    pub loaded: usize,
}

/// Builder for loading configuration from files in any supported format.
///
/// Files are merged in registration order, with later files overriding
/// earlier ones. Nested mappings are merged recursively; other values
/// (including sequences) are replaced entirely.
///
/// The codec for each file is picked from its extension unless one is forced
/// with [`with_format`](Self::with_format) or [`with_codec`](Self::with_codec).
///
/// ## Example
///
/// ```no_run
/// use dragon_cfg::Config;
///
/// let mut config = Config::builder()
///     .with_file("config/default.yaml", true)
///     .with_paths(["config/conf.d", "?config/local.json"])
///     .build()?;
///
/// let port = config.get_or("server.port", 8080);
/// # Ok::<(), dragon_cfg::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .load() or .build() is called"]
pub struct ConfigBuilder {
    sources: Vec<PathSpec>,
    codec: Option<CodecHandle>,
    registry: FormatRegistry,
    defaults: Mapping,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file or directory to be loaded.
    ///
    /// If `required` is `true`, loading fails if the path doesn't exist.
    /// Optional paths that are missing are skipped.
    pub fn with_file(mut self, path: impl AsRef<Path>, required: bool) -> Self {
        let path = path.as_ref().to_path_buf();
        self.sources.push(if required {
            PathSpec::required(path)
        } else {
            PathSpec::optional(path)
        });
        self
    }

    /// Adds paths using the `?optional` string syntax, see [`PathSpec`].
    pub fn with_paths(mut self, paths: impl Into<PathSpec>) -> Self {
        self.sources.push(paths.into());
        self
    }

    /// Parses every file as `format`, whatever its extension.
    pub fn with_format(mut self, format: Format) -> Self {
        self.codec = Some(CodecHandle::Builtin(format.codec()));
        self
    }

    /// Parses every file with `codec`, whatever its extension.
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Some(CodecHandle::Custom(Box::new(codec)));
        self
    }

    /// Replaces the registry used to pick codecs by extension.
    pub fn with_registry(mut self, registry: FormatRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the values the loaded files are merged over.
    pub fn with_defaults(mut self, defaults: Mapping) -> Self {
        self.defaults = defaults;
        self
    }

    /// Resolves, parses and merges every source without building a store.
    ///
    /// Defaults are not part of the result.
    pub fn load(&self) -> Result<Loaded, ConfigError> {
        let paths = PathSpec::List(self.sources.clone());
        let files = paths.resolve()?;

        let mut data = Mapping::new();
        let mut loaded = 0;
        for path in &files {
            let codec = match &self.codec {
                Some(handle) => handle.get(),
                None => self.registry.codec_for_path(path)?,
            };
            let table = load_file(path, codec)?;
            debug!(path = %path.display(), codec = codec.name(), "loaded config file");
            deep_merge(&mut data, table);
            loaded += 1;
        }

        if loaded == 0 {
            return Err(ConfigError::EmptyDirectory(paths.to_string()));
        }

        Ok(Loaded {
            data,
            files,
            loaded,
        })
    }

    /// Loads every source and wraps the result, merged over the defaults.
    pub fn build(self) -> Result<Config, ConfigError> {
        let loaded = self.load()?;
        Ok(Config::from_loaded(self.defaults, loaded))
    }
}
