use std::collections::HashMap;
use std::iter::FusedIterator;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::format::{into_root, Codec};
use crate::node::{child_mapping, deep_merge, Mapping, Node};

use super::builder::{ConfigBuilder, Loaded};
use super::file::read_file;
use super::source::PathSpec;
use super::ConfigError;

/// Where the store's data came from.
#[derive(Debug, Clone, PartialEq)]
enum Origin {
    Memory,
    Text(String),
    Files(Vec<PathBuf>),
}

/// A configuration tree addressed by dotted keys.
///
/// Keys are mapping keys joined by `.`; `database.host` reads the `host` entry
/// of the `database` mapping. A key segment cannot itself contain a dot.
///
/// Resolved values are cached per key. [`has`](Self::has) fills the cache and
/// [`set`](Self::set) drops every entry at or below the key it writes, plus the
/// entries of its ancestors, so a read never returns a replaced value.
///
/// Reads take `&mut self` because they populate the cache. Share a store
/// between threads behind a lock.
#[derive(Debug, Clone)]
pub struct Config {
    data: Mapping,
    cache: HashMap<String, Node>,
    origin: Origin,
}

impl Config {
    /// Wraps an in-memory mapping.
    pub fn new(data: Mapping) -> Self {
        Self {
            data,
            cache: HashMap::new(),
            origin: Origin::Memory,
        }
    }

    /// Deep-merges `data` over `defaults`; values in `data` win.
    pub fn with_defaults(defaults: Mapping, data: Mapping) -> Self {
        let mut merged = defaults;
        deep_merge(&mut merged, data);
        Self::new(merged)
    }

    /// Creates a new loader.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Loads and merges every file named by `paths`.
    ///
    /// ```no_run
    /// use dragon_cfg::Config;
    ///
    /// let config = Config::load(["config/app.yaml", "?config/local.yaml"])?;
    /// # Ok::<(), dragon_cfg::ConfigError>(())
    /// ```
    pub fn load(paths: impl Into<PathSpec>) -> Result<Self, ConfigError> {
        ConfigBuilder::new().with_paths(paths).build()
    }

    /// Parses a document held in memory with the given codec.
    pub fn parse(text: &str, codec: &dyn Codec) -> Result<Self, ConfigError> {
        let data = into_root(codec.parse_str(text)?)?;
        Ok(Self {
            data,
            cache: HashMap::new(),
            origin: Origin::Text(text.to_owned()),
        })
    }

    pub(crate) fn from_loaded(defaults: Mapping, loaded: Loaded) -> Self {
        let mut config = Self::with_defaults(defaults, loaded.data);
        config.origin = Origin::Files(loaded.files);
        config
    }

    /// Returns the value at `key`, or `None` if the path does not exist.
    ///
    /// A key present with a null value returns `Some(&Node::Null)`.
    pub fn get(&mut self, key: &str) -> Option<&Node> {
        if self.has(key) {
            self.cache.get(key)
        } else {
            None
        }
    }

    /// Returns the value at `key`, or `default` if the path does not exist.
    ///
    /// The default is never cached.
    pub fn get_or(&mut self, key: &str, default: impl Into<Node>) -> Node {
        match self.get(key) {
            Some(node) => node.clone(),
            None => default.into(),
        }
    }

    /// Deserializes the value at `key` into `T`.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Some(node) => Ok(Some(serde_json::from_value(serde_json::to_value(node)?)?)),
            None => Ok(None),
        }
    }

    /// Deserializes the whole tree into `T`.
    pub fn try_deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        Ok(serde_json::from_value(serde_json::to_value(&self.data)?)?)
    }

    /// Returns whether `key` resolves to a value, caching it when it does.
    pub fn has(&mut self, key: &str) -> bool {
        if self.cache.contains_key(key) {
            return true;
        }
        match lookup(&self.data, key) {
            Some(node) => {
                trace!(key, "caching config value");
                self.cache.insert(key.to_owned(), node.clone());
                true
            }
            None => false,
        }
    }

    /// Stores `value` at `key`, creating intermediate mappings as needed.
    ///
    /// A scalar sitting where an intermediate mapping is needed is replaced.
    pub fn set(&mut self, key: &str, value: impl Into<Node>) {
        let value = value.into();
        let segments: Vec<&str> = key.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut target = &mut self.data;
        let mut prefix = String::with_capacity(key.len());
        for (i, segment) in parents.iter().enumerate() {
            if i > 0 {
                prefix.push('.');
            }
            prefix.push_str(segment);
            self.cache.remove(&prefix);
            target = child_mapping(target, segment);
        }

        let before = self.cache.len();
        self.cache.retain(|cached, _| !is_same_or_descendant(cached, key));
        trace!(key, dropped = before - self.cache.len(), "invalidated cached config values");

        target.insert((*last).to_owned(), value.clone());
        self.cache.insert(key.to_owned(), value);
    }

    /// Sets `key` to null. The key stays present: `has` still returns `true`.
    pub fn remove(&mut self, key: &str) {
        self.set(key, Node::Null);
    }

    /// The whole tree.
    pub fn all(&self) -> &Mapping {
        &self.data
    }

    /// Deep-merges `other` into this store and clears the cache.
    pub fn merge(&mut self, other: &Config) -> &mut Self {
        deep_merge(&mut self.data, other.data.clone());
        debug!(
            keys = other.data.len(),
            cached = self.cache.len(),
            "merged config, clearing cache"
        );
        self.cache.clear();
        self
    }

    /// Iterates over the top-level entries in insertion order.
    pub fn iter(&self) -> Entries<'_> {
        Entries {
            inner: self.data.iter(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Files merged into this store, in load order.
    pub fn files(&self) -> &[PathBuf] {
        match &self.origin {
            Origin::Files(files) => files,
            Origin::Memory | Origin::Text(_) => &[],
        }
    }

    /// The source the store was loaded from.
    ///
    /// Parsed text is returned as is. Loaded files are re-read and listed as
    /// `1. path` followed by the file contents.
    pub fn source_text(&self) -> Result<String, ConfigError> {
        match &self.origin {
            Origin::Memory => Ok(String::new()),
            Origin::Text(text) => Ok(text.clone()),
            Origin::Files(files) => {
                let mut out = String::new();
                for (i, path) in files.iter().enumerate() {
                    out.push_str(&format!("{}. {}\n", i + 1, path.display()));
                    out.push_str(&String::from_utf8_lossy(&read_file(path)?));
                    out.push('\n');
                }
                Ok(out)
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Mapping::new())
    }
}

impl From<Mapping> for Config {
    fn from(data: Mapping) -> Self {
        Self::new(data)
    }
}

/// Walks `data` along the segments of `key`.
fn lookup<'a>(data: &'a Mapping, key: &str) -> Option<&'a Node> {
    let mut segments = key.split('.');
    let mut node = data.get(segments.next()?)?;
    for segment in segments {
        node = node.as_mapping()?.get(segment)?;
    }
    Some(node)
}

/// True for `key` itself and keys below it, but not siblings sharing a prefix.
fn is_same_or_descendant(cached: &str, key: &str) -> bool {
    cached
        .strip_prefix(key)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

/// Iterator over a store's top-level entries, see [`Config::iter`].
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    inner: indexmap::map::Iter<'a, String, Node>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a str, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, value)| (key.as_str(), value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Entries<'_> {}

impl FusedIterator for Entries<'_> {}

impl<'a> IntoIterator for &'a Config {
    type Item = (&'a str, &'a Node);
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
