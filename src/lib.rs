//! Layered configuration store with dotted-key access.
//!
//! Configuration is loaded from JSON, YAML, TOML, XML, INI, Java properties
//! or bincode files, merged in order, and read back through keys such as
//! `database.host`.
//!
//! ```no_run
//! use dragon_cfg::Config;
//!
//! let mut config = Config::load(["config/default.yaml", "?config/local.json"])?;
//! let host = config.get_or("database.host", "localhost");
//! config.set("database.port", 5432);
//! config.to_file("config/effective.json")?;
//! # Ok::<(), dragon_cfg::ConfigError>(())
//! ```

pub mod config;
pub mod format;
mod node;

pub use config::{Config, ConfigBuilder, ConfigError, Entries, Loaded, Location, PathSpec};
pub use format::{extension_of, Codec, Format, FormatRegistry};
pub use node::{deep_merge, Mapping, Node};
