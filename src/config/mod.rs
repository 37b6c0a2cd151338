//! Configuration loading and management.

mod builder;
mod error;
mod file;
mod source;
mod store;
mod writer;

pub use builder::{ConfigBuilder, Loaded};
pub use error::{ConfigError, Location};
pub use source::PathSpec;
pub use store::{Config, Entries};

pub(crate) use file::{read_file, write_file};
