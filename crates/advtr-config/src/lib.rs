//! Configuration loading for advtr.
//!
//! This crate handles:
//! - Reading YAML, JSON (with comments) and `package.json` config files
//! - Locating the config file of a directory
//! - Normalizing the raw tree into an [`ExtractedConfig`]

pub mod error;
pub mod extract;
pub mod locator;
pub mod reader;
pub mod value;

pub use advtr_core::ExtractedConfig;
pub use error::{ConfigError, ConfigResult};
pub use extract::Extractor;
pub use locator::{CONFIG_FILENAMES, ConfigFactory};
pub use reader::{ConfigFormat, read_config};
pub use value::RawValue;
