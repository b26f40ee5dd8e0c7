//! CLI command implementations.

pub mod build;
pub mod config;

use advtr_config::ConfigFactory;
use advtr_core::ExtractedConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// A config together with the directories its paths are relative to.
pub struct LoadedConfig {
    pub config: ExtractedConfig,
    /// Directory holding the config file, or the scanned directory.
    pub config_dir: PathBuf,
    pub working_dir: PathBuf,
}

/// Load `file` (a config file or a directory to scan) from the current directory.
pub fn load_config(file: &Path) -> Result<LoadedConfig> {
    let factory =
        ConfigFactory::from_current_dir().context("Failed to resolve working directory")?;

    let config = factory
        .load(file)
        .with_context(|| format!("Failed to load config from {}", file.display()))?;

    let target = factory.cwd().join(file);
    let config_dir = if target.is_dir() {
        target
    } else {
        target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| factory.cwd().to_path_buf())
    };

    Ok(LoadedConfig {
        config,
        config_dir,
        working_dir: factory.cwd().to_path_buf(),
    })
}
