//! Config file discovery.

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use advtr_core::ExtractedConfig;

use crate::extract::Extractor;
use crate::reader::read_config;
use crate::{ConfigError, ConfigResult};

/// Candidate config filenames, highest priority first.
pub const CONFIG_FILENAMES: [&str; 5] = [
    ".advtrc.yaml",
    ".advtrc.yml",
    ".advtrc.json",
    ".advtrc",
    "package.json",
];

/// Loads configs, resolving relative paths against a working directory.
#[derive(Debug, Clone)]
pub struct ConfigFactory {
    cwd: PathBuf,
}

impl ConfigFactory {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// A factory rooted at the process working directory.
    pub fn from_current_dir() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(|source| ConfigError::Read {
            path: PathBuf::from("."),
            source,
        })?;
        Ok(Self::new(cwd))
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Load one config file. Every read or parse error is returned,
    /// including a `package.json` without an `advtrConfig` field.
    #[instrument(skip(self))]
    pub fn load_file<P: AsRef<Path> + std::fmt::Debug>(
        &self,
        path: P,
    ) -> ConfigResult<ExtractedConfig> {
        let path = self.cwd.join(path.as_ref());
        let tree = read_config(&path)?;

        let base_dir = path.parent().unwrap_or(&self.cwd);
        Extractor::new(base_dir).extract(&tree)
    }

    /// Load the first config file found in a directory.
    ///
    /// A `package.json` without an `advtrConfig` field is skipped. When no
    /// candidate applies, an empty config is returned.
    #[instrument(skip(self))]
    pub fn load_in_directory<P: AsRef<Path> + std::fmt::Debug>(
        &self,
        dir: P,
    ) -> ConfigResult<ExtractedConfig> {
        match self.locate(dir.as_ref())? {
            Some((path, config)) => {
                info!(path = %path.display(), "Loaded config");
                Ok(config)
            }
            None => {
                debug!("No config file found, using defaults");
                Ok(ExtractedConfig::new())
            }
        }
    }

    /// Load `path` as a file, or scan it as a directory.
    pub fn load<P: AsRef<Path> + std::fmt::Debug>(
        &self,
        path: P,
    ) -> ConfigResult<ExtractedConfig> {
        let path = path.as_ref();
        if self.cwd.join(path).is_dir() {
            self.load_in_directory(path)
        } else {
            self.load_file(path)
        }
    }

    /// Path and contents of the config file that applies to `dir`, if any.
    pub fn locate(&self, dir: &Path) -> ConfigResult<Option<(PathBuf, ExtractedConfig)>> {
        let dir = self.cwd.join(dir);

        for filename in CONFIG_FILENAMES {
            let path = dir.join(filename);
            if !path.is_file() {
                continue;
            }

            match self.load_file(&path) {
                Ok(config) => return Ok(Some((path, config))),
                Err(e) if e.is_field_not_found() => {
                    debug!(path = %path.display(), "No advtr config in manifest, skipping");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }
}
