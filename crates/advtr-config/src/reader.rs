//! Format readers: config file path to [`RawValue`].

use json_comments::{CommentSettings, StripComments};
use std::path::Path;
use tracing::debug;

use crate::value::RawValue;
use crate::{ConfigError, ConfigResult};

/// Field of `package.json` holding the advtr configuration.
pub const PACKAGE_JSON_FIELD: &str = "advtrConfig";

const PACKAGE_JSON: &str = "package.json";

/// How a config file is parsed, decided by its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    PackageJson,
}

impl ConfigFormat {
    /// `.json` files are JSON (or a package manifest when named
    /// `package.json`); everything else, extensionless files included, is YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") if path.file_name().and_then(|n| n.to_str()) == Some(PACKAGE_JSON) => {
                ConfigFormat::PackageJson
            }
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }

    pub fn read(&self, path: &Path) -> ConfigResult<RawValue> {
        match self {
            ConfigFormat::Yaml => read_yaml(path),
            ConfigFormat::Json => read_json(path),
            ConfigFormat::PackageJson => read_package_json(path),
        }
    }
}

/// Read and parse a config file, choosing the reader from its name.
pub fn read_config(path: &Path) -> ConfigResult<RawValue> {
    let format = ConfigFormat::from_path(path);
    debug!(path = %path.display(), ?format, "Reading config file");
    format.read(path)
}

/// Read a file as UTF-8, dropping a leading byte order mark.
pub fn read_file(path: &Path) -> ConfigResult<String> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(match content.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}

/// Load a YAML config. `<<` merge keys are applied and an empty document is
/// an empty mapping.
pub fn read_yaml(path: &Path) -> ConfigResult<RawValue> {
    let content = read_file(path)?;
    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    let mut document: serde_yaml::Value =
        serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?;
    document.apply_merge().map_err(|e| parse_error(e.to_string()))?;

    match RawValue::from_yaml(document).map_err(parse_error)? {
        RawValue::Null => Ok(RawValue::empty_mapping()),
        value => Ok(value),
    }
}

/// Load a JSON config, allowing `//` and `/* */` comments.
///
/// Comments become whitespace, so parser error positions still point at the
/// original text.
pub fn read_json(path: &Path) -> ConfigResult<RawValue> {
    let content = read_file(path)?;
    let stripped = StripComments::with_settings(CommentSettings::c_style(), content.as_bytes());
    let document: serde_json::Value =
        serde_json::from_reader(stripped).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(RawValue::from(document))
}

/// Load the `advtrConfig` field of a `package.json`.
///
/// A manifest without the field fails with [`ConfigError::FieldNotFound`].
pub fn read_package_json(path: &Path) -> ConfigResult<RawValue> {
    let manifest = read_json(path)?;

    let field = manifest
        .as_mapping()
        .and_then(|entries| entries.iter().find(|(k, _)| k == PACKAGE_JSON_FIELD))
        .map(|(_, v)| v.clone());

    field.ok_or_else(|| ConfigError::FieldNotFound {
        path: path.to_path_buf(),
    })
}
