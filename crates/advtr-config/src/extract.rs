//! Extraction engine: normalizes a [`RawValue`] tree into an
//! [`ExtractedConfig`].
//!
//! Each top-level section is handled by its own pass:
//! - `services` -> [`Extractor::normalize_builds`]
//! - `matrix` -> [`Extractor::normalize_matrices`]
//! - `registry` -> [`Extractor::normalize_registry`]
//!
//! Passes never look at each other's sections. A failing pass returns no
//! partial result.

use advtr_core::build::{BuildArgument, BuildArgumentDraft, BuildUnit, LifecycleStage};
use advtr_core::matrix::{ArgumentValues, MatrixEntry};
use advtr_core::registry::{DOCKER, RegistryEntry, RegistrySelection};
use advtr_core::{Error, ExtractedConfig};
use std::path::{Component, PathBuf};
use tracing::debug;

use crate::value::RawValue;
use crate::{ConfigError, ConfigResult};

// Field aliases, consulted in order. snake_case always comes first.
const LIFECYCLE_KEYS: [(LifecycleStage, &[&str]); 4] = [
    (
        LifecycleStage::PreBuild,
        &["pre_build", "prebuild", "before_build"],
    ),
    (LifecycleStage::PostBuild, &["post_build", "postbuild"]),
    (LifecycleStage::PrePush, &["pre_push", "prepush"]),
    (LifecycleStage::PostPush, &["post_push", "postpush"]),
];
const DEFAULT_TAG_KEYS: &[&str] = &["default_tag", "defaultTag"];
const BUILD_ARGUMENT_KEYS: &[&str] = &["build_arguments", "buildArguments"];
const DEFAULT_VALUE_KEYS: &[&str] = &["default_value", "defaultValue"];
const REGISTRY_URI_KEYS: &[&str] = &["uri", "url"];

/// Normalizes raw config trees.
#[derive(Debug, Clone)]
pub struct Extractor {
    /// Directory relative `file` paths are resolved against.
    base_dir: PathBuf,
}

impl Extractor {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Normalize a whole config document.
    ///
    /// Unknown top-level keys are ignored. Missing sections keep the
    /// defaults of [`ExtractedConfig::new`].
    pub fn extract(&self, tree: &RawValue) -> ConfigResult<ExtractedConfig> {
        if tree.as_mapping().is_none() {
            return Err(ConfigError::invalid(
                "config",
                format!("expected a mapping, found {}", tree.kind()),
            ));
        }

        let mut config = ExtractedConfig::new();

        if let Some(services) = tree.get("services") {
            config.builds = self.normalize_builds(services)?;
        }
        if let Some(matrices) = tree.get("matrix") {
            config.matrices = self.normalize_matrices(matrices)?;
        }
        if let Some(registry) = tree.get("registry") {
            config.registry = self.normalize_registry(registry)?;
        }

        debug!(
            builds = config.builds.len(),
            matrices = config.matrices.len(),
            registries = config.registry.len(),
            "Extracted config"
        );

        Ok(config)
    }

    /// Normalize the `services` section into build units.
    pub fn normalize_builds(&self, services: &RawValue) -> ConfigResult<Vec<BuildUnit>> {
        let entries = expect_mapping(services, "services")?;
        entries
            .iter()
            .map(|(key, service)| self.normalize_build(key, service))
            .collect()
    }

    fn normalize_build(&self, key: &str, service: &RawValue) -> ConfigResult<BuildUnit> {
        let field = |name: &str| format!("services.{}.{}", key, name);

        if key.is_empty() {
            return Err(ConfigError::invalid("services", "service keys must not be empty"));
        }

        if !service.is_null() && service.as_mapping().is_none() {
            return Err(ConfigError::invalid(
                format!("services.{}", key),
                format!("expected a mapping, found {}", service.kind()),
            ));
        }

        let mut unit = BuildUnit::new(key);

        if let Some(name) = optional_string(service, &["name"], &field("name"))? {
            unit.name = name;
        }
        if let Some(tag) = optional_string(service, DEFAULT_TAG_KEYS, &field("default_tag"))? {
            unit.default_tag = tag;
        }
        if let Some(dockerfile) =
            optional_string(service, &["dockerfile"], &field("dockerfile"))?
        {
            unit.dockerfile = Some(dockerfile);
        }
        if let Some(file) = optional_string(service, &["file"], &field("file"))? {
            unit.set_file(self.resolve(&file));
        }

        if let Some(rm) = service.get("rm") {
            unit.rm = rm.as_bool().ok_or_else(|| {
                ConfigError::invalid(
                    field("rm"),
                    format!("expected a boolean, found {}", rm.kind()),
                )
            })?;
        }

        for (stage, keys) in LIFECYCLE_KEYS {
            if let Some(commands) = service.get_first(keys) {
                let commands = string_list(commands, &field(&stage.to_string()))?;
                if let Some(slot) = unit.commands_mut(stage) {
                    *slot = commands;
                }
            }
        }

        if let Some(arguments) = service.get_first(BUILD_ARGUMENT_KEYS) {
            let arguments = expect_sequence(arguments, &field("build_arguments"))?;
            unit.build_arguments = Some(
                arguments
                    .iter()
                    .map(build_argument)
                    .collect::<ConfigResult<Vec<_>>>()?,
            );
        }

        Ok(unit)
    }

    /// Normalize the `matrix` section, given either as a sequence of entries
    /// with their own `tag` or as a mapping of tag to entry.
    pub fn normalize_matrices(&self, matrices: &RawValue) -> ConfigResult<Vec<MatrixEntry>> {
        match matrices {
            RawValue::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| {
                    let field = format!("matrix[{}]", index);
                    expect_mapping(item, &field)?;
                    let tag = optional_string(item, &["tag"], &format!("{}.tag", field))?
                        .ok_or_else(|| ConfigError::MissingField(format!("{}.tag", field)))?;
                    self.normalize_matrix(tag, item, &field)
                })
                .collect(),
            RawValue::Mapping(entries) => entries
                .iter()
                .map(|(key, item)| {
                    let field = format!("matrix.{}", key);
                    if !item.is_null() {
                        expect_mapping(item, &field)?;
                    }
                    // An inner `tag` overrides the key.
                    let tag = optional_string(item, &["tag"], &format!("{}.tag", field))?
                        .unwrap_or_else(|| key.clone());
                    self.normalize_matrix(tag, item, &field)
                })
                .collect(),
            other => Err(ConfigError::invalid(
                "matrix",
                format!("expected a sequence or mapping, found {}", other.kind()),
            )),
        }
    }

    fn normalize_matrix(
        &self,
        tag: String,
        item: &RawValue,
        field: &str,
    ) -> ConfigResult<MatrixEntry> {
        let mut entry = MatrixEntry::new(tag);

        if let Some(file) = optional_string(item, &["file"], &format!("{}.file", field))? {
            entry.file = Some(self.resolve(&file));
        }

        if let Some(arguments) = item.get_first(BUILD_ARGUMENT_KEYS) {
            let arguments_field = format!("{}.build_arguments", field);
            let mut values = ArgumentValues::new();
            for pair in string_list(arguments, &arguments_field)? {
                let (key, value) = pair.split_once('=').ok_or_else(|| {
                    ConfigError::invalid(
                        arguments_field.clone(),
                        format!("expected KEY=value, found '{}'", pair),
                    )
                })?;
                values.insert(key, value);
            }
            if !values.is_empty() {
                entry.build_arguments = Some(values);
            }
        }

        Ok(entry)
    }

    /// Normalize the `registry` section.
    ///
    /// `docker` always means the standard Docker Hub registry. Every other
    /// registry needs a `uri` (or `url`).
    pub fn normalize_registry(&self, registry: &RawValue) -> ConfigResult<RegistrySelection> {
        let entries = expect_mapping(registry, "registry")?;
        let mut selection = RegistrySelection::empty();

        for (name, value) in entries {
            if name == DOCKER {
                selection.insert(name.clone(), RegistryEntry::Standard);
                continue;
            }

            let uri = value
                .get_first(REGISTRY_URI_KEYS)
                .and_then(RawValue::as_str)
                .filter(|uri| !uri.is_empty())
                .ok_or_else(|| Error::InvalidRegistry { name: name.clone() })?;

            selection.insert(
                name.clone(),
                RegistryEntry::Custom {
                    uri: uri.to_string(),
                },
            );
        }

        Ok(selection)
    }

    /// Resolve a path lexically against the base directory.
    fn resolve(&self, path: &str) -> PathBuf {
        let joined = self.base_dir.join(path);
        let mut resolved = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    resolved.pop();
                }
                other => resolved.push(other.as_os_str()),
            }
        }
        resolved
    }
}

fn build_argument(raw: &RawValue) -> ConfigResult<BuildArgument> {
    let draft = match raw {
        RawValue::String(compact) => BuildArgumentDraft::from_compact(compact),
        RawValue::Mapping(_) => BuildArgumentDraft {
            argument: raw.get("argument").and_then(RawValue::render_scalar),
            option: raw.get("option").and_then(RawValue::render_scalar),
            default_value: raw
                .get_first(DEFAULT_VALUE_KEYS)
                .and_then(RawValue::render_scalar),
            raw: raw.to_string(),
        },
        other => {
            return Err(Error::InvalidBuildArgument {
                raw: other.to_string(),
            }
            .into());
        }
    };

    Ok(draft.validate()?)
}

fn expect_mapping<'a>(
    value: &'a RawValue,
    field: &str,
) -> ConfigResult<&'a [(String, RawValue)]> {
    value.as_mapping().ok_or_else(|| {
        ConfigError::invalid(field, format!("expected a mapping, found {}", value.kind()))
    })
}

fn expect_sequence<'a>(value: &'a RawValue, field: &str) -> ConfigResult<&'a [RawValue]> {
    value.as_sequence().ok_or_else(|| {
        ConfigError::invalid(field, format!("expected a sequence, found {}", value.kind()))
    })
}

/// A sequence of scalars, as strings.
fn string_list(value: &RawValue, field: &str) -> ConfigResult<Vec<String>> {
    expect_sequence(value, field)?
        .iter()
        .map(|item| {
            item.render_scalar().ok_or_else(|| {
                ConfigError::invalid(field, format!("expected a string, found {}", item.kind()))
            })
        })
        .collect()
}

/// First present key among `keys`, as a string. Empty strings count as absent.
fn optional_string(
    value: &RawValue,
    keys: &[&str],
    field: &str,
) -> ConfigResult<Option<String>> {
    match value.get_first(keys) {
        None => Ok(None),
        Some(found) => found
            .render_scalar()
            .map(|s| Some(s).filter(|s| !s.is_empty()))
            .ok_or_else(|| {
                ConfigError::invalid(field, format!("expected a string, found {}", found.kind()))
            }),
    }
}
