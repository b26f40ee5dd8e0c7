//! Image expansion.
//!
//! Turns the build units and matrix entries of an [`ExtractedConfig`] into
//! concrete images, each with its build argument values resolved.

use std::collections::HashMap;
use std::path::Path;

use crate::build::{BuildUnit, LifecycleStage};
use crate::config::ExtractedConfig;
use crate::matrix::{ArgumentValues, MatrixEntry};
use crate::{Error, Result};

/// Caller-supplied inputs to image expansion.
#[derive(Debug, Clone, Default)]
pub struct ImageOptions {
    /// Build unit keys to expand. Empty means all of them.
    pub targets: Vec<String>,
    /// Values for build argument options, keyed by option name.
    pub options: HashMap<String, String>,
    /// Leave unresolved build arguments out instead of failing.
    pub pass_args: bool,
}

/// A concrete image to build: a build unit, optionally specialised by a
/// matrix entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub unit: BuildUnit,
    pub matrix: Option<MatrixEntry>,
    /// Resolved `argument -> value` pairs, in declaration order.
    pub build_arguments: ArgumentValues,
}

impl Image {
    /// Key of the build unit this image comes from.
    pub fn build(&self) -> &str {
        &self.unit.key
    }

    pub fn name(&self) -> &str {
        &self.unit.name
    }

    /// Tag used when the caller supplies none.
    pub fn default_tag(&self) -> &str {
        match &self.matrix {
            Some(entry) => &entry.tag,
            None => &self.unit.default_tag,
        }
    }

    /// Explicit Dockerfile, with the matrix entry taking precedence.
    pub fn file(&self) -> Option<&Path> {
        self.matrix
            .as_ref()
            .and_then(|m| m.file.as_deref())
            .or(self.unit.file.as_deref())
    }

    /// Dockerfile directory. Always `None` when an explicit file is used.
    pub fn dockerfile(&self) -> Option<&str> {
        if self.file().is_some() {
            return None;
        }
        self.unit.dockerfile.as_deref()
    }

    pub fn rm(&self) -> bool {
        self.unit.rm
    }

    pub fn commands(&self, stage: LifecycleStage) -> &[String] {
        self.unit.commands(stage)
    }

    /// Label for logs, e.g. `api` or `api[canary]`.
    pub fn label(&self) -> String {
        match &self.matrix {
            Some(entry) => format!("{}[{}]", self.unit.key, entry.tag),
            None => self.unit.key.clone(),
        }
    }
}

/// Expand a configuration into the images to build.
///
/// A single build unit with matrix entries yields one image per entry.
/// Otherwise every selected build unit yields one image.
pub fn expand_images(config: &ExtractedConfig, options: &ImageOptions) -> Result<Vec<Image>> {
    if let Some(unknown) = options
        .targets
        .iter()
        .find(|t| config.build(t).is_none())
    {
        return Err(Error::UnknownTarget(unknown.clone()));
    }

    let selected: Vec<&BuildUnit> = config
        .builds
        .iter()
        .filter(|b| options.targets.is_empty() || options.targets.contains(&b.key))
        .collect();

    let variants: Vec<(&BuildUnit, Option<&MatrixEntry>)> =
        if config.builds.len() == 1 && !config.matrices.is_empty() {
            selected
                .iter()
                .flat_map(|unit| config.matrices.iter().map(move |m| (*unit, Some(m))))
                .collect()
        } else {
            selected.iter().map(|unit| (*unit, None)).collect()
        };

    let mut images = Vec::with_capacity(variants.len());
    let mut missing: Vec<String> = Vec::new();

    for (unit, matrix) in variants {
        let mut build_arguments = ArgumentValues::new();

        for argument in unit.build_arguments.iter().flatten() {
            let value = matrix
                .and_then(|m| m.argument_value(&argument.argument))
                .or_else(|| options.options.get(&argument.option).map(String::as_str))
                .or(argument.default_value.as_deref());

            match value {
                Some(value) => build_arguments.insert(argument.argument.clone(), value),
                None => {
                    let flag = format!("--{}", argument.option);
                    if !missing.contains(&flag) {
                        missing.push(flag);
                    }
                }
            }
        }

        images.push(Image {
            unit: unit.clone(),
            matrix: matrix.cloned(),
            build_arguments,
        });
    }

    if !missing.is_empty() && !options.pass_args {
        return Err(Error::MissingBuildArguments { options: missing });
    }

    Ok(images)
}
