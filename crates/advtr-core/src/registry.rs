//! Registry selection and image tag formatting.
//!
//! Tag formats use `%{{name}}` placeholders:
//! - `%{{username}}` - Hub or registry username
//! - `%{{image}}` - Image name
//! - `%{{tag}}` - Tag or version
//! - `%{{repo}}` - Repository name (GitHub registry)
//! - `%{{uri}}` - Registry host
//!
//! Unresolved placeholders become empty strings.

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::{Error, Result};

// Regex for matching %{{...}} placeholders
static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%\{\{(.*?)\}\}").unwrap());

pub const DOCKER: &str = "docker";
pub const GITHUB: &str = "github";

const DOCKER_FORMAT: &str = "%{{username}}/%{{image}}:%{{tag}}";
const GITHUB_FORMAT: &str = "%{{uri}}/%{{username}}/%{{repo}}/%{{image}}:%{{tag}}";
const CUSTOM_FORMAT: &str = "%{{uri}}/%{{username}}/%{{image}}:%{{tag}}";
const GITHUB_URI: &str = "docker.pkg.github.com";

/// The kind of registry, which decides the required tag values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    /// Docker Hub. Requires `username`.
    Docker,
    /// GitHub packages. Requires `repo` and `username`.
    Github,
    /// Any other registry. No required values.
    Custom,
}

/// Values substituted into a registry's tag format.
#[derive(Debug, Clone, Default)]
pub struct TagValues {
    pub username: Option<String>,
    pub image: Option<String>,
    pub tag: Option<String>,
    pub repo: Option<String>,
    pub uri: Option<String>,
    /// Extra values for custom formats.
    pub custom: HashMap<String, String>,
}

impl TagValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        self.repo = Some(repo.into());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.custom.insert(name.to_string(), value.into());
    }

    /// Resolve a placeholder name to a caller-supplied value.
    pub fn get(&self, name: &str) -> Option<&str> {
        match name {
            "username" => self.username.as_deref(),
            "image" => self.image.as_deref(),
            "tag" => self.tag.as_deref(),
            "repo" => self.repo.as_deref(),
            "uri" => self.uri.as_deref(),
            other => self.custom.get(other).map(String::as_str),
        }
    }

    fn has(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_empty())
    }
}

/// A registry descriptor that knows how to format image tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub name: String,
    pub uri: Option<String>,
    pub format: String,
    pub kind: RegistryKind,
}

impl Registry {
    /// The standard Docker Hub registry.
    pub fn docker() -> Self {
        Self {
            name: DOCKER.to_string(),
            uri: None,
            format: DOCKER_FORMAT.to_string(),
            kind: RegistryKind::Docker,
        }
    }

    /// The standard GitHub packages registry.
    pub fn github() -> Self {
        Self {
            name: GITHUB.to_string(),
            uri: Some(GITHUB_URI.to_string()),
            format: GITHUB_FORMAT.to_string(),
            kind: RegistryKind::Github,
        }
    }

    /// A custom registry using the default `uri/username/image:tag` format.
    pub fn custom(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::custom_with_format(name, uri, CUSTOM_FORMAT)
    }

    pub fn custom_with_format(
        name: impl Into<String>,
        uri: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            uri: Some(uri.into()),
            format: format.into(),
            kind: RegistryKind::Custom,
        }
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Docker and GitHub are the standard, well-known registries.
    pub fn is_standard(&self) -> bool {
        self.kind != RegistryKind::Custom
    }

    /// Build a tag from the registry format.
    ///
    /// Standard registries check their required values before any
    /// substitution happens.
    pub fn create_tag(&self, values: &TagValues) -> Result<String> {
        let required: &[&'static str] = match self.kind {
            RegistryKind::Docker => &["username"],
            RegistryKind::Github => &["repo", "username"],
            RegistryKind::Custom => &[],
        };

        if let Some(&field) = required.iter().find(|f| !values.has(f)) {
            return Err(Error::MissingTagValue {
                registry: self.name.clone(),
                field,
            });
        }

        Ok(self.interpolate(values))
    }

    /// Substitute every placeholder, preferring caller values over the
    /// registry's own fields.
    fn interpolate(&self, values: &TagValues) -> String {
        PLACEHOLDER_REGEX
            .replace_all(&self.format, |caps: &regex::Captures| {
                let name = &caps[1];
                values
                    .get(name)
                    .or_else(|| self.own_value(name))
                    .unwrap_or_default()
                    .to_string()
            })
            .to_string()
    }

    fn own_value(&self, name: &str) -> Option<&str> {
        match name {
            "name" => Some(self.name.as_str()),
            "uri" => self.uri.as_deref(),
            "format" => Some(self.format.as_str()),
            _ => None,
        }
    }
}

/// A declared registry: the standard one of its name, or a custom URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEntry {
    Standard,
    Custom { uri: String },
}

impl Serialize for RegistryEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            RegistryEntry::Standard => serializer.serialize_bool(true),
            RegistryEntry::Custom { uri } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("uri", uri)?;
                map.end()
            }
        }
    }
}

/// Registries declared by a configuration, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySelection(Vec<(String, RegistryEntry)>);

impl Default for RegistrySelection {
    /// Docker Hub, with no override.
    fn default() -> Self {
        Self(vec![(DOCKER.to_string(), RegistryEntry::Standard)])
    }
}

impl RegistrySelection {
    /// A selection with no registries at all.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Add or replace a registry, keeping its original position.
    pub fn insert(&mut self, name: impl Into<String>, entry: RegistryEntry) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = entry,
            None => self.0.push((name, entry)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RegistryEntry> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.0.iter().map(|(n, e)| (n.as_str(), e))
    }

    /// Pick the registry to tag images for.
    ///
    /// An explicitly requested name wins, then the last declared non-docker
    /// registry, then Docker Hub. Docker Hub can always be requested by name.
    pub fn resolve(&self, preferred: Option<&str>) -> Result<Registry> {
        if preferred == Some(DOCKER) {
            return Ok(Registry::docker());
        }

        if let Some(name) = preferred {
            let entry = self
                .get(name)
                .ok_or_else(|| Error::UnknownRegistry(name.to_string()))?;
            return Self::descriptor(name, entry);
        }

        match self.0.iter().rev().find(|(n, _)| n != DOCKER) {
            Some((name, entry)) => Self::descriptor(name, entry),
            None => Ok(Registry::docker()),
        }
    }

    fn descriptor(name: &str, entry: &RegistryEntry) -> Result<Registry> {
        match (name, entry) {
            (DOCKER, _) => Ok(Registry::docker()),
            (GITHUB, RegistryEntry::Standard) => Ok(Registry::github()),
            (GITHUB, RegistryEntry::Custom { uri }) => Ok(Registry::github().with_uri(uri)),
            (_, RegistryEntry::Custom { uri }) => Ok(Registry::custom(name, uri)),
            (_, RegistryEntry::Standard) => Err(Error::InvalidRegistry {
                name: name.to_string(),
            }),
        }
    }
}

impl Serialize for RegistrySelection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, entry) in &self.0 {
            map.serialize_entry(name, entry)?;
        }
        map.end()
    }
}
