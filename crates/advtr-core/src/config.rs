//! The extracted configuration aggregate.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::build::BuildUnit;
use crate::matrix::MatrixEntry;
use crate::registry::RegistrySelection;

/// Final configuration for one config file.
///
/// A fresh config has no builds, no matrices and the Docker Hub registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedConfig {
    /// Build units in declaration order, keyed by [`BuildUnit::key`].
    #[serde(serialize_with = "serialize_builds")]
    pub builds: Vec<BuildUnit>,
    pub matrices: Vec<MatrixEntry>,
    pub registry: RegistrySelection,
}

impl ExtractedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a build unit by the key it was declared under.
    pub fn build(&self, key: &str) -> Option<&BuildUnit> {
        self.builds.iter().find(|b| b.key == key)
    }

    /// Add a build unit, replacing any unit declared under the same key.
    pub fn insert_build(&mut self, unit: BuildUnit) {
        match self.builds.iter_mut().find(|b| b.key == unit.key) {
            Some(slot) => *slot = unit,
            None => self.builds.push(unit),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.builds.is_empty() && self.matrices.is_empty()
    }
}

fn serialize_builds<S: Serializer>(builds: &[BuildUnit], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(builds.len()))?;
    for unit in builds {
        map.serialize_entry(&unit.key, unit)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_config_is_empty_with_docker_registry() {
        let config = ExtractedConfig::new();
        assert!(config.builds.is_empty());
        assert!(config.matrices.is_empty());
        assert_eq!(config.registry, RegistrySelection::default());
        assert!(config.is_empty());
    }

    #[test]
    fn test_insert_build_replaces_same_key() {
        let mut config = ExtractedConfig::new();
        config.insert_build(BuildUnit::new("api"));
        config.insert_build(BuildUnit::new("web"));

        let mut api = BuildUnit::new("api");
        api.name = "geo-api".to_string();
        config.insert_build(api);

        assert_eq!(config.builds.len(), 2);
        assert_eq!(config.builds[0].name, "geo-api");
        assert_eq!(config.build("web").map(|b| b.name.as_str()), Some("web"));
    }

    #[test]
    fn test_builds_serialize_as_map() {
        let mut config = ExtractedConfig::new();
        config.insert_build(BuildUnit::new("binary"));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["builds"]["binary"]["name"], "binary");
        assert_eq!(json["builds"]["binary"]["defaultTag"], "latest");
        assert_eq!(json["registry"], serde_json::json!({ "docker": true }));
    }
}
