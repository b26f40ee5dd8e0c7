//! Loading configs from disk through `ConfigFactory`.

use advtr_config::{ConfigError, ConfigFactory};
use advtr_core::RegistrySelection;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FILES: [(&str, &str); 5] = [
    (
        "yml/.advtrc.yml",
        "version: '1.0'\nservices:\n  binary:\n    name: advtr-cli",
    ),
    (
        "yaml/.advtrc.yaml",
        "version: '1.0'\nservices:\n  binary:\n    name: advtr-cli",
    ),
    (
        "json/.advtrc.json",
        r#"{"services": { "binary": { "name": "advtr-cli" }}}"#,
    ),
    (
        "package-json/package.json",
        r#"{"advtrConfig": {"services": { "binary": { "name": "advtr-cli" }}}}"#,
    ),
    (
        "default/.advtrc",
        "version: '1.0'\nservices:\n  binary:\n    name: advtr-cli",
    ),
];

fn fixture() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let no_config = ("package-json-no-config/package.json", r#"{ "name": "foo" }"#);

    for (path, content) in FILES.iter().chain(std::iter::once(&no_config)) {
        let path = dir.path().join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    dir
}

fn assert_empty(config: &advtr_config::ExtractedConfig) {
    assert!(config.builds.is_empty());
    assert!(config.matrices.is_empty());
    assert_eq!(config.registry, RegistrySelection::default());
}

#[test]
fn test_load_file_every_format() {
    let dir = fixture();
    let factory = ConfigFactory::new(dir.path());

    for (path, _) in FILES {
        let config = factory
            .load_file(path)
            .unwrap_or_else(|e| panic!("{} failed to load: {}", path, e));
        let binary = config.build("binary").expect("binary build");
        assert_eq!(binary.name, "advtr-cli", "loading {}", path);
    }
}

#[test]
fn test_load_file_missing() {
    let dir = fixture();
    let factory = ConfigFactory::new(dir.path());
    assert!(matches!(
        factory.load_file("non-exist"),
        Err(ConfigError::Read { .. })
    ));
}

#[test]
fn test_load_file_package_json_without_field() {
    let dir = fixture();
    let factory = ConfigFactory::new(dir.path());
    let err = factory
        .load_file("package-json-no-config/package.json")
        .unwrap_err();
    assert!(err.is_field_not_found());
}

#[test]
fn test_load_in_directory_every_format() {
    let dir = fixture();
    let factory = ConfigFactory::new(dir.path());

    for (path, _) in FILES {
        let directory = path.split('/').next().unwrap();
        let config = factory.load_in_directory(directory).unwrap();
        let binary = config.build("binary").expect("binary build");
        assert_eq!(binary.name, "advtr-cli", "loading {}", directory);
    }
}

#[test]
fn test_load_in_directory_without_config() {
    let dir = fixture();
    let factory = ConfigFactory::new(dir.path());
    assert_empty(&factory.load_in_directory("non-exist").unwrap());
}

#[test]
fn test_load_in_directory_package_json_without_field() {
    let dir = fixture();
    let factory = ConfigFactory::new(dir.path());
    assert_empty(&factory.load_in_directory("package-json-no-config").unwrap());
}

#[test]
fn test_malformed_json_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(".advtrc.json");
    fs::write(&path, "{services: {}}").unwrap();

    let err = ConfigFactory::new(dir.path())
        .load_in_directory(Path::new("."))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains(".advtrc.json"));
}

#[test]
fn test_full_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".advtrc.yaml"),
        r#"
version: '1.0'
services:
  search:
    name: geo-search
    default_tag: stable
    rm: true
    pre_build:
      - npm ci
    post_push:
      - ./notify.sh
    build_arguments:
      - REACT_APP_BASE_URL=uri
      - argument: NODE_ENV
        option: node
        default_value: production
matrix:
  react:
    build_arguments:
      - REACT_APP_BASE_URL=example.com
  react-local:
    file: ./dockerfile.dev
    build_arguments:
      - REACT_APP_BASE_URL=localhost
registry:
  docker: true
  rsdv:
    url: docker.rsdv.co.uk
"#,
    )
    .unwrap();

    let config = ConfigFactory::new(dir.path()).load(".").unwrap();

    let search = config.build("search").unwrap();
    assert_eq!(search.name, "geo-search");
    assert_eq!(search.default_tag, "stable");
    assert!(search.rm);
    assert_eq!(search.prebuild, vec!["npm ci"]);
    assert_eq!(search.postpush, vec!["./notify.sh"]);
    let arguments = search.build_arguments.as_ref().unwrap();
    assert_eq!(arguments.len(), 2);
    assert_eq!(arguments[1].default_value.as_deref(), Some("production"));

    assert_eq!(config.matrices.len(), 2);
    assert_eq!(config.matrices[0].tag, "react");
    assert_eq!(
        config.matrices[1].file.as_deref(),
        Some(dir.path().join("dockerfile.dev").as_path())
    );

    let registry = config.registry.resolve(None).unwrap();
    assert_eq!(registry.name, "rsdv");
    assert_eq!(registry.uri.as_deref(), Some("docker.rsdv.co.uk"));
}

#[test]
fn test_yaml_anchors_merge_into_services() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".advtrc.yaml"),
        "base: &base\n  default_tag: edge\n  rm: true\nservices:\n  api:\n    <<: *base\n    name: api\n",
    )
    .unwrap();

    let config = ConfigFactory::new(dir.path()).load(".").unwrap();
    let api = config.build("api").unwrap();
    assert_eq!(api.default_tag, "edge");
    assert!(api.rm);
}
