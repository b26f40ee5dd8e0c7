use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const SINGLE_SERVICE: &str = "version: '1.0'\n\
                              services:\n  \
                                binary:\n    \
                                  name: advtr-cli\n    \
                                  pre_build:\n      \
                                    - npm ci\n    \
                                  post_push:\n      \
                                    - ./notify.sh\n";

const MATRIX: &str = r#"
services:
  search:
    name: geo-search
    build_arguments:
      - REACT_APP_BASE_URL=uri
matrix:
  react:
    build_arguments:
      - REACT_APP_BASE_URL=example.com
  react-local:
    file: ./dockerfile.dev
    build_arguments:
      - REACT_APP_BASE_URL=localhost
registry:
  rsdv:
    url: docker.rsdv.co.uk
"#;

const WITH_ARGUMENTS: &str = r#"
services:
  api:
    build_arguments:
      - argument: NODE_ENV
        option: env
      - API_URL=uri
"#;

fn fixture(name: &str, contents: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir should be created");
    fs::write(dir.path().join(name), contents).expect("fixture write should succeed");
    dir
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_advtr"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("ADVTR_FILE")
        .env_remove("ADVTR_USER")
        .env_remove("ADVTR_TOOL")
        .output()
        .expect("command should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("stdout should be utf-8")
}

fn stderr(output: &Output) -> String {
    String::from_utf8(output.stderr.clone()).expect("stderr should be utf-8")
}

#[test]
fn config_prints_json() {
    let dir = fixture(".advtrc", SINGLE_SERVICE);
    let output = run(dir.path(), &["config", "--loglevel", "silent"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be json");
    let binary = &json["builds"]["binary"];
    assert_eq!(binary["name"], "advtr-cli");
    assert_eq!(binary["defaultTag"], "latest");
    assert_eq!(binary["dockerfile"], ".");
    assert_eq!(binary["prebuild"], serde_json::json!(["npm ci"]));
    assert_eq!(json["matrices"], serde_json::json!([]));
    assert_eq!(json["registry"], serde_json::json!({ "docker": true }));
}

#[test]
fn config_without_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["config"]);
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["builds"], serde_json::json!({}));
}

#[test]
fn build_dry_run_prints_commands() {
    let dir = fixture(".advtrc", SINGLE_SERVICE);
    let output = run(dir.path(), &["build", "--dry-run", "-U", "bob"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(
        lines,
        vec!["npm ci", "docker build -t bob/advtr-cli:latest ."]
    );
}

#[test]
fn build_dry_run_with_push_and_tags() {
    let dir = fixture(".advtrc.yml", SINGLE_SERVICE);
    let output = run(
        dir.path(),
        &[
            "build", "--dry-run", "--push", "-U", "bob", "-T", "1.0", "-T", "stable", "--tool",
            "podman",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("podman build -t bob/advtr-cli:1.0 -t bob/advtr-cli:stable ."));
    assert!(out.contains("echo 'bob/advtr-cli:1.0' 'bob/advtr-cli:stable' | xargs -n 1 podman push"));
    assert!(out.trim_end().ends_with("./notify.sh"));
}

#[test]
fn build_matrix_uses_declared_registry() {
    let dir = fixture(".advtrc.yaml", MATRIX);
    let output = run(dir.path(), &["build", "--dry-run", "-U", "bob"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let lines: Vec<String> = stdout(&output).lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("docker build -t docker.rsdv.co.uk/bob/geo-search:react "));
    assert!(lines[0].contains("REACT_APP_BASE_URL=example.com"));
    assert!(lines[1].contains("-t docker.rsdv.co.uk/bob/geo-search:react-local"));
    assert!(lines[1].contains("-f dockerfile.dev"));
}

#[test]
fn build_reports_missing_arguments() {
    let dir = fixture(".advtrc.yaml", WITH_ARGUMENTS);
    let output = run(dir.path(), &["build", "--dry-run", "-U", "bob"]);
    assert_eq!(output.status.code(), Some(1));

    let err = stderr(&output);
    assert!(err.contains("--env"), "stderr: {}", err);
    assert!(err.contains("--uri"), "stderr: {}", err);
}

#[test]
fn build_with_argument_values() {
    let dir = fixture(".advtrc.yaml", WITH_ARGUMENTS);
    let output = run(
        dir.path(),
        &[
            "build", "--dry-run", "-U", "bob", "-a", "env=production", "--pass-args",
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("NODE_ENV=production"));
    assert!(!out.contains("API_URL"));
}

#[test]
fn build_unknown_target_fails() {
    let dir = fixture(".advtrc", SINGLE_SERVICE);
    let output = run(dir.path(), &["build", "--dry-run", "-U", "bob", "nope"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("unknown build target: nope"));
}

#[test]
fn build_runs_commands() {
    let dir = fixture(
        ".advtrc",
        "services:\n  binary:\n    pre_build:\n      - touch marker\n",
    );
    let output = run(
        dir.path(),
        &["build", "-U", "bob", "--tool", "true", "--loglevel", "silent"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(dir.path().join("marker").exists());
    assert!(stdout(&output).contains("binary built in"));
}

#[test]
fn build_failure_exits_nonzero() {
    let dir = fixture(
        ".advtrc",
        "services:\n  binary:\n    pre_build:\n      - exit 4\n",
    );
    let output = run(dir.path(), &["build", "-U", "bob", "--tool", "true"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("exit 4"));
}

#[test]
fn malformed_config_reports_path() {
    let dir = fixture(".advtrc.json", "{services: {}}");
    let output = run(dir.path(), &["config"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Cannot read config file"));
}
