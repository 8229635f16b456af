// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use super::*;
use serde_json::json;
use tempfile::TempDir;

const MINIMAL: &str = "\
engine:
  type: mock
encoders: []
decoder:
  type: pptx
";

#[test]
fn loads_default_file_from_config_dir() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bisheng.yaml"), MINIMAL).unwrap();

    let runner = Runner::load(Some(dir.path()), None).unwrap();

    assert_eq!(runner.config().engine, json!({ "type": "mock" }));
    assert!(runner.config().encoders.is_empty());
    assert!(runner.capture().is_none());
}

#[test]
fn custom_file_name_is_honored() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("deck-a.yaml"), MINIMAL).unwrap();

    let builder = RunnerBuilder::new()
        .config_dir(Some(dir.path()))
        .config_file(Some("deck-a.yaml"));
    assert_eq!(builder.resolved_config_path(), dir.path().join("deck-a.yaml"));
    assert!(builder.build().is_ok());
}

#[test]
fn missing_config_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = Runner::load(Some(dir.path()), None).unwrap_err();
    assert!(
        matches!(err, RunnerBuildError::Config(ConfigError::Io { .. })),
        "{err}"
    );
}

#[test]
fn explicit_config_skips_the_filesystem() {
    let config = RunConfig {
        engine: json!({ "type": "mock" }),
        encoders: vec![],
        decoder: json!({ "type": "pptx" }),
    };
    let runner = RunnerBuilder::new()
        .config_dir(Some(Path::new("/does/not/exist")))
        .config(config.clone())
        .build()
        .unwrap();
    assert_eq!(runner.config(), &config);
}

#[test]
fn capture_file_is_created() {
    let dir = TempDir::new().unwrap();
    let capture = dir.path().join("capture.jsonl");
    std::fs::write(dir.path().join("bisheng.yaml"), MINIMAL).unwrap();

    let runner = RunnerBuilder::new()
        .config_dir(Some(dir.path()))
        .capture_file(Some(capture.as_path()))
        .build()
        .unwrap();

    assert!(runner.capture().is_some());
    assert!(capture.exists());
}

#[test]
fn unwritable_capture_file_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("bisheng.yaml"), MINIMAL).unwrap();

    let err = RunnerBuilder::new()
        .config_dir(Some(dir.path()))
        .capture_file(Some(dir.path().join("missing").join("capture.jsonl").as_path()))
        .build()
        .unwrap_err();
    assert!(matches!(err, RunnerBuildError::CaptureFile { .. }), "{err}");
}
