//! Tests for error types

use std::error::Error as _;
use std::path::PathBuf;

use trueno_runner::config::ExperimentConfig;
use trueno_runner::error::RunStage;
use trueno_runner::Error;

#[test]
fn test_configuration_error() {
    let error = Error::Configuration("--gpu and --nrv".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Configuration error"));
    assert!(error_str.contains("--gpu and --nrv"));
}

#[test]
fn test_description_error_names_file() {
    let error = ExperimentConfig::load("/nonexistent/alexnet.yaml").unwrap_err();
    assert!(matches!(error, Error::Description { .. }));
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid experiment description"));
    assert!(error_str.contains("alexnet.yaml"));
}

#[test]
fn test_description_error_for_bad_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "model: {num_epochs: many}\n").unwrap();
    let error = ExperimentConfig::load(&path).unwrap_err();
    assert!(matches!(error, Error::Description { .. }));
}

#[test]
fn test_experiment_error_keeps_source() {
    let error = Error::experiment(RunStage::Initialize, std::io::Error::other("no device"));
    let error_str = format!("{error}");
    assert!(error_str.contains("during initialize"));
    assert!(error_str.contains("no device"));
    assert_eq!(error.source().unwrap().to_string(), "no device");
}

#[test]
fn test_recording_error() {
    let error = Error::Recording {
        path: PathBuf::from("/readonly/history.tsv"),
        source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Failed to record metrics"));
    assert!(error_str.contains("/readonly/history.tsv"));
    assert!(error_str.contains("printed to stdout"));
}

#[test]
fn test_store_error() {
    let error = Error::Store("row 3: bad metrics column".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Store error"));
    assert!(error_str.contains("row 3"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_yaml_error_conversion() {
    let error = ExperimentConfig::from_yaml("metrics: [not, a, mapping]").unwrap_err();
    assert!(matches!(error, Error::Yaml(_)));
    assert!(format!("{error}").contains("YAML error"));
}

#[test]
fn test_run_stage_display() {
    assert_eq!(RunStage::Initialize.to_string(), "initialize");
    assert_eq!(RunStage::Run.to_string(), "run");
}
