//! Tests for loading the JSON configuration file
//!
//! These tests verify:
//! - Keys present in the file override the defaults
//! - Missing keys keep their defaults
//! - A missing file is reported as missing input

use crashsift_core::config::{DEFAULT_TOP_K, DEFAULT_WINDOW_HALF_WIDTH};
use crashsift_core::{CoreConfig, FilterLogic, ThresholdPair, UnknownLabelPolicy};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_file_parsing() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config_path = dir.path().join("crashsift.json");

    let config_content = r#"{
        "annotation_file": "/data/Crash-1500.txt",
        "tensor_dir": "/data/vgg16_features",
        "judgement_file": "/data/judgements.json",
        "output_dir": "/data/threshold_analysis",
        "reference_percentile": 90.0,
        "f1_logic": "AND",
        "unknown_label_policy": "treat_as_negative",
        "count_sweep": {
            "complexity_min": 5,
            "complexity_max": 7,
            "dynamic_start": 0.6,
            "dynamic_stop": 0.8,
            "dynamic_step": 0.1
        },
        "baseline_thresholds": {"complexity": 5, "dynamic": 0.9}
    }"#;
    fs::write(&config_path, config_content)?;

    let config = CoreConfig::from_json_file(&config_path)?;

    assert_eq!(config.annotation_file, PathBuf::from("/data/Crash-1500.txt"));
    assert_eq!(config.judgement_file, Some(PathBuf::from("/data/judgements.json")));
    assert_eq!(config.reference_percentile, 90.0);
    assert_eq!(config.f1_logic, FilterLogic::And);
    assert_eq!(config.unknown_label_policy, UnknownLabelPolicy::TreatAsNegative);
    assert_eq!(config.count_sweep.complexity_max, 7);
    assert_eq!(config.baseline_thresholds, ThresholdPair::new(5, 0.9));

    // Defaults for keys not in the file
    assert_eq!(config.window_half_width, DEFAULT_WINDOW_HALF_WIDTH);
    assert_eq!(config.top_k, DEFAULT_TOP_K);
    assert!(config.log_dir.is_none());

    config.validate()?;
    Ok(())
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    let err = CoreConfig::from_json_file(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.is_data_not_found());
}

#[test]
fn test_invalid_values_fail_validation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let config_path = dir.path().join("bad.json");
    fs::write(&config_path, r#"{"reference_percentile": 0.0}"#)?;

    let config = CoreConfig::from_json_file(&config_path)?;
    assert!(config.validate().is_err());
    Ok(())
}
