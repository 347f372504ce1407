// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use object_announcer::PipelineConfig;
use object_announcer::errors::ConfigError;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = PipelineConfig::default();

    // Check sensible defaults
    assert!(config.mirror, "Mirroring should be enabled by default");
    assert_eq!(config.camera_source, "0");
    assert_eq!(config.language, "en");
    assert_eq!(config.channel_capacity, 1);
    assert!(config.announcer.enabled);
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "camera_source": "/dev/video2",
            "detection_interval_secs": 5,
            "label_translations": { "person": "persona" },
            "announcer": { "background": false }
        }"#,
    )
    .unwrap();

    let config = PipelineConfig::load(&path).unwrap();
    assert_eq!(config.camera_source, "/dev/video2");
    assert_eq!(config.detection_interval(), Duration::from_secs(5));
    assert_eq!(config.label_translations["person"], "persona");
    assert!(!config.announcer.background);
    // Untouched fields fall back to defaults
    assert_eq!(config.announcer.program, "espeak-ng");
    assert_eq!(config.language, "en");
    assert!(config.validate().is_ok());
}

#[test]
fn test_save_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = PipelineConfig::default();
    config.language = "es".into();
    config.detector.args = vec!["--model".into(), "yolov5s.pt".into()];
    config.save(&path).unwrap();

    assert_eq!(PipelineConfig::load(&path).unwrap(), config);
}

#[test]
fn test_invalid_json_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = PipelineConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("config.json"));
}

#[test]
fn test_explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.json");
    assert!(matches!(
        PipelineConfig::load_or_default(Some(&missing)),
        Err(ConfigError::Read { .. })
    ));
}

#[test]
fn test_out_of_range_confidence_rejected() {
    let config = PipelineConfig {
        min_confidence: 1.5,
        ..Default::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Invalid {
            field: "min_confidence",
            ..
        })
    ));
}
