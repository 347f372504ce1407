// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Settings are read from a JSON file, then overridden by command-line
//! flags, then validated. Every field has a default, so a partial file (or
//! no file at all) is fine.

use crate::constants::{self, announce, pipeline};
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// External detector process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Program to run, e.g. a YOLOv8 wrapper script
    pub command: String,
    /// Arguments, e.g. the model weights to load
    pub args: Vec<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            command: "yolo-detector".to_string(),
            args: vec!["--model".to_string(), "yolov8n.pt".to_string()],
        }
    }
}

/// Spoken announcements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncerConfig {
    /// Speak announcements; when off they are only logged
    pub enabled: bool,
    /// Text-to-speech program
    pub program: String,
    /// Arguments; `{lang}` and `{text}` are substituted
    pub args: Vec<String>,
    /// Speak on a separate thread so the worker never waits for speech
    pub background: bool,
}

impl Default for AnnouncerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: announce::DEFAULT_SPEECH_PROGRAM.to_string(),
            args: vec!["-v".to_string(), "{lang}".to_string(), "{text}".to_string()],
            background: true,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Device index, `/dev/video*` path, image file or directory
    pub camera_source: String,
    /// Target seconds between detections (0 = as fast as possible)
    pub detection_interval_secs: f64,
    /// Language tag for announcements
    pub language: String,
    /// Detections below this confidence are discarded
    pub min_confidence: f32,
    /// Spoken name per detector label, e.g. `"person": "persona"`
    pub label_translations: HashMap<String, String>,
    /// Flip frames horizontally (selfie view)
    pub mirror: bool,
    /// Restart an image sequence instead of ending
    pub loop_images: bool,
    /// Results held for a slow consumer before the oldest is dropped
    pub channel_capacity: usize,
    /// Consecutive transient read failures tolerated
    pub max_transient_read_failures: u32,
    /// Longest sleep between stop checks, in milliseconds
    pub stop_poll_slice_ms: u64,
    pub detector: DetectorConfig,
    pub announcer: AnnouncerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            camera_source: pipeline::DEFAULT_CAMERA_SOURCE.to_string(),
            detection_interval_secs: pipeline::DEFAULT_DETECTION_INTERVAL_SECS,
            language: pipeline::DEFAULT_LANGUAGE.to_string(),
            min_confidence: pipeline::DEFAULT_MIN_CONFIDENCE,
            label_translations: HashMap::new(),
            mirror: true,
            loop_images: false,
            channel_capacity: pipeline::DEFAULT_CHANNEL_CAPACITY,
            max_transient_read_failures: pipeline::DEFAULT_MAX_TRANSIENT_READ_FAILURES,
            stop_poll_slice_ms: pipeline::DEFAULT_STOP_POLL_SLICE.as_millis() as u64,
            detector: DetectorConfig::default(),
            announcer: AnnouncerConfig::default(),
        }
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub camera_source: Option<String>,
    pub detection_interval_secs: Option<f64>,
    pub language: Option<String>,
    pub min_confidence: Option<f32>,
    pub mirror: Option<bool>,
    pub loop_images: Option<bool>,
    pub detector_command: Option<String>,
    pub detector_args: Option<Vec<String>>,
    pub speak: Option<bool>,
}

impl PipelineConfig {
    /// `<config_dir>/object-announcer/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(constants::APP_NAME)
                .join(constants::CONFIG_FILE_NAME)
        })
    }

    /// Read a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Read `explicit` if given, otherwise the default file if it exists,
    /// otherwise use defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        std::fs::write(path, content).map_err(write_err)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(source) = overrides.camera_source {
            self.camera_source = source;
        }
        if let Some(interval) = overrides.detection_interval_secs {
            self.detection_interval_secs = interval;
        }
        if let Some(language) = overrides.language {
            self.language = language;
        }
        if let Some(min_confidence) = overrides.min_confidence {
            self.min_confidence = min_confidence;
        }
        if let Some(mirror) = overrides.mirror {
            self.mirror = mirror;
        }
        if let Some(loop_images) = overrides.loop_images {
            self.loop_images = loop_images;
        }
        if let Some(command) = overrides.detector_command {
            self.detector.command = command;
        }
        if let Some(args) = overrides.detector_args {
            self.detector.args = args;
        }
        if let Some(speak) = overrides.speak {
            self.announcer.enabled = speak;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=pipeline::MAX_DETECTION_INTERVAL_SECS).contains(&self.detection_interval_secs)
        {
            return Err(ConfigError::Invalid {
                field: "detection_interval_secs",
                reason: format!(
                    "must be between 0 and {} seconds, got {}",
                    pipeline::MAX_DETECTION_INTERVAL_SECS,
                    self.detection_interval_secs
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::Invalid {
                field: "min_confidence",
                reason: format!("must be within [0, 1], got {}", self.min_confidence),
            });
        }
        if self.language.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "language",
                reason: "must not be empty".to_string(),
            });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "channel_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.stop_poll_slice_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "stop_poll_slice_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.camera_source.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "camera_source",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Target time between detections, clamped to the accepted range
    pub fn detection_interval(&self) -> Duration {
        if self.detection_interval_secs.is_nan() {
            return Duration::ZERO;
        }
        let secs = self
            .detection_interval_secs
            .clamp(0.0, pipeline::MAX_DETECTION_INTERVAL_SECS);
        Duration::from_secs_f64(secs)
    }

    /// Longest uninterrupted sleep while pacing
    pub fn stop_poll_slice(&self) -> Duration {
        Duration::from_millis(self.stop_poll_slice_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detection_interval(), Duration::ZERO);
        assert_eq!(config.stop_poll_slice(), pipeline::DEFAULT_STOP_POLL_SLICE);
    }

    #[test]
    fn test_negative_interval_rejected() {
        let config = PipelineConfig {
            detection_interval_secs: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "detection_interval_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_nan_interval_rejected() {
        let config = PipelineConfig {
            detection_interval_secs: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.detection_interval(), Duration::ZERO);
    }

    #[test]
    fn test_huge_interval_rejected_and_clamped() {
        for secs in [1e19, 1e20, f64::INFINITY] {
            let config = PipelineConfig {
                detection_interval_secs: secs,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid {
                    field: "detection_interval_secs",
                    ..
                })
            ));
            assert_eq!(
                config.detection_interval(),
                Duration::from_secs_f64(pipeline::MAX_DETECTION_INTERVAL_SECS)
            );
        }
    }

    #[test]
    fn test_one_day_interval_accepted() {
        let config = PipelineConfig {
            detection_interval_secs: pipeline::MAX_DETECTION_INTERVAL_SECS,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(config.detection_interval(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = PipelineConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_replace_only_given_values() {
        let mut config = PipelineConfig::default();
        config.apply_overrides(ConfigOverrides {
            language: Some("es".into()),
            detection_interval_secs: Some(5.0),
            speak: Some(false),
            ..Default::default()
        });
        assert_eq!(config.language, "es");
        assert_eq!(config.detection_interval(), Duration::from_secs(5));
        assert!(!config.announcer.enabled);
        assert_eq!(config.camera_source, pipeline::DEFAULT_CAMERA_SOURCE);
    }
}
