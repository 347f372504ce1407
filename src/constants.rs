// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants
//!
//! Defaults for the pipeline configuration and timing values shared by the
//! worker and the drivers.

use std::time::Duration;

/// Application name used for config and log directories
pub const APP_NAME: &str = "object-announcer";

/// Configuration file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Pipeline defaults
pub mod pipeline {
    use super::Duration;

    /// Default camera source (first V4L2 device)
    pub const DEFAULT_CAMERA_SOURCE: &str = "0";

    /// Default target interval between detections, in seconds.
    /// Zero means every frame is processed as fast as possible.
    pub const DEFAULT_DETECTION_INTERVAL_SECS: f64 = 0.0;

    /// Longest accepted interval between detections, in seconds (one day)
    pub const MAX_DETECTION_INTERVAL_SECS: f64 = 86_400.0;

    /// Default language tag for announcements
    pub const DEFAULT_LANGUAGE: &str = "en";

    /// Default minimum confidence for a detection to be kept
    pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.25;

    /// Default result channel capacity (single slot: freshest result wins)
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 1;

    /// Consecutive transient read failures tolerated before the source is
    /// treated as persistently failed
    pub const DEFAULT_MAX_TRANSIENT_READ_FAILURES: u32 = 5;

    /// Longest uninterrupted sleep while pacing; bounds stop latency
    pub const DEFAULT_STOP_POLL_SLICE: Duration = Duration::from_millis(50);

    /// Pause after a transient read failure before retrying
    pub const TRANSIENT_RETRY_BACKOFF: Duration = Duration::from_millis(10);
}

/// Camera capture defaults
pub mod capture {
    /// Requested capture width for V4L2 devices
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Requested capture height for V4L2 devices
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Number of mmap buffers for V4L2 streaming
    pub const V4L2_BUFFER_COUNT: u32 = 4;

    /// Image file extensions accepted by the image sequence source
    pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp"];
}

/// Announcement defaults
pub mod announce {
    /// Default text-to-speech program
    pub const DEFAULT_SPEECH_PROGRAM: &str = "espeak-ng";

    /// Pending announcements held while the speaker is busy
    pub const BACKGROUND_QUEUE_CAPACITY: usize = 2;
}

/// Driver defaults
pub mod driver {
    use super::Duration;

    /// Bounded wait for the next result in the driver loops
    pub const RESULT_POLL_TIMEOUT: Duration = Duration::from_millis(16);

    /// Days of log files kept by the terminal viewer
    pub const LOG_RETENTION_DAYS: u64 = 7;
}
