// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the detection pipeline and its collaborators
//!
//! Collaborators report their own error types. [`PipelineError`] is the
//! error a worker terminates with, wrapping acquisition failures; it is
//! `Clone` so the controller can hand it to the driver after the worker
//! thread has gone. The binary sees everything through [`AppError`].

use thiserror::Error;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result type for frame acquisition
pub type AcquisitionResult<T> = Result<T, AcquisitionError>;

/// Main application error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("{0}")]
    Other(String),
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

/// Errors raised by a frame source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    /// The source could not be opened at all
    #[error("failed to open {source_id}: {reason}")]
    OpenFailed { source_id: String, reason: String },

    /// One bad read; the next read may succeed
    #[error("transient read failure: {0}")]
    Transient(String),

    /// The source is unusable until recreated (device unplugged, closed)
    #[error("source unavailable: {0}")]
    Disconnected(String),

    /// The source has no more frames
    #[error("end of stream")]
    EndOfStream,

    /// `read` called before `open` or after `close`
    #[error("source is not open")]
    NotOpen,
}

impl AcquisitionError {
    /// Whether retrying the read on the next cycle makes sense
    pub fn is_transient(&self) -> bool {
        matches!(self, AcquisitionError::Transient(_))
    }
}

/// Errors raised by a detector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    /// The detector ran but could not produce a result for this frame
    #[error("detection failed: {0}")]
    Failed(String),

    /// The detector backend is not running (process died, model missing)
    #[error("detector unavailable: {0}")]
    Unavailable(String),

    /// The detector answered with something that could not be parsed
    #[error("malformed detector output: {0}")]
    MalformedOutput(String),
}

/// Errors raised by an announcer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnnounceError {
    #[error("failed to start speech command {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("speech command {program} exited with {status}")]
    CommandFailed { program: String, status: String },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Errors surfaced by the detection pipeline itself
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// `start()` called on a pipeline that already started a worker
    #[error("pipeline worker already started")]
    AlreadyRunning,

    /// The frame source could not be opened when the worker started
    #[error("acquisition open failed: {0}")]
    AcquisitionOpenFailed(AcquisitionError),

    /// The frame source failed persistently while running
    #[error("acquisition read failed: {0}")]
    AcquisitionReadFailed(AcquisitionError),

    /// The worker thread could not be spawned
    #[error("failed to spawn worker thread: {0}")]
    SpawnFailed(String),

    /// The worker thread panicked
    #[error("worker thread panicked: {0}")]
    WorkerPanicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_transient() {
        assert!(AcquisitionError::Transient("bad frame".into()).is_transient());
        assert!(!AcquisitionError::EndOfStream.is_transient());
        assert!(!AcquisitionError::Disconnected("gone".into()).is_transient());
    }

    #[test]
    fn test_pipeline_error_display_keeps_cause() {
        let err = PipelineError::AcquisitionOpenFailed(AcquisitionError::OpenFailed {
            source_id: "/dev/video9".into(),
            reason: "No such file or directory".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("/dev/video9"));
        assert!(msg.contains("No such file"));
    }
}
