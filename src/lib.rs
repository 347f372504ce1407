// SPDX-License-Identifier: GPL-3.0-only

//! Object Announcer - spoken object detection for a live camera feed
//!
//! A worker thread samples frames, runs them through a pluggable detector,
//! and publishes annotated results to the terminal viewer while a gate
//! decides which label-sets are new enough to be spoken.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`backends`]: Frame sources (V4L2, still images) and announcers
//! - [`detection`]: Detector port and the external process detector
//! - [`pipelines`]: The detection worker, gate, pacer and result channel
//! - [`config`]: User configuration handling
//! - [`terminal`]: Terminal viewer
//!
//! # Example
//!
//! ```ignore
//! let mut pipeline = build_detection_pipeline(PipelineConfig::default())?;
//! pipeline.start()?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod detection;
pub mod errors;
pub mod logging;
pub mod pipelines;
pub mod terminal;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use errors::{AppError, AppResult, PipelineError};
pub use pipelines::detection::{DetectionPipeline, DetectionResult, Termination};
