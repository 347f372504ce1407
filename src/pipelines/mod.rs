// SPDX-License-Identifier: GPL-3.0-only

//! Processing pipelines
//!
//! - [`detection`]: the threaded acquire → detect → announce → publish loop
//!
//! [`build_detection_pipeline`] wires the configured collaborators (camera
//! or image source, detector process, speech or log announcer) into a
//! pipeline ready to start.

pub mod detection;

pub use detection::{DetectionPipeline, DetectionResult};

use crate::backends::announce::{Announcer, BackgroundAnnouncer, LogAnnouncer, SpeechAnnouncer};
use crate::backends::camera::CameraSource;
use crate::config::PipelineConfig;
use crate::detection::ProcessDetector;
use crate::errors::AppResult;
use tracing::info;

/// Build a pipeline from validated configuration
pub fn build_detection_pipeline(config: PipelineConfig) -> AppResult<DetectionPipeline> {
    config.validate()?;

    let source = CameraSource::parse(&config.camera_source);
    info!(source = %source, "Using frame source");
    let source = source.into_frame_source(config.loop_images);

    let detector = ProcessDetector::new(
        config.detector.command.clone(),
        config.detector.args.clone(),
    );

    let announcer: Box<dyn Announcer> = if config.announcer.enabled {
        let speech = SpeechAnnouncer::new(
            config.announcer.program.clone(),
            config.announcer.args.clone(),
        );
        if config.announcer.background {
            Box::new(BackgroundAnnouncer::spawn(speech)?)
        } else {
            Box::new(speech)
        }
    } else {
        Box::new(LogAnnouncer)
    };

    Ok(DetectionPipeline::new(
        config,
        source,
        Box::new(detector),
        announcer,
    ))
}
