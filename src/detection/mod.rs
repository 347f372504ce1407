// SPDX-License-Identifier: GPL-3.0-only

//! Object detection port
//!
//! The pipeline depends only on [`Detector`]. Model backends (YOLOv5,
//! YOLOv8, ...) are configurations of [`ProcessDetector`], which talks to
//! an external inference process.

pub mod process;
pub mod types;

pub use process::ProcessDetector;
pub use types::{BoundingBox, Detection, LabelSet};

use crate::backends::camera::Frame;
use crate::errors::DetectionError;

/// Something that finds labelled objects in a frame
///
/// Only the worker thread calls `detect`, one call at a time. A failure
/// never stops the pipeline; the cycle is treated as having no detections.
/// Boxes must be expressed in the coordinates of the frame passed in.
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError>;
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        (**self).detect(frame)
    }
}
