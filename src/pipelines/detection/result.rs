// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::announce::Announcement;
use crate::backends::camera::Frame;
use crate::detection::{Detection, LabelSet};
use std::time::Duration;

/// Output of one worker cycle
///
/// Boxes are in the coordinates of `frame`, which is already mirrored when
/// mirroring is enabled, so consumers draw them as they are.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Worker cycle number, starting at 1; gaps mean results were dropped
    pub sequence: u64,
    pub frame: Frame,
    pub detections: Vec<Detection>,
    /// Set when this cycle triggered an announcement
    pub announcement: Option<Announcement>,
    /// Time from acquisition start to publication
    pub cycle_duration: Duration,
}

impl DetectionResult {
    pub fn labels(&self) -> LabelSet {
        LabelSet::from_detections(&self.detections)
    }
}
