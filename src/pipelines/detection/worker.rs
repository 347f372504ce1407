// SPDX-License-Identifier: GPL-3.0-only

//! The detection loop
//!
//! ```text
//! Init ──▶ Acquiring ──▶ Detecting ──▶ Publishing ──▶ Pacing ─┐
//!  │           ▲  │                        │                  │
//!  │           └──┼────────────────────────┼──────────────────┘
//!  ▼              ▼                        ▼
//! Terminating ◀── failure / end of stream / stop requested
//!  │
//!  ▼
//! Stopped
//! ```

use super::channel::{PublishOutcome, ResultPublisher};
use super::gate::{AnnouncementGate, GateDecision};
use super::pacer::{next_delay, sleep_interruptible};
use super::result::DetectionResult;
use super::state::{SharedState, Termination, WorkerPhase};
use crate::backends::announce::{Announcement, Announcer};
use crate::backends::camera::FrameSource;
use crate::config::PipelineConfig;
use crate::constants::pipeline::TRANSIENT_RETRY_BACKOFF;
use crate::detection::{Detector, LabelSet};
use crate::errors::{AcquisitionError, PipelineError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Text of a panic payload, when it carries one
pub(super) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Everything one worker thread owns
pub(crate) struct Worker {
    pub config: Arc<PipelineConfig>,
    pub source: Box<dyn FrameSource>,
    pub detector: Box<dyn Detector>,
    pub announcer: Box<dyn Announcer>,
    pub gate: Arc<AnnouncementGate>,
    pub publisher: ResultPublisher<DetectionResult>,
    pub shared: Arc<SharedState>,
}

impl Worker {
    /// Run until stopped, exhausted or failed; the source is closed on every
    /// path, including a panicking collaborator
    pub fn run(mut self) {
        let shared = Arc::clone(&self.shared);
        let source_id = self.source.id();

        shared.set_phase(WorkerPhase::Init);
        info!(source = %source_id, "Detection worker started");

        let termination = match panic::catch_unwind(AssertUnwindSafe(|| self.open_and_run()))
        {
            Ok(termination) => termination,
            Err(payload) => Termination::Failed(PipelineError::WorkerPanicked(panic_message(
                payload.as_ref(),
            ))),
        };

        shared.set_phase(WorkerPhase::Terminating);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| self.source.close())) {
            warn!(
                source = %source_id,
                reason = %panic_message(payload.as_ref()),
                "Frame source panicked while closing"
            );
        }

        match &termination {
            Termination::Requested => info!(source = %source_id, "Detection worker stopped"),
            Termination::EndOfStream => info!(source = %source_id, "Frame source exhausted"),
            Termination::Failed(e) => {
                error!(source = %source_id, error = %e, "Detection worker failed")
            }
        }
        shared.finish(termination);
    }

    fn open_and_run(&mut self) -> Termination {
        match self.source.open() {
            Ok(()) => self.run_loop(),
            Err(e) => {
                error!(source = %self.source.id(), error = %e, "Failed to open frame source");
                Termination::Failed(PipelineError::AcquisitionOpenFailed(e))
            }
        }
    }

    fn run_loop(&mut self) -> Termination {
        let interval = self.config.detection_interval();
        let slice = self.config.stop_poll_slice();
        let max_transient = self.config.max_transient_read_failures;
        let mut cycle: u64 = 0;
        let mut transient_failures: u32 = 0;

        loop {
            if self.shared.stop_requested() {
                return Termination::Requested;
            }

            let cycle_start = Instant::now();
            self.shared.set_phase(WorkerPhase::Acquiring);

            let frame = match self.source.read() {
                Ok(frame) => {
                    transient_failures = 0;
                    frame
                }
                Err(AcquisitionError::EndOfStream) => return Termination::EndOfStream,
                Err(e) if e.is_transient() => {
                    transient_failures += 1;
                    self.shared.stats.record_transient_read_failure();
                    if transient_failures > max_transient {
                        return Termination::Failed(PipelineError::AcquisitionReadFailed(e));
                    }
                    warn!(
                        attempt = transient_failures,
                        max = max_transient,
                        error = %e,
                        "Transient read failure, retrying"
                    );
                    sleep_interruptible(TRANSIENT_RETRY_BACKOFF, slice, || {
                        self.shared.stop_requested()
                    });
                    continue;
                }
                Err(e) => return Termination::Failed(PipelineError::AcquisitionReadFailed(e)),
            };

            let frame = if self.config.mirror {
                frame.mirrored()
            } else {
                frame
            };

            cycle += 1;
            self.shared.stats.record_cycle();

            self.shared.set_phase(WorkerPhase::Detecting);
            let detections = match self.detector.detect(&frame) {
                Ok(detections) => detections
                    .into_iter()
                    .filter(|d| d.confidence >= self.config.min_confidence)
                    .collect(),
                Err(e) => {
                    self.shared.stats.record_detection_failure();
                    warn!(cycle, error = %e, "Detection failed, continuing with no detections");
                    Vec::new()
                }
            };

            self.shared.set_phase(WorkerPhase::Publishing);
            let labels = LabelSet::from_detections(&detections);
            let announcement = self.announce(cycle, &labels);

            let result = DetectionResult {
                sequence: cycle,
                frame,
                detections,
                announcement,
                cycle_duration: cycle_start.elapsed(),
            };
            let dropped = match self.publisher.publish(result) {
                PublishOutcome::Delivered => 0,
                PublishOutcome::DroppedOldest(n) => {
                    debug!(cycle, dropped = n, "Consumer behind, dropped oldest results");
                    n
                }
            };
            self.shared.stats.record_published(dropped);

            if self.shared.stop_requested() {
                return Termination::Requested;
            }

            self.shared.set_phase(WorkerPhase::Pacing);
            let delay = next_delay(interval, cycle_start.elapsed());
            if !sleep_interruptible(delay, slice, || self.shared.stop_requested()) {
                return Termination::Requested;
            }
        }
    }

    /// Feed the gate and dispatch if it says so
    fn announce(&mut self, cycle: u64, labels: &LabelSet) -> Option<Announcement> {
        let GateDecision::Announce(labels) = self.gate.evaluate(labels) else {
            return None;
        };

        let announcement = Announcement::new(
            labels,
            &self.config.label_translations,
            self.config.language.as_str(),
        );
        self.shared.stats.record_announcement();
        info!(cycle, labels = %announcement.labels, "New objects detected");

        if let Err(e) = self.announcer.announce(&announcement) {
            warn!(cycle, error = %e, "Announcement failed");
        }
        Some(announcement)
    }
}
