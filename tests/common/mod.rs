// SPDX-License-Identifier: GPL-3.0-only

//! Fakes shared by the integration tests
//!
//! None of them touch a camera, a model or a speech engine.

#![allow(dead_code)]

use object_announcer::PipelineConfig;
use object_announcer::backends::announce::{Announcement, Announcer};
use object_announcer::backends::camera::{Frame, FrameSource};
use object_announcer::detection::{BoundingBox, Detection, Detector};
use object_announcer::errors::{AcquisitionError, AcquisitionResult, AnnounceError, DetectionError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Config for fast, deterministic runs
pub fn test_config() -> PipelineConfig {
    PipelineConfig {
        detection_interval_secs: 0.0,
        min_confidence: 0.0,
        mirror: false,
        channel_capacity: 16,
        max_transient_read_failures: 3,
        stop_poll_slice_ms: 10,
        ..Default::default()
    }
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// One scripted outcome of `FrameSource::read`
#[derive(Clone)]
pub enum Step {
    Frame(Frame),
    Transient,
    Disconnected,
}

/// Counts calls made on a [`ScriptedSource`] after it moved into a pipeline
#[derive(Clone, Default)]
pub struct SourceProbe {
    pub opened: Arc<AtomicUsize>,
    pub reads: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl SourceProbe {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Frame source replaying a script, then ending (or repeating forever)
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    endless: bool,
    fail_open: bool,
    sequence: u64,
    probe: SourceProbe,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: steps.into(),
            endless: false,
            fail_open: false,
            sequence: 0,
            probe: SourceProbe::default(),
        }
    }

    /// `count` small grey frames, then end of stream
    pub fn frames(count: usize) -> Self {
        Self::new(
            (0..count)
                .map(|i| Step::Frame(Frame::solid(8, 6, [128, 128, 128], i as u64)))
                .collect(),
        )
    }

    /// Frames forever
    pub fn endless() -> Self {
        Self {
            endless: true,
            ..Self::new(Vec::new())
        }
    }

    /// A source whose device cannot be opened
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn probe(&self) -> SourceProbe {
        self.probe.clone()
    }
}

impl FrameSource for ScriptedSource {
    fn id(&self) -> String {
        "scripted".to_string()
    }

    fn open(&mut self) -> AcquisitionResult<()> {
        self.probe.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(AcquisitionError::OpenFailed {
                source_id: self.id(),
                reason: "no such device".into(),
            });
        }
        Ok(())
    }

    fn read(&mut self) -> AcquisitionResult<Frame> {
        self.probe.reads.fetch_add(1, Ordering::SeqCst);
        if self.endless {
            self.sequence += 1;
            return Ok(Frame::solid(8, 6, [64, 64, 64], self.sequence));
        }
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => Ok(frame),
            Some(Step::Transient) => Err(AcquisitionError::Transient("bad frame".into())),
            Some(Step::Disconnected) => {
                Err(AcquisitionError::Disconnected("device unplugged".into()))
            }
            None => Err(AcquisitionError::EndOfStream),
        }
    }

    fn close(&mut self) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn detection(label: &str, confidence: f32) -> Detection {
    Detection::new(label, confidence, BoundingBox::new(1.0, 1.0, 4.0, 4.0))
}

/// Detector answering from a script, then with nothing
pub struct ScriptedDetector {
    responses: VecDeque<Result<Vec<Detection>, DetectionError>>,
    latency: Duration,
    seen: Arc<Mutex<Vec<Frame>>>,
}

impl ScriptedDetector {
    pub fn new(responses: Vec<Result<Vec<Detection>, DetectionError>>) -> Self {
        Self {
            responses: responses.into(),
            latency: Duration::ZERO,
            seen: Arc::default(),
        }
    }

    /// One entry per frame, each a list of labels detected with confidence 0.9
    pub fn labels(per_frame: &[&[&str]]) -> Self {
        Self::new(
            per_frame
                .iter()
                .map(|labels| Ok(labels.iter().map(|l| detection(l, 0.9)).collect()))
                .collect(),
        )
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Frames the detector was called with
    pub fn seen(&self) -> Arc<Mutex<Vec<Frame>>> {
        Arc::clone(&self.seen)
    }
}

impl Detector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        std::thread::sleep(self.latency);
        self.seen.lock().unwrap().push(frame.clone());
        self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Detector that panics on the first frame
pub struct PanickingDetector;

impl Detector for PanickingDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, DetectionError> {
        panic!("model exploded");
    }
}

/// Announcer remembering everything it was asked to say
#[derive(Clone, Default)]
pub struct RecordingAnnouncer {
    spoken: Arc<Mutex<Vec<Announcement>>>,
}

impl RecordingAnnouncer {
    pub fn spoken(&self) -> Vec<Announcement> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Announcer for RecordingAnnouncer {
    fn announce(&mut self, announcement: &Announcement) -> Result<(), AnnounceError> {
        self.spoken.lock().unwrap().push(announcement.clone());
        Ok(())
    }
}
