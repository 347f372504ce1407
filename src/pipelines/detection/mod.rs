// SPDX-License-Identifier: GPL-3.0-only

//! Concurrent detection pipeline
//!
//! One worker thread pulls frames, runs the detector, decides whether to
//! announce, and publishes a [`DetectionResult`] per cycle through a
//! drop-oldest channel. The driver (terminal viewer or headless loop)
//! consumes results at its own pace and controls the worker through
//! [`DetectionPipeline`].
//!
//! ```text
//!  Driver thread                         Worker thread
//! ┌───────────────────┐  start/stop   ┌───────────────────────────────┐
//! │ DetectionPipeline │ ────────────▶ │ read ▶ detect ▶ gate ▶ publish│
//! │                   │ ◀──────────── │            pace ◀─────────────┘
//! └───────────────────┘    results    └───────────────────────────────┘
//! ```

pub mod channel;
pub mod gate;
pub mod pacer;
pub mod result;
pub mod state;
mod worker;

pub use channel::{PublishOutcome, Received, ResultPublisher, ResultReceiver, result_channel};
pub use gate::{AnnouncementGate, GateDecision};
pub use result::DetectionResult;
pub use state::{PipelineStats, RunState, StatsSnapshot, Termination, WorkerPhase};

use crate::backends::announce::Announcer;
use crate::backends::camera::FrameSource;
use crate::config::PipelineConfig;
use crate::detection::{Detector, LabelSet};
use crate::errors::PipelineError;
use state::SharedState;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use worker::{Worker, panic_message};

/// Collaborators waiting to be moved into the worker
struct PendingWorker {
    source: Box<dyn FrameSource>,
    detector: Box<dyn Detector>,
    announcer: Box<dyn Announcer>,
    publisher: ResultPublisher<DetectionResult>,
}

/// Lifecycle controller for one detection worker
///
/// A pipeline runs at most one worker, once. After the worker stops the
/// pipeline cannot be restarted; build a new one instead.
///
/// # Example
///
/// ```ignore
/// let mut pipeline = DetectionPipeline::new(config, source, detector, announcer);
/// pipeline.start()?;
/// while pipeline.is_alive() {
///     if let Received::Item(result) = pipeline.results().recv_timeout(timeout) {
///         render(&result);
///     }
/// }
/// ```
pub struct DetectionPipeline {
    name: String,
    config: Arc<PipelineConfig>,
    pending: Option<PendingWorker>,
    receiver: ResultReceiver<DetectionResult>,
    gate: Arc<AnnouncementGate>,
    shared: Arc<SharedState>,
    thread_handle: Option<JoinHandle<()>>,
}

impl DetectionPipeline {
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn Detector>,
        announcer: Box<dyn Announcer>,
    ) -> Self {
        let (publisher, receiver) = result_channel(config.channel_capacity);
        Self {
            name: source.id(),
            config: Arc::new(config),
            pending: Some(PendingWorker {
                source,
                detector,
                announcer,
                publisher,
            }),
            receiver,
            gate: Arc::new(AnnouncementGate::new()),
            shared: Arc::new(SharedState::default()),
            thread_handle: None,
        }
    }

    /// Spawn the worker thread
    ///
    /// Fails with [`PipelineError::AlreadyRunning`] if a worker was started
    /// before, whether or not it is still running.
    pub fn start(&mut self) -> Result<(), PipelineError> {
        let Some(pending) = self.pending.take() else {
            return Err(PipelineError::AlreadyRunning);
        };

        info!(
            name = %self.name,
            interval = ?self.config.detection_interval(),
            language = %self.config.language,
            "Starting detection pipeline"
        );

        let worker = Worker {
            config: Arc::clone(&self.config),
            source: pending.source,
            detector: pending.detector,
            announcer: pending.announcer,
            gate: Arc::clone(&self.gate),
            publisher: pending.publisher,
            shared: Arc::clone(&self.shared),
        };

        match thread::Builder::new()
            .name("detection-worker".into())
            .spawn(move || worker.run())
        {
            Ok(handle) => {
                self.thread_handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                let err = PipelineError::SpawnFailed(e.to_string());
                self.shared.finish(Termination::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Ask the worker to stop (non-blocking)
    ///
    /// The worker notices within one detection call plus one pacing slice.
    pub fn stop(&self) {
        debug!(name = %self.name, "Requesting detection pipeline stop");
        self.shared.request_stop();
    }

    /// Whether a worker is running and has not reached `Stopped`
    pub fn is_alive(&self) -> bool {
        self.shared.run_state() != RunState::Stopped
            && self
                .thread_handle
                .as_ref()
                .map(|h| !h.is_finished())
                .unwrap_or(false)
    }

    pub fn run_state(&self) -> RunState {
        self.shared.run_state()
    }

    pub fn phase(&self) -> WorkerPhase {
        self.shared.phase()
    }

    /// Why the worker ended, once it has
    pub fn termination(&self) -> Option<Termination> {
        self.shared.termination()
    }

    /// The fatal error the worker ended with, if any
    pub fn last_error(&self) -> Option<PipelineError> {
        self.termination().and_then(|t| t.error().cloned())
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// The consumer side of the result channel
    pub fn results(&self) -> &ResultReceiver<DetectionResult> {
        &self.receiver
    }

    /// The label-set most recently announced
    pub fn last_announced(&self) -> LabelSet {
        self.gate.last_labels()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Wait for the worker thread to finish without requesting a stop
    pub fn join(&mut self) -> Option<Termination> {
        if let Some(handle) = self.thread_handle.take() {
            debug!(name = %self.name, "Waiting for detection worker to finish");
            if let Err(payload) = handle.join() {
                let reason = panic_message(payload.as_ref());
                warn!(name = %self.name, reason = %reason, "Detection worker panicked");
                self.shared
                    .finish(Termination::Failed(PipelineError::WorkerPanicked(reason)));
            } else {
                debug!(name = %self.name, "Detection worker finished");
            }
        }
        self.termination()
    }

    /// Stop the worker and wait for it
    pub fn shutdown(&mut self) -> Option<Termination> {
        self.stop();
        self.join()
    }
}

impl Drop for DetectionPipeline {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "DetectionPipeline dropped, stopping worker");
            self.shutdown();
        }
    }
}
