// SPDX-License-Identifier: GPL-3.0-only

//! State shared between the worker thread and its controller

use crate::errors::PipelineError;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

/// Cooperative run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Running = 0,
    StopRequested = 1,
    Stopped = 2,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => RunState::Running,
            1 => RunState::StopRequested,
            _ => RunState::Stopped,
        }
    }
}

/// Where the worker currently is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerPhase {
    /// No worker has been started
    NotStarted = 0,
    Init = 1,
    Acquiring = 2,
    Detecting = 3,
    Publishing = 4,
    Pacing = 5,
    Terminating = 6,
    Stopped = 7,
}

impl WorkerPhase {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerPhase::NotStarted,
            1 => WorkerPhase::Init,
            2 => WorkerPhase::Acquiring,
            3 => WorkerPhase::Detecting,
            4 => WorkerPhase::Publishing,
            5 => WorkerPhase::Pacing,
            6 => WorkerPhase::Terminating,
            _ => WorkerPhase::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkerPhase::NotStarted => "not started",
            WorkerPhase::Init => "init",
            WorkerPhase::Acquiring => "acquiring",
            WorkerPhase::Detecting => "detecting",
            WorkerPhase::Publishing => "publishing",
            WorkerPhase::Pacing => "pacing",
            WorkerPhase::Terminating => "terminating",
            WorkerPhase::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a worker stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The driver asked it to stop
    Requested,
    /// The frame source ran out of frames
    EndOfStream,
    /// A fatal error
    Failed(PipelineError),
}

impl Termination {
    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Termination::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Failed(_))
    }
}

/// Counters updated by the worker
#[derive(Debug, Default)]
pub struct PipelineStats {
    cycles: AtomicU64,
    published: AtomicU64,
    dropped: AtomicU64,
    detection_failures: AtomicU64,
    transient_read_failures: AtomicU64,
    announcements: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u64,
    pub published: u64,
    pub dropped: u64,
    pub detection_failures: u64,
    pub transient_read_failures: u64,
    pub announcements: u64,
}

impl PipelineStats {
    pub(crate) fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self, dropped: usize) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_detection_failure(&self) {
        self.detection_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_transient_read_failure(&self) {
        self.transient_read_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_announcement(&self) {
        self.announcements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            detection_failures: self.detection_failures.load(Ordering::Relaxed),
            transient_read_failures: self.transient_read_failures.load(Ordering::Relaxed),
            announcements: self.announcements.load(Ordering::Relaxed),
        }
    }
}

/// Everything the controller and the worker both see
#[derive(Debug)]
pub struct SharedState {
    run_state: AtomicU8,
    phase: AtomicU8,
    termination: Mutex<Option<Termination>>,
    pub stats: PipelineStats,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            run_state: AtomicU8::new(RunState::Running as u8),
            phase: AtomicU8::new(WorkerPhase::NotStarted as u8),
            termination: Mutex::new(None),
            stats: PipelineStats::default(),
        }
    }
}

impl SharedState {
    pub fn run_state(&self) -> RunState {
        RunState::from_u8(self.run_state.load(Ordering::SeqCst))
    }

    /// Move `Running` to `StopRequested`; any other state is left alone
    pub fn request_stop(&self) {
        let _ = self.run_state.compare_exchange(
            RunState::Running as u8,
            RunState::StopRequested as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    pub fn stop_requested(&self) -> bool {
        self.run_state() != RunState::Running
    }

    pub fn phase(&self) -> WorkerPhase {
        WorkerPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub(crate) fn set_phase(&self, phase: WorkerPhase) {
        self.phase.store(phase as u8, Ordering::SeqCst);
    }

    pub fn termination(&self) -> Option<Termination> {
        self.termination
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record why the worker ended and mark it stopped
    ///
    /// The termination is visible before the run state flips, so anyone
    /// who sees `Stopped` also sees the reason.
    pub(crate) fn finish(&self, termination: Termination) {
        {
            let mut slot = self
                .termination
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            slot.get_or_insert(termination);
        }
        self.set_phase(WorkerPhase::Stopped);
        self.run_state.store(RunState::Stopped as u8, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_request_only_from_running() {
        let state = SharedState::default();
        assert_eq!(state.run_state(), RunState::Running);
        state.request_stop();
        assert_eq!(state.run_state(), RunState::StopRequested);

        state.finish(Termination::Requested);
        state.request_stop();
        assert_eq!(state.run_state(), RunState::Stopped);
    }

    #[test]
    fn test_first_termination_wins() {
        let state = SharedState::default();
        state.finish(Termination::EndOfStream);
        state.finish(Termination::Failed(PipelineError::WorkerPanicked("late".into())));
        assert_eq!(state.termination(), Some(Termination::EndOfStream));
        assert_eq!(state.phase(), WorkerPhase::Stopped);
    }

    #[test]
    fn test_stats_snapshot() {
        let stats = PipelineStats::default();
        stats.record_cycle();
        stats.record_cycle();
        stats.record_published(0);
        stats.record_published(2);
        stats.record_announcement();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.cycles, 2);
        assert_eq!(snapshot.published, 2);
        assert_eq!(snapshot.dropped, 2);
        assert_eq!(snapshot.announcements, 1);
        assert_eq!(snapshot.detection_failures, 0);
    }

    #[test]
    fn test_termination_error() {
        let failed = Termination::Failed(PipelineError::AlreadyRunning);
        assert!(failed.is_failure());
        assert_eq!(failed.error(), Some(&PipelineError::AlreadyRunning));
        assert!(Termination::Requested.error().is_none());
    }
}
