// SPDX-License-Identifier: GPL-3.0-only

//! Announcement gate
//!
//! Decides whether a cycle's label-set is worth saying out loud. The gate
//! remembers the last announced set and suppresses repeats of it for as
//! long as the same set keeps being detected. A cycle with no detections
//! ends the streak without forgetting the set, so the same objects coming
//! back into view are announced again.
//!
//! ```text
//!            L empty                     L != last
//!   ┌──────────────────────┐     ┌──────────────────────┐
//!   ▼                      │     │                      ▼
//! ┌──────┐  L non-empty  ┌─┴─────┴──┐  L == last   (Suppressed)
//! │ Idle │ ────────────▶ │ Announced │ ───────────▶ stays Announced
//! └──────┘   (Announce)  └───────────┘
//! ```

use crate::detection::LabelSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Outcome of feeding one cycle's labels to the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// New label-set: announce it
    Announce(LabelSet),
    /// Same labels as the previous announcement
    Suppressed,
    /// Nothing was detected
    NoSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GatePhase {
    Idle,
    Announced,
}

#[derive(Debug)]
struct GateState {
    phase: GatePhase,
    last_labels: LabelSet,
}

/// Mutex-protected announcement state machine
#[derive(Debug)]
pub struct AnnouncementGate {
    state: Mutex<GateState>,
}

impl Default for AnnouncementGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnouncementGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                phase: GatePhase::Idle,
                last_labels: LabelSet::new(),
            }),
        }
    }

    // The state is a set and a flag; a panic elsewhere cannot leave it torn
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed one cycle's label-set
    ///
    /// The state is updated before this returns, so a slow announcement
    /// cannot race with the next cycle.
    pub fn evaluate(&self, labels: &LabelSet) -> GateDecision {
        let mut state = self.lock();

        if labels.is_empty() {
            state.phase = GatePhase::Idle;
            return GateDecision::NoSignal;
        }

        if state.phase == GatePhase::Announced && state.last_labels == *labels {
            debug!(labels = %labels, "Announcement suppressed");
            return GateDecision::Suppressed;
        }

        state.last_labels = labels.clone();
        state.phase = GatePhase::Announced;
        GateDecision::Announce(labels.clone())
    }

    /// The most recently announced label-set (empty before the first one)
    pub fn last_labels(&self) -> LabelSet {
        self.lock().last_labels.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(labels: &[&str]) -> LabelSet {
        labels.iter().copied().collect()
    }

    #[test]
    fn test_sequence_with_silent_cycle() {
        let gate = AnnouncementGate::new();
        let decisions: Vec<_> = [
            set(&["cat"]),
            set(&["cat"]),
            set(&["dog"]),
            set(&[]),
            set(&["dog"]),
        ]
        .iter()
        .map(|labels| gate.evaluate(labels))
        .collect();

        assert_eq!(
            decisions,
            vec![
                GateDecision::Announce(set(&["cat"])),
                GateDecision::Suppressed,
                GateDecision::Announce(set(&["dog"])),
                GateDecision::NoSignal,
                GateDecision::Announce(set(&["dog"])),
            ]
        );
    }

    #[test]
    fn test_order_independent_suppression() {
        let gate = AnnouncementGate::new();
        let first: LabelSet = ["cat", "dog"].into_iter().collect();
        let second: LabelSet = ["dog", "cat"].into_iter().collect();
        assert!(matches!(gate.evaluate(&first), GateDecision::Announce(_)));
        assert_eq!(gate.evaluate(&second), GateDecision::Suppressed);
    }

    #[test]
    fn test_empty_set_keeps_last_labels() {
        let gate = AnnouncementGate::new();
        assert_eq!(gate.evaluate(&set(&[])), GateDecision::NoSignal);
        assert!(gate.last_labels().is_empty());

        gate.evaluate(&set(&["cup"]));
        gate.evaluate(&set(&[]));
        assert_eq!(gate.last_labels(), set(&["cup"]));
    }

    #[test]
    fn test_superset_is_announced() {
        let gate = AnnouncementGate::new();
        gate.evaluate(&set(&["person"]));
        assert_eq!(
            gate.evaluate(&set(&["person", "dog"])),
            GateDecision::Announce(set(&["dog", "person"]))
        );
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let gate = std::sync::Arc::new(AnnouncementGate::new());
        gate.evaluate(&set(&["cat"]));

        let poisoner = std::sync::Arc::clone(&gate);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the gate");
        })
        .join();

        assert_eq!(gate.evaluate(&set(&["cat"])), GateDecision::Suppressed);
    }
}
