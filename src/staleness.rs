//! # Staleness Tracker
//!
//! Decides whether a previously committed strategy is still valid when a new
//! upstream generation marker is observed. Markers are opaque and compared
//! only for equality; the tracker never interprets them.
//!
//! Two distinct invalidation shapes exist and must never be conflated:
//!
//! - **Annotated clear** — the marker changed. The strategy is dropped and a
//!   single synthetic "invalidated" entry is appended to the log; history is
//!   otherwise preserved so the audit trail shows *that* an invalidation
//!   happened.
//! - **Full wipe** — a baseline-only payload arrived (no pending generation,
//!   not confirmed, no preview attached). Strategy and the entire log are
//!   cleared; this is a reset to a clean slate, not an annotated event.

use crate::model::{ChatEntry, GenerationMarker, Strategy};

/// Outcome of observing a new generation marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// Nothing invalidated: first observation, or marker unchanged.
    None,
    /// Marker changed: strategy cleared, one synthetic log entry appended.
    Annotated,
    /// Baseline-only payload: strategy and log fully cleared.
    FullReset,
}

/// Synthetic log entry appended on an annotated invalidation.
pub const INVALIDATED_NOTE: &str =
    "Layout strategy invalidated: the source document changed upstream.";

/// Tracks the last observed marker alongside the strategy and audit log it
/// guards.
#[derive(Debug, Clone, Default)]
pub struct StalenessTracker {
    previous_marker: Option<GenerationMarker>,
    strategy: Option<Strategy>,
    log: Vec<ChatEntry>,
}

impl StalenessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a new (marker, baseline-only) pair and apply the transition.
    /// The marker is recorded in every branch.
    pub fn observe(&mut self, marker: GenerationMarker, is_baseline_only: bool) -> Invalidation {
        let outcome = match &self.previous_marker {
            None => Invalidation::None,
            Some(_) if is_baseline_only => {
                // Full wipe wins even when the marker also changed: a
                // baseline payload means nothing downstream is worth keeping.
                self.strategy = None;
                self.log.clear();
                Invalidation::FullReset
            }
            Some(prev) if *prev == marker => Invalidation::None,
            Some(_) => {
                self.strategy = None;
                self.log.push(ChatEntry::model(INVALIDATED_NOTE));
                Invalidation::Annotated
            }
        };
        self.previous_marker = Some(marker);
        outcome
    }

    /// Commit a strategy for the currently recorded marker.
    pub fn commit(&mut self, strategy: Strategy) {
        self.strategy = Some(strategy);
    }

    pub fn strategy(&self) -> Option<&Strategy> {
        self.strategy.as_ref()
    }

    pub fn log(&self) -> &[ChatEntry] {
        &self.log
    }

    /// Append an audit entry to the guarded log.
    pub fn push_log(&mut self, entry: ChatEntry) {
        self.log.push(entry);
    }

    /// Drop strategy, log, and the recorded marker.
    pub fn clear(&mut self) {
        self.previous_marker = None;
        self.strategy = None;
        self.log.clear();
    }
}
