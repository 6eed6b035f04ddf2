//! # Pipeline Instances
//!
//! One editing unit hosts several independent target-container instances;
//! each owns a disjoint slice of derived state keyed by its index, so no
//! locking is needed between them. A pipeline run for one instance is
//! sequential — scan, transform, call the external generator, compose,
//! render — with the generator call as the only suspension point.
//!
//! Runs are not re-entrant. The cooperative convention (disable the trigger
//! while a run is in flight) is made strict here with an explicit per-
//! instance in-flight flag, and every run is tagged with a run id so that a
//! response arriving after a newer run began is discarded rather than
//! committed.

use std::time::{Duration, Instant};

use image::RgbaImage;
use tracing::warn;

use crate::error::ReframeError;
use crate::model::{ChatEntry, DerivedGeometry, GenerationMarker, GeometricModel, Strategy};
use crate::registry::{GraphRegistry, SlotPayload};
use crate::rules::RuleScopes;
use crate::staleness::{Invalidation, StalenessTracker};

/// Fixed delay before a secondary preview request follows a committed
/// strategy.
pub const PREVIEW_DEBOUNCE: Duration = Duration::from_millis(800);

/// Monotonic per-instance run tag. A completion whose id is not the latest
/// is stale and must be dropped.
pub type RunId = u64;

/// The external strategy generator: consumes the geometric model, the
/// effective ruleset, and an optional audit render, and returns layout
/// overrides. Network-bound and fallible; a failure must leave any prior
/// committed strategy untouched.
pub trait StrategyGenerator {
    fn generate(
        &mut self,
        model: &GeometricModel,
        ruleset: &[String],
        visual_context: Option<&RgbaImage>,
    ) -> Result<Strategy, String>;
}

/// A cancellable single-slot timer. Arming replaces any pending deadline —
/// requests are never queued, the newest one wins.
#[derive(Debug, Clone)]
pub struct PreviewDebounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl PreviewDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Schedule (or reschedule) the deadline at `now + delay`, cancelling
    /// any pending one.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// True at most once per arming, once the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Per-instance pipeline state. The exposed surface is the chat history,
/// the committed strategy, and the muted flag; the rest is run bookkeeping.
#[derive(Debug)]
pub struct Instance {
    index: usize,
    muted: bool,
    tracker: StalenessTracker,
    in_flight: bool,
    latest_run: RunId,
    preview: PreviewDebounce,
}

impl Instance {
    pub fn new(index: usize) -> Self {
        Self::with_preview_delay(index, PREVIEW_DEBOUNCE)
    }

    pub fn with_preview_delay(index: usize, delay: Duration) -> Self {
        Self {
            index,
            muted: false,
            tracker: StalenessTracker::new(),
            in_flight: false,
            latest_run: 0,
            preview: PreviewDebounce::new(delay),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// The output slot this instance publishes derived geometry to.
    pub fn output_slot(&self) -> String {
        format!("derived-{}", self.index)
    }

    /// The output slot this instance publishes its annotated model to.
    pub fn model_slot(&self) -> String {
        format!("model-{}", self.index)
    }

    // ── Exposed state ──────────────────────────────────────────────

    pub fn chat_history(&self) -> &[ChatEntry] {
        self.tracker.log()
    }

    pub fn current_strategy(&self) -> Option<&Strategy> {
        self.tracker.strategy()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn is_run_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn preview(&mut self) -> &mut PreviewDebounce {
        &mut self.preview
    }

    // ── Run lifecycle ──────────────────────────────────────────────

    /// Whether the trigger should be enabled. A missing model is not an
    /// error, it is a disabled trigger; same for an in-flight run.
    pub fn can_run(&self, model: Option<&GeometricModel>) -> bool {
        model.is_some() && !self.in_flight
    }

    /// Start a run: sets the in-flight flag, tags the run, and records the
    /// user's request in the history.
    pub fn begin_run(&mut self, request: &str) -> Result<RunId, ReframeError> {
        if self.in_flight {
            return Err(ReframeError::RunInFlight);
        }
        self.in_flight = true;
        self.latest_run += 1;
        self.tracker.push_log(ChatEntry::user(request));
        Ok(self.latest_run)
    }

    /// Complete a run with the generator's response.
    ///
    /// A stale run id (a newer run has begun since) discards the response
    /// without touching committed state or the newer run's in-flight flag.
    /// A generator failure clears the flag, logs a visible error entry, and
    /// leaves any previously committed strategy untouched. A success
    /// commits the strategy and arms the preview debounce.
    pub fn complete_run(&mut self, run_id: RunId, result: Result<Strategy, String>) {
        if run_id != self.latest_run {
            warn!(
                instance = self.index,
                run_id, latest = self.latest_run, "discarding stale generator response"
            );
            return;
        }
        self.in_flight = false;
        match result {
            Ok(strategy) => {
                self.tracker.push_log(ChatEntry::model(strategy.reasoning.clone()));
                self.tracker.commit(strategy);
                self.preview.arm(Instant::now());
            }
            Err(msg) => {
                warn!(instance = self.index, error = %msg, "strategy generation failed");
                self.tracker
                    .push_log(ChatEntry::model(format!("Strategy generation failed: {}", msg)));
            }
        }
    }

    /// Run the full generator round-trip synchronously. A generator failure
    /// is cleaned up at this boundary — logged, visible error entry
    /// appended, in-flight flag cleared, prior committed strategy left
    /// untouched — and then surfaced as
    /// [`ReframeError::GeneratorError`]. A re-entrant trigger surfaces as
    /// [`ReframeError::RunInFlight`] before any state changes.
    pub fn run(
        &mut self,
        generator: &mut dyn StrategyGenerator,
        model: &GeometricModel,
        scopes: &RuleScopes,
        target_name: &str,
        visual_context: Option<&RgbaImage>,
        request: &str,
    ) -> Result<Option<&Strategy>, ReframeError> {
        let run_id = self.begin_run(request)?;
        let ruleset = scopes.effective_ruleset(target_name);
        match generator.generate(model, &ruleset, visual_context) {
            Ok(strategy) => {
                self.complete_run(run_id, Ok(strategy));
                Ok(self.current_strategy())
            }
            Err(msg) => {
                self.complete_run(run_id, Err(msg.clone()));
                Err(ReframeError::GeneratorError(msg))
            }
        }
    }

    // ── Upstream change ────────────────────────────────────────────

    /// Observe a new upstream generation marker. An invalidation of either
    /// shape also cancels any pending preview request — the strategy it
    /// would have previewed is gone.
    pub fn observe_generation(
        &mut self,
        marker: GenerationMarker,
        is_baseline_only: bool,
    ) -> Invalidation {
        let outcome = self.tracker.observe(marker, is_baseline_only);
        if outcome != Invalidation::None {
            self.preview.cancel();
        }
        outcome
    }

    // ── Publication & reset ────────────────────────────────────────

    /// Publish the annotated geometric model to this instance's model slot
    /// for downstream consumers.
    pub fn publish_model(
        &self,
        model: &GeometricModel,
        registry: &mut GraphRegistry,
        unit_id: &str,
    ) {
        registry.publish(unit_id, &self.model_slot(), SlotPayload::Model(model.clone()));
    }

    /// Derive geometry from the committed strategy and publish it to this
    /// instance's output slot. Returns the derived geometry, or `None` when
    /// no strategy is committed.
    pub fn publish_derived(
        &self,
        model: &GeometricModel,
        registry: &mut GraphRegistry,
        unit_id: &str,
    ) -> Option<DerivedGeometry> {
        let strategy = self.tracker.strategy()?;
        let derived = model.derive(strategy);
        registry.publish(unit_id, &self.output_slot(), SlotPayload::Derived(derived.clone()));
        Some(derived)
    }

    /// Clear exposed state (history, strategy, muted flag) and remove any
    /// previously published derived payload for this instance's slot.
    pub fn reset(&mut self, registry: &mut GraphRegistry, unit_id: &str) {
        self.tracker.clear();
        self.muted = false;
        self.in_flight = false;
        self.preview.cancel();
        registry.remove(unit_id, &self.output_slot());
    }
}
