#![forbid(unsafe_code)]

//! Model-backed view: recency arbitration between asynchronous builds.
//!
//! [`ModelBacked`] maps a model slot to a displayed representation. Building
//! a representation happens elsewhere (on a worker, behind a gate, in a test
//! simulator); the view only hands out [`BuildTicket`]s and decides, when a
//! result comes back, whether it may be displayed.
//!
//! # Algorithm
//!
//! 1. Every `set_model` that introduces a new model advances a generation
//!    counter and issues a ticket tagged with the new generation.
//! 2. A completion is promoted only if its generation is the pending one.
//!    Anything else is stale: the result is disposed with no visible effect.
//! 3. With `transform_immediately` the displayed representation is disposed
//!    when the new ticket is issued; otherwise it stays until the newest
//!    build lands.
//! 4. `set_model(None)` disposes the displayed representation and advances
//!    the generation, so every in-flight build becomes stale.
//!
//! # Invariants
//!
//! 1. At most one representation is displayed.
//! 2. A build superseded by a newer request is never displayed, whatever
//!    order completions arrive in.
//! 3. The displayed representation belongs to the current model, or (when
//!    holding the previous representation) to the model displayed before the
//!    pending request.
//! 4. Every representation that leaves the view is disposed exactly once.
//!
//! # Failure Modes
//!
//! - A build that never completes leaves the view loading until a newer
//!   model supersedes it.
//! - A failed build is treated the same way: it never promotes, and later
//!   builds are unaffected.
//! - Change events nobody drains are capped at the event capacity; the
//!   oldest are dropped and counted in `BackedStats::events_dropped`.
//!
//! # Threading
//!
//! The view is single-writer. Completions from worker threads must be
//! funneled back to the owning thread (see `mview-runtime`'s loader) and
//! applied there.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use crate::dispose::Dispose;
use crate::event::BackedEvent;
use crate::stats::BackedStats;
use crate::ticket::{BuildTicket, Generation};
use crate::transition::TransitionConfig;

/// Default number of undrained change events kept per view.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Coarse state of a model-backed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackedState {
    /// No model assigned, nothing displayed.
    Empty,
    /// A model is assigned but nothing is displayed yet.
    Intermediate,
    /// A representation is displayed (possibly for the previous model while
    /// the current one builds).
    Displaying,
}

/// Result of reporting a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The representation is now displayed.
    Promoted,
    /// The build was superseded; the representation was disposed.
    Stale,
}

/// The representation currently on display, with its provenance.
struct Shown<M, R> {
    generation: Generation,
    model: Arc<M>,
    repr: R,
}

/// A view that displays a representation built for its current model.
///
/// See the [module documentation](self) for the arbitration rules.
pub struct ModelBacked<M, R: Dispose> {
    config: TransitionConfig,
    /// Current model slot.
    model: Option<Arc<M>>,
    /// Generation whose completion would be promoted.
    pending: Option<Generation>,
    displayed: Option<Shown<M, R>>,
    /// Last generation issued.
    generation: Generation,
    events: VecDeque<BackedEvent>,
    event_capacity: usize,
    stats: BackedStats,
}

impl<M, R: Dispose> fmt::Debug for ModelBacked<M, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelBacked")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("pending", &self.pending)
            .field(
                "displayed_generation",
                &self.displayed.as_ref().map(|s| s.generation),
            )
            .field("generation", &self.generation)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl<M, R: Dispose> Default for ModelBacked<M, R> {
    fn default() -> Self {
        Self::new(TransitionConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Construction & configuration
// ---------------------------------------------------------------------------

impl<M, R: Dispose> ModelBacked<M, R> {
    /// Create an empty view with the given transition policy.
    #[must_use]
    pub fn new(config: TransitionConfig) -> Self {
        Self {
            config,
            model: None,
            pending: None,
            displayed: None,
            generation: Generation::ZERO,
            events: VecDeque::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            stats: BackedStats::default(),
        }
    }

    /// Transition policy in effect.
    #[must_use]
    pub fn config(&self) -> TransitionConfig {
        self.config
    }

    /// Replace the transition policy. Takes effect at the next model change.
    pub fn set_config(&mut self, config: TransitionConfig) {
        self.config = config;
    }

    // -----------------------------------------------------------------------
    // Model assignment
    // -----------------------------------------------------------------------

    /// Assign a model, or clear the view with `None`.
    ///
    /// Returns a ticket when a representation must be built. Re-assigning the
    /// same `Arc` (by identity) is a no-op. Re-assigning the model that is
    /// still displayed cancels the pending build without issuing a new one.
    pub fn set_model(&mut self, model: Option<Arc<M>>) -> Option<BuildTicket<M>> {
        let unchanged = match (&self.model, &model) {
            (Some(current), Some(next)) => Arc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            crate::trace!("set_model: same model, ignoring");
            return None;
        }

        let Some(model) = model else {
            self.clear();
            return None;
        };

        if let Some(shown) = &self.displayed
            && Arc::ptr_eq(&shown.model, &model)
        {
            self.generation = self.generation.next();
            self.pending = None;
            self.model = Some(model);
            crate::debug!(
                generation = %self.generation,
                "set_model: returned to displayed model, pending build invalidated"
            );
            return None;
        }

        self.generation = self.generation.next();
        let generation = self.generation;
        self.pending = Some(generation);
        self.model = Some(Arc::clone(&model));
        self.stats.requested += 1;
        self.record(BackedEvent::BuildRequested(generation));
        crate::debug!(generation = %generation, "set_model: build requested");

        if self.config.transform_immediately
            && let Some(shown) = self.displayed.take()
        {
            self.dispose(shown.repr);
            self.record(BackedEvent::EnteredIntermediate(generation));
            crate::trace!(generation = %generation, "entered intermediate state");
        }

        Some(BuildTicket::new(generation, model))
    }

    fn clear(&mut self) {
        self.model = None;
        self.pending = None;
        self.generation = self.generation.next();
        if let Some(shown) = self.displayed.take() {
            self.dispose(shown.repr);
        }
        self.stats.cleared += 1;
        self.record(BackedEvent::Cleared);
        crate::debug!(generation = %self.generation, "set_model: cleared");
    }

    // -----------------------------------------------------------------------
    // Build completion
    // -----------------------------------------------------------------------

    /// Report a finished build.
    ///
    /// The representation is displayed if `generation` is the pending one,
    /// otherwise it is disposed on the spot.
    pub fn complete(&mut self, generation: Generation, repr: R) -> CompletionOutcome {
        if self.pending == Some(generation)
            && let Some(model) = self.model.clone()
        {
            self.pending = None;
            let previous = self.displayed.replace(Shown {
                generation,
                model,
                repr,
            });
            if let Some(previous) = previous {
                self.dispose(previous.repr);
            }
            self.stats.promoted += 1;
            self.record(BackedEvent::Displayed(generation));
            crate::debug!(generation = %generation, "build promoted");
            return CompletionOutcome::Promoted;
        }

        if generation > self.generation {
            crate::warn!(
                generation = %generation,
                latest = %self.generation,
                "completion for a generation that was never issued"
            );
        }
        self.dispose(repr);
        self.stats.stale_discarded += 1;
        self.record(BackedEvent::StaleDiscarded(generation));
        crate::trace!(generation = %generation, "stale build discarded");
        CompletionOutcome::Stale
    }

    /// Report a failed build.
    ///
    /// A failed build never promotes. If it was the pending build the view
    /// keeps whatever it shows (intermediate or previous representation)
    /// until a newer model is assigned. Returns whether the failure belonged
    /// to the pending build.
    pub fn fail(&mut self, generation: Generation) -> bool {
        let current = self.pending == Some(generation);
        if current {
            self.pending = None;
        }
        self.stats.failed += 1;
        self.record(BackedEvent::BuildFailed(generation));
        crate::debug!(generation = %generation, current, "build failed");
        current
    }

    fn dispose(&mut self, repr: R) {
        repr.dispose();
        self.stats.disposed += 1;
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current model slot.
    #[must_use]
    pub fn model(&self) -> Option<&Arc<M>> {
        self.model.as_ref()
    }

    /// Representation currently displayed.
    #[must_use]
    pub fn displayed(&self) -> Option<&R> {
        self.displayed.as_ref().map(|s| &s.repr)
    }

    /// Mutable access to the displayed representation.
    pub fn displayed_mut(&mut self) -> Option<&mut R> {
        self.displayed.as_mut().map(|s| &mut s.repr)
    }

    /// Model the displayed representation was built for.
    #[must_use]
    pub fn displayed_model(&self) -> Option<&Arc<M>> {
        self.displayed.as_ref().map(|s| &s.model)
    }

    /// Generation of the displayed representation.
    #[must_use]
    pub fn displayed_generation(&self) -> Option<Generation> {
        self.displayed.as_ref().map(|s| s.generation)
    }

    /// Generation whose completion would be promoted, if a build is pending.
    #[must_use]
    pub fn pending(&self) -> Option<Generation> {
        self.pending
    }

    /// Last generation issued.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Whether a build for the current model is outstanding.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether a completion for `generation` would be promoted right now.
    #[must_use]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.pending == Some(generation)
    }

    /// Coarse view state.
    #[must_use]
    pub fn state(&self) -> BackedState {
        match (&self.displayed, &self.model) {
            (Some(_), _) => BackedState::Displaying,
            (None, Some(_)) => BackedState::Intermediate,
            (None, None) => BackedState::Empty,
        }
    }

    /// Diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> BackedStats {
        self.stats
    }

    /// Take all queued change events.
    pub fn drain_events(&mut self) -> Vec<BackedEvent> {
        std::mem::take(&mut self.events).into()
    }

    /// Maximum number of undrained events kept. Zero disables recording.
    #[must_use]
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    /// Change the event capacity, dropping the oldest queued events if the
    /// queue no longer fits.
    pub fn set_event_capacity(&mut self, capacity: usize) {
        self.event_capacity = capacity;
        while self.events.len() > capacity {
            self.events.pop_front();
            self.stats.events_dropped += 1;
        }
    }

    fn record(&mut self, event: BackedEvent) {
        if self.event_capacity == 0 {
            return;
        }
        if self.events.len() >= self.event_capacity {
            self.events.pop_front();
            self.stats.events_dropped += 1;
        }
        self.events.push_back(event);
    }

    /// Number of queued change events.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }
}

impl<M, R: Dispose> Drop for ModelBacked<M, R> {
    fn drop(&mut self) {
        if let Some(shown) = self.displayed.take() {
            shown.repr.dispose();
        }
    }
}
