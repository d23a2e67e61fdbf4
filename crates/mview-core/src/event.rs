#![forbid(unsafe_code)]

//! Change notifications emitted by a model-backed view.
//!
//! Events are queued while the view is mutated and drained by the owner with
//! [`ModelBacked::drain_events`](crate::backed::ModelBacked::drain_events).
//! Nothing is invoked re-entrantly; an owner that wants to react to swaps
//! polls after each `set_model` / completion.
//!
//! # Invariants
//!
//! 1. Every issued ticket produces exactly one `BuildRequested`.
//! 2. Every generation settles at most once: `Displayed`, `StaleDiscarded`
//!    or `BuildFailed`.
//! 3. Draining clears the queue; events are not replayed.

use crate::ticket::Generation;

/// Something observable changed inside a model-backed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackedEvent {
    /// A new build was requested.
    BuildRequested(Generation),
    /// The displayed representation was disposed while a build is pending.
    EnteredIntermediate(Generation),
    /// A completed build became the displayed representation.
    Displayed(Generation),
    /// A completed build was superseded and its result disposed.
    StaleDiscarded(Generation),
    /// A build reported failure.
    BuildFailed(Generation),
    /// The model was cleared and nothing is displayed.
    Cleared,
}

impl BackedEvent {
    /// Generation the event refers to, if any.
    #[must_use]
    pub fn generation(&self) -> Option<Generation> {
        match *self {
            Self::BuildRequested(g)
            | Self::EnteredIntermediate(g)
            | Self::Displayed(g)
            | Self::StaleDiscarded(g)
            | Self::BuildFailed(g) => Some(g),
            Self::Cleared => None,
        }
    }

    /// Whether the event changed what is displayed.
    #[must_use]
    pub fn changes_display(&self) -> bool {
        matches!(
            self,
            Self::EnteredIntermediate(_) | Self::Displayed(_) | Self::Cleared
        )
    }
}
