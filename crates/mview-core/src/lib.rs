#![forbid(unsafe_code)]

//! Core: model-backed view arbitration.
//!
//! A model-backed view shows a representation built for its current model.
//! Builds are asynchronous and may finish in any order; the view keeps a
//! generation counter so that only the most recently requested build can
//! ever be displayed.
//!
//! # Key Components
//!
//! - [`ModelBacked`] - the arbitration state machine
//! - [`BuildTicket`] / [`Generation`] - what a builder receives and reports back with
//! - [`TransitionConfig`] - hold the previous representation, or show the intermediate state
//! - [`Dispose`] - teardown hook for representations leaving the view
//! - [`BackedEvent`] - drained change notifications
//!
//! This crate is thread-free. `mview-runtime` runs builds on workers and
//! funnels their results back to the owning thread.

pub mod backed;
pub mod dispose;
pub mod event;
pub mod logging;
pub mod stats;
pub mod ticket;
pub mod transition;

pub use backed::{BackedState, CompletionOutcome, DEFAULT_EVENT_CAPACITY, ModelBacked};
pub use dispose::Dispose;
pub use event::BackedEvent;
pub use stats::BackedStats;
pub use ticket::{BuildTicket, Generation};
pub use transition::{ConfigError, TransitionConfig};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, trace, warn};
