#![forbid(unsafe_code)]

//! Runtime for model-backed views.
//!
//! This crate runs representation builds off the owning thread and feeds
//! their results back into an `mview-core` view.
//!
//! # Key Components
//!
//! - [`BackedLoader`] - worker-thread builds, completions applied on `pump()`
//! - [`RepresentationFactory`] - model → representation, possibly slow
//! - [`LoadGate`] - manual-reset gate for holding builds open
//! - [`LoadSimulator`] - thread-free driver with test-chosen completion order
//!
//! # How it fits in the system
//! The core decides *whether* a result may be displayed; this crate decides
//! *where* builds run and guarantees results are applied by a single writer.

pub mod error;
pub mod factory;
pub mod gate;
pub mod loader;
pub mod simulator;

pub use error::{FactoryError, LoadError};
pub use factory::{FnFactory, RepresentationFactory, factory_fn};
pub use gate::LoadGate;
pub use loader::{BackedLoader, LoaderConfig};
pub use simulator::{LoadSimulator, ReleaseOutcome};

pub use mview_core::{
    BackedEvent, BackedState, CompletionOutcome, Dispose, Generation, ModelBacked,
    TransitionConfig,
};
