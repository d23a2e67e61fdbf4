#![forbid(unsafe_code)]

//! Scene harness for model-backed views.
//!
//! Scripts in the style of visual test scenes (steps, one-shot asserts,
//! polled conditions) run against a real threaded loader whose builds are
//! held open by per-model gates.

pub mod config;
pub mod error;
pub mod logging;
pub mod runner;
pub mod scene;
pub mod scenes;

pub use config::HarnessConfig;
pub use error::SceneError;
pub use runner::{RunSummary, run};
pub use scene::{Scene, SceneReport, StepKind, StepReport};
