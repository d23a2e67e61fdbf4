#![forbid(unsafe_code)]

//! Harness errors.

use std::fmt;
use std::io;

use mview_core::ConfigError;

/// Error raised while running or reporting scenes.
#[derive(Debug)]
pub enum SceneError {
    /// A step did not pass.
    StepFailed {
        scene: String,
        index: usize,
        step: String,
    },
    /// The JSONL report could not be written.
    Io(io::Error),
    /// A report could not be serialised.
    Json(serde_json::Error),
    /// Harness configuration was invalid.
    Config(ConfigError),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StepFailed { scene, index, step } => {
                write!(f, "{scene}: step {index} \"{step}\" failed")
            }
            Self::Io(err) => write!(f, "report I/O error: {err}"),
            Self::Json(err) => write!(f, "report serialisation error: {err}"),
            Self::Config(err) => write!(f, "configuration error: {err}"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::StepFailed { .. } => None,
            Self::Io(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<io::Error> for SceneError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for SceneError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<ConfigError> for SceneError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}
