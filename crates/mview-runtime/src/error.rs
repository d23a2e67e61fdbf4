#![forbid(unsafe_code)]

//! Errors produced while building representations.

use std::fmt;

use mview_core::Generation;

/// A representation factory could not build a representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryError {
    message: String,
}

impl FactoryError {
    /// Create an error with a human-readable message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any error, keeping its message.
    #[must_use]
    pub fn from_error(err: &dyn std::error::Error) -> Self {
        Self::new(err.to_string())
    }

    /// The error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FactoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FactoryError {}

impl From<std::io::Error> for FactoryError {
    fn from(err: std::io::Error) -> Self {
        Self::from_error(&err)
    }
}

/// A build did not produce a representation.
///
/// None of these reach the caller of `set_model`; the loader records them
/// for inspection via `drain_errors`.
#[derive(Debug)]
pub enum LoadError {
    /// The factory returned an error.
    Failed {
        generation: Generation,
        source: FactoryError,
    },
    /// The factory panicked on its worker thread.
    Panicked {
        generation: Generation,
        message: String,
    },
    /// The worker thread could not be started.
    Spawn {
        generation: Generation,
        source: std::io::Error,
    },
}

impl LoadError {
    /// Generation of the build that failed.
    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            Self::Failed { generation, .. }
            | Self::Panicked { generation, .. }
            | Self::Spawn { generation, .. } => *generation,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { generation, source } => {
                write!(f, "build {generation} failed: {source}")
            }
            Self::Panicked {
                generation,
                message,
            } => write!(f, "build {generation} panicked: {message}"),
            Self::Spawn { generation, source } => {
                write!(f, "build {generation} could not start a worker: {source}")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::Spawn { source, .. } => Some(source),
            Self::Panicked { .. } => None,
        }
    }
}
