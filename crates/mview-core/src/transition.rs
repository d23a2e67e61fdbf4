#![forbid(unsafe_code)]

//! Transition policy for model swaps.
//!
//! When a new model is assigned while an older representation is on screen,
//! the view either keeps the old representation until the new one is ready,
//! or tears it down right away and shows nothing (the intermediate state)
//! until the new build lands.
//!
//! | `transform_immediately` | old representation during a pending build |
//! |-------------------------|-------------------------------------------|
//! | `false` (default)       | stays displayed until the newest build completes |
//! | `true`                  | disposed at once; intermediate state shown |
//!
//! Test scenes name the same switch `has_intermediate`;
//! [`TransitionConfig::shows_intermediate`] is that reading of the flag.

use std::fmt;

/// Environment variable consulted by [`TransitionConfig::from_env`].
pub const TRANSFORM_IMMEDIATELY_ENV: &str = "MVIEW_TRANSFORM_IMMEDIATELY";

/// Error raised while reading transition configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A boolean variable held something other than a recognised flag value.
    InvalidFlag {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFlag { name, value } => {
                write!(f, "{name}: expected a boolean flag, got {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a boolean flag value the way every `MVIEW_*` switch is read.
///
/// Accepts `1/true/yes/on` and `0/false/no/off`, case-insensitive, with
/// surrounding whitespace ignored.
pub fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    let trimmed = value.trim();
    let truthy = ["1", "true", "yes", "on"];
    let falsy = ["0", "false", "no", "off"];
    if truthy.iter().any(|t| trimmed.eq_ignore_ascii_case(t)) {
        Ok(true)
    } else if falsy.iter().any(|t| trimmed.eq_ignore_ascii_case(t)) {
        Ok(false)
    } else {
        Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        })
    }
}

/// How a [`ModelBacked`](crate::backed::ModelBacked) transitions between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionConfig {
    /// Dispose the displayed representation as soon as a different model is
    /// requested, instead of holding it until the replacement is ready.
    pub transform_immediately: bool,
}

impl TransitionConfig {
    /// Hold the previous representation until the replacement is ready.
    #[must_use]
    pub const fn hold_previous() -> Self {
        Self {
            transform_immediately: false,
        }
    }

    /// Drop to the intermediate state as soon as a new model is requested.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            transform_immediately: true,
        }
    }

    /// Builder form of the `has_intermediate` switch used by test scenes.
    #[must_use]
    pub const fn with_intermediate(has_intermediate: bool) -> Self {
        Self {
            transform_immediately: has_intermediate,
        }
    }

    /// Whether the empty intermediate state is shown while a build is pending.
    #[must_use]
    pub const fn shows_intermediate(&self) -> bool {
        self.transform_immediately
    }

    /// Read overrides from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(TRANSFORM_IMMEDIATELY_ENV) {
            config.transform_immediately = parse_flag(TRANSFORM_IMMEDIATELY_ENV, &value)?;
        }
        Ok(config)
    }
}
