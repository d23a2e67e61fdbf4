#![forbid(unsafe_code)]

//! Harness configuration from `MVIEW_HARNESS_*` environment variables.

use std::path::PathBuf;
use std::time::Duration;

use mview_core::transition::parse_flag;

use crate::error::SceneError;
use crate::scenes::{DEFAULT_LOAD_TIMEOUT, DEFAULT_UNTIL_TIMEOUT};

/// Only run scenes whose name contains this substring.
pub const FILTER_ENV: &str = "MVIEW_HARNESS_FILTER";
/// Write a JSONL step report to this path.
pub const JSONL_ENV: &str = "MVIEW_HARNESS_JSONL";
/// Milliseconds a gated build waits before loading anyway.
pub const LOAD_TIMEOUT_ENV: &str = "MVIEW_HARNESS_LOAD_TIMEOUT_MS";
/// Milliseconds an `until` step waits.
pub const UNTIL_TIMEOUT_ENV: &str = "MVIEW_HARNESS_UNTIL_TIMEOUT_MS";
/// Stop after the first failing scene (`1/true/yes/on`).
pub const FAIL_FAST_ENV: &str = "MVIEW_HARNESS_FAIL_FAST";
/// Tracing filter directive.
pub const LOG_ENV: &str = "MVIEW_LOG";
/// `json` switches log output to JSON lines.
pub const LOG_FORMAT_ENV: &str = "MVIEW_LOG_FORMAT";

const DEFAULT_LOG_FILTER: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings for a harness run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub filter: Option<String>,
    pub jsonl_path: Option<PathBuf>,
    pub load_timeout: Duration,
    pub until_timeout: Duration,
    pub fail_fast: bool,
    pub log_filter: String,
    pub log_format: LogFormat,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            filter: None,
            jsonl_path: None,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            until_timeout: DEFAULT_UNTIL_TIMEOUT,
            fail_fast: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl HarnessConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, SceneError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup function.
    ///
    /// Unparsable durations fall back to their defaults; an unparsable
    /// fail-fast flag is an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SceneError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let millis = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(default, Duration::from_millis)
        };
        let fail_fast = match lookup(FAIL_FAST_ENV) {
            Some(flag) => parse_flag(FAIL_FAST_ENV, &flag)?,
            None => false,
        };
        Ok(Self {
            filter: lookup(FILTER_ENV).filter(|v| !v.trim().is_empty()),
            jsonl_path: lookup(JSONL_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            load_timeout: millis(LOAD_TIMEOUT_ENV, DEFAULT_LOAD_TIMEOUT),
            until_timeout: millis(UNTIL_TIMEOUT_ENV, DEFAULT_UNTIL_TIMEOUT),
            fail_fast,
            log_filter: lookup(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_format: match lookup(LOG_FORMAT_ENV) {
                Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    /// Whether a scene with `name` is selected by the filter.
    #[must_use]
    pub fn selects(&self, name: &str) -> bool {
        self.filter
            .as_deref()
            .is_none_or(|needle| name.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = HarnessConfig::from_lookup(lookup(&[])).unwrap();
        assert!(config.filter.is_none());
        assert!(config.jsonl_path.is_none());
        assert_eq!(config.load_timeout, DEFAULT_LOAD_TIMEOUT);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.selects("anything"));
    }

    #[test]
    fn env_overrides() {
        let config = HarnessConfig::from_lookup(lookup(&[
            (FILTER_ENV, "out of order"),
            (JSONL_ENV, "/tmp/report.jsonl"),
            (LOAD_TIMEOUT_ENV, "250"),
            (UNTIL_TIMEOUT_ENV, "500"),
            (LOG_ENV, "mview_runtime=trace"),
            (LOG_FORMAT_ENV, "JSON"),
        ]))
        .unwrap();
        assert!(config.selects("out of order load (has_intermediate=true)"));
        assert!(!config.selects("set null model"));
        assert_eq!(config.jsonl_path, Some(PathBuf::from("/tmp/report.jsonl")));
        assert_eq!(config.load_timeout, Duration::from_millis(250));
        assert_eq!(config.until_timeout, Duration::from_millis(500));
        assert_eq!(config.log_filter, "mview_runtime=trace");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn fail_fast_flag() {
        let config = HarnessConfig::from_lookup(lookup(&[(FAIL_FAST_ENV, "yes")])).unwrap();
        assert!(config.fail_fast);
        let err = HarnessConfig::from_lookup(lookup(&[(FAIL_FAST_ENV, "perhaps")])).unwrap_err();
        assert!(matches!(err, SceneError::Config(_)));
    }

    #[test]
    fn bad_durations_keep_defaults() {
        let config =
            HarnessConfig::from_lookup(lookup(&[(LOAD_TIMEOUT_ENV, "soon")])).unwrap();
        assert_eq!(config.load_timeout, DEFAULT_LOAD_TIMEOUT);
    }
}
