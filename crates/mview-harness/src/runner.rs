#![forbid(unsafe_code)]

//! Runs the built-in scenes and collects their reports.

use std::fs;
use std::io::Write;

use crate::config::HarnessConfig;
use crate::error::SceneError;
use crate::scene::SceneReport;
use crate::scenes::{BackedContext, all_scenes};

/// Reports from a harness run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<SceneReport>,
}

impl RunSummary {
    /// Scenes that passed.
    #[must_use]
    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed).count()
    }

    /// Scenes that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.len() - self.passed()
    }

    /// Every step of every scene as JSON lines.
    pub fn to_jsonl(&self) -> Result<String, SceneError> {
        let mut out = String::new();
        for report in &self.reports {
            out.push_str(&report.to_jsonl()?);
        }
        Ok(out)
    }

    /// Write the JSONL report to `config.jsonl_path`, if set.
    pub fn write_jsonl(&self, config: &HarnessConfig) -> Result<(), SceneError> {
        let Some(path) = &config.jsonl_path else {
            return Ok(());
        };
        let mut file = fs::File::create(path)?;
        file.write_all(self.to_jsonl()?.as_bytes())?;
        file.flush()?;
        tracing::info!(path = %path.display(), "wrote scene report");
        Ok(())
    }
}

/// Run every selected scene, each against a fresh context.
pub fn run(config: &HarnessConfig) -> RunSummary {
    let mut summary = RunSummary::default();
    for mut scene in all_scenes(config.until_timeout) {
        if !config.selects(scene.name()) {
            tracing::debug!(scene = scene.name(), "skipped by filter");
            continue;
        }
        let mut ctx = BackedContext::new(config.load_timeout);
        let report = scene.run(&mut ctx);
        let failed = !report.passed;
        summary.reports.push(report);
        if failed && config.fail_fast {
            tracing::warn!("fail-fast: stopping after first failed scene");
            break;
        }
    }
    summary
}
