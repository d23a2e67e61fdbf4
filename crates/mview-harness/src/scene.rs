#![forbid(unsafe_code)]

//! Step-scripted test scenes.
//!
//! A [`Scene`] is an ordered script of named steps run against a context
//! value. Three kinds of step exist:
//!
//! - `step`: mutate the context (assign a model, open a gate)
//! - `assert`: check the context once
//! - `until`: poll a condition until it holds or a timeout elapses
//!
//! Running a scene stops at the first failing step and yields a
//! [`SceneReport`] that serialises to one JSON object per step.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::SceneError;

/// Delay between polls of an `until` step.
const UNTIL_POLL: Duration = Duration::from_millis(2);

/// Kind of a scene step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Step,
    Assert,
    Until,
}

enum Action<C> {
    Step(Box<dyn FnMut(&mut C)>),
    Assert(Box<dyn Fn(&C) -> bool>),
    Until(Box<dyn FnMut(&mut C) -> bool>, Duration),
}

impl<C> Action<C> {
    fn kind(&self) -> StepKind {
        match self {
            Self::Step(_) => StepKind::Step,
            Self::Assert(_) => StepKind::Assert,
            Self::Until(..) => StepKind::Until,
        }
    }
}

/// An ordered, named script of steps over a context `C`.
pub struct Scene<C> {
    name: String,
    steps: Vec<(String, Action<C>)>,
}

impl<C> fmt::Debug for Scene<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field(
                "steps",
                &self.steps.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl<C> Scene<C> {
    /// Create an empty scene.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append an action step.
    #[must_use]
    pub fn step(mut self, name: impl Into<String>, f: impl FnMut(&mut C) + 'static) -> Self {
        self.steps.push((name.into(), Action::Step(Box::new(f))));
        self
    }

    /// Append a one-shot assertion.
    #[must_use]
    pub fn assert(mut self, name: impl Into<String>, f: impl Fn(&C) -> bool + 'static) -> Self {
        self.steps.push((name.into(), Action::Assert(Box::new(f))));
        self
    }

    /// Append a polled condition with a timeout.
    #[must_use]
    pub fn until(
        mut self,
        name: impl Into<String>,
        timeout: Duration,
        f: impl FnMut(&mut C) -> bool + 'static,
    ) -> Self {
        self.steps
            .push((name.into(), Action::Until(Box::new(f), timeout)));
        self
    }

    /// Scene name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the scene has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order against `ctx`, stopping at the first failure.
    pub fn run(&mut self, ctx: &mut C) -> SceneReport {
        let span = tracing::info_span!("scene", name = %self.name);
        let _guard = span.enter();

        let mut steps = Vec::with_capacity(self.steps.len());
        let mut passed = true;
        for (index, (name, action)) in self.steps.iter_mut().enumerate() {
            let started = Instant::now();
            let ok = match action {
                Action::Step(f) => {
                    f(ctx);
                    true
                }
                Action::Assert(f) => f(&*ctx),
                Action::Until(f, timeout) => poll_until(ctx, f, *timeout),
            };
            let elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
            if ok {
                tracing::debug!(index, step = %name, "step passed");
            } else {
                tracing::warn!(index, step = %name, "step failed");
            }
            steps.push(StepReport {
                index,
                name: name.clone(),
                kind: action.kind(),
                passed: ok,
                elapsed_us,
            });
            if !ok {
                passed = false;
                break;
            }
        }

        SceneReport {
            scene: self.name.clone(),
            passed,
            steps,
        }
    }
}

fn poll_until<C, F>(ctx: &mut C, f: &mut F, timeout: Duration) -> bool
where
    F: FnMut(&mut C) -> bool + ?Sized,
{
    let deadline = Instant::now() + timeout;
    loop {
        if f(ctx) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(UNTIL_POLL);
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub name: String,
    pub kind: StepKind,
    pub passed: bool,
    pub elapsed_us: u64,
}

/// Outcome of a scene run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneReport {
    pub scene: String,
    pub passed: bool,
    pub steps: Vec<StepReport>,
}

/// One JSONL record: a step tagged with its scene.
#[derive(Serialize)]
struct StepRecord<'a> {
    scene: &'a str,
    #[serde(flatten)]
    step: &'a StepReport,
}

impl SceneReport {
    /// First failing step, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| !s.passed)
    }

    /// Convert a failed run into an error.
    pub fn into_result(self) -> Result<(), SceneError> {
        match self.first_failure() {
            Some(step) => Err(SceneError::StepFailed {
                scene: self.scene.clone(),
                index: step.index,
                step: step.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Serialise as JSON lines, one per executed step.
    pub fn to_jsonl(&self) -> Result<String, SceneError> {
        let mut out = String::new();
        for step in &self.steps {
            let record = StepRecord {
                scene: &self.scene,
                step,
            };
            out.push_str(&serde_json::to_string(&record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_run_in_order() {
        let mut scene = Scene::new("counter")
            .step("add one", |n: &mut u32| *n += 1)
            .step("double", |n: &mut u32| *n *= 2)
            .assert("is two", |n: &u32| *n == 2);
        let mut n = 0;
        let report = scene.run(&mut n);
        assert!(report.passed);
        assert_eq!(report.steps.len(), 3);
        assert_eq!(n, 2);
    }

    #[test]
    fn stops_at_first_failure() {
        let mut scene = Scene::new("broken")
            .assert("never", |_: &u32| false)
            .step("unreachable", |n: &mut u32| *n = 99);
        let mut n = 0;
        let report = scene.run(&mut n);
        assert!(!report.passed);
        assert_eq!(report.steps.len(), 1);
        assert_eq!(n, 0);
        assert_eq!(report.first_failure().map(|s| s.name.as_str()), Some("never"));
        assert!(matches!(
            report.into_result(),
            Err(SceneError::StepFailed { index: 0, .. })
        ));
    }

    #[test]
    fn until_polls_until_true() {
        let mut scene = Scene::new("poll").until("reaches three", Duration::from_secs(1), |n: &mut u32| {
            *n += 1;
            *n >= 3
        });
        let mut n = 0;
        assert!(scene.run(&mut n).passed);
        assert_eq!(n, 3);
    }

    #[test]
    fn until_times_out() {
        let mut scene =
            Scene::new("stuck").until("never", Duration::from_millis(10), |_: &mut u32| false);
        let report = scene.run(&mut 0);
        assert!(!report.passed);
        assert_eq!(report.steps[0].kind, StepKind::Until);
    }

    #[test]
    fn jsonl_has_one_line_per_step() {
        let mut scene = Scene::new("json")
            .step("a", |_: &mut ()| {})
            .assert("b", |_: &()| true);
        let report = scene.run(&mut ());
        let jsonl = report.to_jsonl().unwrap();
        let lines: Vec<_> = jsonl.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["scene"], "json");
        assert_eq!(first["name"], "a");
        assert_eq!(first["kind"], "step");
        assert_eq!(first["passed"], true);
    }

    #[test]
    fn debug_lists_step_names() {
        let scene = Scene::new("dbg").step("first", |_: &mut ()| {});
        assert!(format!("{scene:?}").contains("first"));
        assert_eq!(scene.len(), 1);
        assert!(!scene.is_empty());
    }
}
