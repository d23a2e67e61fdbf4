#![forbid(unsafe_code)]

//! Threaded loader for a model-backed view.
//!
//! [`BackedLoader`] owns a [`ModelBacked`] and a representation factory.
//! Each build ticket runs the factory on its own named worker thread; the
//! result travels back over an `mpsc` channel and is applied by
//! [`pump`](BackedLoader::pump) on the thread that owns the loader. That
//! thread is the only writer of the view.
//!
//! # How it works
//!
//! 1. `set_model` forwards to the view; a returned ticket is handed to a
//!    fresh worker thread. `set_model` never blocks.
//! 2. The worker calls the factory (which may block arbitrarily long) and
//!    sends `(generation, result)` back.
//! 3. `pump` drains the channel and reports each result to the view, which
//!    promotes it or disposes it as stale.
//! 4. Finished workers are reaped; a worker that panicked is reported to the
//!    view as a failed build.
//!
//! # Failure Modes
//!
//! - Superseded builds are not interrupted. They run to completion and are
//!   disposed when their result is pumped.
//! - Dropping the loader detaches every worker. Results already queued are
//!   disposed by the drop; results that finish later are disposed on their
//!   worker thread.

use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mview_core::{
    BackedEvent, BackedState, BuildTicket, ConfigError, Dispose, Generation, ModelBacked,
    TransitionConfig,
};

use crate::error::{FactoryError, LoadError};
use crate::factory::RepresentationFactory;

/// Environment variable overriding the worker thread name prefix.
pub const THREAD_PREFIX_ENV: &str = "MVIEW_BUILD_THREAD_PREFIX";

/// Default worker thread name prefix.
const DEFAULT_THREAD_PREFIX: &str = "mview-build";

/// Default wake-up interval while waiting for results.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for a [`BackedLoader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Transition policy for the owned view.
    pub transition: TransitionConfig,
    /// Worker threads are named `<prefix>-<generation>`.
    pub thread_name_prefix: String,
    /// Upper bound on how long a waiting call sleeps before re-checking
    /// for panicked workers.
    pub poll_interval: Duration,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            transition: TransitionConfig::default(),
            thread_name_prefix: DEFAULT_THREAD_PREFIX.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl LoaderConfig {
    /// Read overrides from `MVIEW_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self {
            transition: TransitionConfig::from_env()?,
            ..Self::default()
        };
        if let Ok(prefix) = std::env::var(THREAD_PREFIX_ENV)
            && !prefix.trim().is_empty()
        {
            config.thread_name_prefix = prefix.trim().to_string();
        }
        Ok(config)
    }

    /// Set the transition policy.
    #[must_use]
    pub fn with_transition(mut self, transition: TransitionConfig) -> Self {
        self.transition = transition;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the wait poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// A finished build on its way back to the owning thread.
struct BuildResult<R> {
    generation: Generation,
    result: Result<R, FactoryError>,
}

/// Shared sending side. Taken on drop, after which workers dispose their
/// results instead of sending them.
type Outbox<R> = Arc<Mutex<Option<mpsc::Sender<BuildResult<R>>>>>;

/// Hand `result` to the owning thread. Returns it if nobody will receive it.
fn deliver<R>(outbox: &Outbox<R>, result: BuildResult<R>) -> Option<BuildResult<R>> {
    let guard = outbox.lock().unwrap_or_else(PoisonError::into_inner);
    match guard.as_ref() {
        Some(sender) => sender.send(result).err().map(|mpsc::SendError(r)| r),
        None => Some(result),
    }
}

struct Worker {
    generation: Generation,
    handle: JoinHandle<()>,
}

/// Runs builds for a [`ModelBacked`] on worker threads.
pub struct BackedLoader<M, F>
where
    M: Send + Sync + 'static,
    F: RepresentationFactory<M>,
{
    view: ModelBacked<M, F::Output>,
    factory: Arc<F>,
    config: LoaderConfig,
    outbox: Outbox<F::Output>,
    receiver: mpsc::Receiver<BuildResult<F::Output>>,
    workers: Vec<Worker>,
    /// Generations whose result has not been applied yet.
    in_flight: Vec<Generation>,
    errors: Vec<LoadError>,
}

impl<M, F> std::fmt::Debug for BackedLoader<M, F>
where
    M: Send + Sync + 'static,
    F: RepresentationFactory<M>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackedLoader")
            .field("view", &self.view)
            .field("config", &self.config)
            .field("in_flight", &self.in_flight)
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl<M, F> BackedLoader<M, F>
where
    M: Send + Sync + 'static,
    F: RepresentationFactory<M>,
{
    /// Create a loader with default configuration.
    pub fn new(factory: F) -> Self {
        Self::with_config(factory, LoaderConfig::default())
    }

    /// Create a loader with an explicit configuration.
    pub fn with_config(factory: F, config: LoaderConfig) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            view: ModelBacked::new(config.transition),
            factory: Arc::new(factory),
            config,
            outbox: Arc::new(Mutex::new(Some(sender))),
            receiver,
            workers: Vec::new(),
            in_flight: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Assign a model, starting a build if one is needed.
    ///
    /// Returns the generation of the started build.
    pub fn set_model(&mut self, model: Option<Arc<M>>) -> Option<Generation> {
        let ticket = self.view.set_model(model)?;
        let generation = ticket.generation();
        self.spawn(ticket);
        Some(generation)
    }

    fn spawn(&mut self, ticket: BuildTicket<M>) {
        let (generation, model) = ticket.into_parts();
        let factory = Arc::clone(&self.factory);
        let outbox = Arc::clone(&self.outbox);
        let name = format!("{}-{}", self.config.thread_name_prefix, generation.get());

        tracing::debug!(%generation, thread = %name, "spawning build worker");
        let spawned = thread::Builder::new().name(name).spawn(move || {
            let result = factory.create(&model);
            if let Some(BuildResult {
                result: Ok(repr), ..
            }) = deliver(&outbox, BuildResult { generation, result })
            {
                repr.dispose();
            }
        });

        match spawned {
            Ok(handle) => {
                self.in_flight.push(generation);
                self.workers.push(Worker { generation, handle });
            }
            Err(source) => {
                tracing::error!(%generation, error = %source, "failed to spawn build worker");
                self.view.fail(generation);
                self.errors.push(LoadError::Spawn { generation, source });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Completion delivery
    // -----------------------------------------------------------------------

    /// Apply every result that has arrived. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(result) = self.receiver.try_recv() {
            self.apply(result);
            applied += 1;
        }
        self.reap_finished_workers();
        applied
    }

    fn apply(&mut self, result: BuildResult<F::Output>) {
        let BuildResult { generation, result } = result;
        self.in_flight.retain(|g| *g != generation);
        match result {
            Ok(repr) => {
                let outcome = self.view.complete(generation, repr);
                tracing::trace!(%generation, ?outcome, "build result applied");
            }
            Err(source) => {
                tracing::warn!(%generation, error = %source, "build failed");
                self.view.fail(generation);
                self.errors.push(LoadError::Failed { generation, source });
            }
        }
    }

    fn reap_finished_workers(&mut self) {
        if self.workers.is_empty() {
            return;
        }

        let mut remaining = Vec::with_capacity(self.workers.len());
        for worker in self.workers.drain(..) {
            if !worker.handle.is_finished() {
                remaining.push(worker);
                continue;
            }
            let generation = worker.generation;
            if let Err(payload) = worker.handle.join() {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    (*s).to_owned()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "unknown panic payload".to_owned()
                };
                tracing::error!(%generation, "build worker panicked: {message}");
                self.in_flight.retain(|g| *g != generation);
                self.view.fail(generation);
                self.errors.push(LoadError::Panicked {
                    generation,
                    message,
                });
            }
        }
        self.workers = remaining;
    }

    /// Pump until `done` holds for the view or `timeout` elapses.
    ///
    /// Returns whether the condition was met.
    pub fn pump_until<P>(&mut self, timeout: Duration, mut done: P) -> bool
    where
        P: FnMut(&ModelBacked<M, F::Output>) -> bool,
    {
        self.wait(timeout, |loader| done(&loader.view))
    }

    /// Pump until no build is outstanding or `timeout` elapses.
    pub fn settle(&mut self, timeout: Duration) -> bool {
        self.wait(timeout, |loader| loader.in_flight.is_empty())
    }

    fn wait<P>(&mut self, timeout: Duration, mut done: P) -> bool
    where
        P: FnMut(&Self) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done(&*self) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let slice = (deadline - now).min(self.config.poll_interval);
            if let Ok(result) = self.receiver.recv_timeout(slice) {
                self.apply(result);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The owned view.
    #[must_use]
    pub fn view(&self) -> &ModelBacked<M, F::Output> {
        &self.view
    }

    /// Representation currently displayed.
    #[must_use]
    pub fn displayed(&self) -> Option<&F::Output> {
        self.view.displayed()
    }

    /// Model the displayed representation was built for.
    #[must_use]
    pub fn displayed_model(&self) -> Option<&Arc<M>> {
        self.view.displayed_model()
    }

    /// Current model slot.
    #[must_use]
    pub fn model(&self) -> Option<&Arc<M>> {
        self.view.model()
    }

    /// Coarse view state.
    #[must_use]
    pub fn state(&self) -> BackedState {
        self.view.state()
    }

    /// Builds whose result has not been applied yet, stale ones included.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.in_flight.len()
    }

    /// Loader configuration.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Change the transition policy of the owned view.
    pub fn set_transition(&mut self, transition: TransitionConfig) {
        self.config.transition = transition;
        self.view.set_config(transition);
    }

    /// The shared factory.
    #[must_use]
    pub fn factory(&self) -> &Arc<F> {
        &self.factory
    }

    /// Take queued view change events.
    pub fn drain_events(&mut self) -> Vec<BackedEvent> {
        self.view.drain_events()
    }

    /// Take recorded build errors.
    pub fn drain_errors(&mut self) -> Vec<LoadError> {
        std::mem::take(&mut self.errors)
    }
}

impl<M, F> Drop for BackedLoader<M, F>
where
    M: Send + Sync + 'static,
    F: RepresentationFactory<M>,
{
    fn drop(&mut self) {
        // Close the outbox first so no send can land after the drain below.
        self.outbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let mut disposed = 0_usize;
        while let Ok(BuildResult { result, .. }) = self.receiver.try_recv() {
            if let Ok(repr) = result {
                repr.dispose();
                disposed += 1;
            }
        }
        if disposed > 0 {
            tracing::debug!(disposed, "disposed queued build results on drop");
        }
    }
}
