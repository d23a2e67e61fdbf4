//! Gated, multi-threaded loads: completion order is chosen by opening gates.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mview_runtime::{
    BackedLoader, BackedState, Dispose, FactoryError, LoadGate, LoaderConfig,
    RepresentationFactory, TransitionConfig, factory_fn,
};

const WAIT: Duration = Duration::from_secs(10);

struct Model {
    id: u32,
    allow_load: LoadGate,
}

impl Model {
    fn new(id: u32) -> Arc<Self> {
        Arc::new(Self {
            id,
            allow_load: LoadGate::new(),
        })
    }

    fn ready(id: u32) -> Arc<Self> {
        let model = Self::new(id);
        model.allow_load.set();
        model
    }
}

struct Panel {
    id: u32,
    disposed: Arc<AtomicUsize>,
}

impl Dispose for Panel {
    fn dispose(self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

fn loader(
    has_intermediate: bool,
    disposed: Arc<AtomicUsize>,
) -> BackedLoader<Model, impl RepresentationFactory<Model, Output = Panel>> {
    let factory = factory_fn(move |model: &Model| {
        if !model.allow_load.wait_timeout(WAIT) {
            return Err(FactoryError::new(format!("model {} never allowed to load", model.id)));
        }
        Ok(Panel {
            id: model.id,
            disposed: disposed.clone(),
        })
    });
    BackedLoader::with_config(
        factory,
        LoaderConfig::default()
            .with_transition(TransitionConfig::with_intermediate(has_intermediate)),
    )
}

fn shown(loader: &BackedLoader<Model, impl RepresentationFactory<Model, Output = Panel>>) -> Option<u32> {
    loader.displayed().map(|p| p.id)
}

#[test]
fn change_model_during_load_across_threads() {
    for has_intermediate in [false, true] {
        let disposed = Arc::new(AtomicUsize::new(0));
        let mut loader = loader(has_intermediate, disposed.clone());
        let between = if has_intermediate { None } else { Some(1) };

        loader.set_model(Some(Model::ready(1)));
        assert!(loader.pump_until(WAIT, |v| v.displayed().is_some()));

        let second = Model::new(2);
        let third = Model::new(3);
        loader.set_model(Some(second.clone()));
        loader.pump();
        assert_eq!(shown(&loader), between);
        loader.set_model(Some(third.clone()));
        loader.pump();
        assert_eq!(shown(&loader), between);

        second.allow_load.set();
        assert!(loader.pump_until(WAIT, |v| v.stats().stale_discarded == 1));
        assert_eq!(shown(&loader), between);

        third.allow_load.set();
        assert!(loader.settle(WAIT));
        assert_eq!(shown(&loader), Some(3));
        // first (replaced) and second (stale) were torn down
        assert_eq!(disposed.load(Ordering::SeqCst), 2);
    }
}

#[test]
fn out_of_order_load_across_threads() {
    for has_intermediate in [false, true] {
        let mut loader = loader(has_intermediate, Arc::new(AtomicUsize::new(0)));
        let first = Model::new(1);
        let second = Model::new(2);
        loader.set_model(Some(first.clone()));
        loader.set_model(Some(second.clone()));
        loader.pump();
        assert_eq!(shown(&loader), None);

        second.allow_load.set();
        assert!(loader.pump_until(WAIT, |v| v.displayed().is_some()));
        assert_eq!(shown(&loader), Some(2));

        first.allow_load.set();
        assert!(loader.settle(WAIT));
        assert_eq!(shown(&loader), Some(2));
    }
}

#[test]
fn null_model_discards_late_build() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let mut loader = loader(false, disposed.clone());
    let gated = Model::new(1);
    loader.set_model(Some(gated.clone()));
    loader.set_model(None);
    assert_eq!(loader.state(), BackedState::Empty);

    gated.allow_load.set();
    assert!(loader.settle(WAIT));
    assert_eq!(loader.state(), BackedState::Empty);
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn dropped_loader_disposes_late_results_on_worker() {
    let disposed = Arc::new(AtomicUsize::new(0));
    let gated = Model::new(1);
    {
        let mut loader = loader(false, disposed.clone());
        loader.set_model(Some(gated.clone()));
    }
    gated.allow_load.set();
    let deadline = std::time::Instant::now() + WAIT;
    while disposed.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}

#[test]
fn dropped_loader_disposes_queued_results() {
    let disposed = Arc::new(AtomicUsize::new(0));
    {
        let mut loader = loader(false, disposed.clone());
        loader.set_model(Some(Model::ready(1)));
        // Give the worker time to send; the result is never pumped.
        std::thread::sleep(Duration::from_millis(300));
    }
    let deadline = std::time::Instant::now() + WAIT;
    while disposed.load(Ordering::SeqCst) == 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(disposed.load(Ordering::SeqCst), 1);
}
