#![forbid(unsafe_code)]

//! Built-in model-backed view scenes.
//!
//! Each scene drives a [`BackedLoader`] whose factory blocks on a per-model
//! [`LoadGate`], so the script decides when every build may finish. Scenes
//! that depend on the transition policy come in two variants, with and
//! without the intermediate state.
//!
//! | Scene | Covers |
//! |-------|--------|
//! | empty default state | nothing shown before any model |
//! | model default state | a ready model is displayed |
//! | change model | hold vs. intermediate during one swap |
//! | change model during load | a superseded build never shows |
//! | out of order load | the older build finishing last is discarded |
//! | set null model | clearing hides the representation at once |

use std::sync::Arc;
use std::time::Duration;

use mview_core::Dispose;
use mview_runtime::{
    BackedLoader, FactoryError, LoadGate, LoaderConfig, RepresentationFactory, TransitionConfig,
};

use crate::scene::Scene;

/// How long a gated build waits before loading anyway.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(10);

/// How long an `until` step waits for builds to land.
pub const DEFAULT_UNTIL_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Scene model & representation
// ---------------------------------------------------------------------------

/// A model whose build is held until its gate opens.
#[derive(Debug)]
pub struct GatedModel {
    pub id: u32,
    pub allow_load: LoadGate,
}

impl GatedModel {
    /// A model whose build blocks until released.
    #[must_use]
    pub fn new(id: u32) -> Arc<Self> {
        Arc::new(Self {
            id,
            allow_load: LoadGate::new(),
        })
    }

    /// A model whose build may finish right away.
    #[must_use]
    pub fn ready(id: u32) -> Arc<Self> {
        let model = Self::new(id);
        model.allow_load.set();
        model
    }
}

/// What a scene displays for a [`GatedModel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub model_id: u32,
    pub text: String,
}

impl Dispose for Card {}

/// Builds a [`Card`] once the model's gate opens.
///
/// If the gate stays closed past `load_timeout` the card is built anyway,
/// so an abandoned scene cannot pin a worker forever.
#[derive(Debug, Clone, Copy)]
pub struct GatedFactory {
    pub load_timeout: Duration,
}

impl RepresentationFactory<GatedModel> for GatedFactory {
    type Output = Card;

    fn create(&self, model: &GatedModel) -> Result<Card, FactoryError> {
        if !model.allow_load.wait_timeout(self.load_timeout) {
            tracing::warn!(model = model.id, "gate not opened in time, loading anyway");
        }
        Ok(Card {
            model_id: model.id,
            text: format!("Model {}", model.id),
        })
    }
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Scene context: one loader plus the models created by the script.
pub struct BackedContext {
    loader: BackedLoader<GatedModel, GatedFactory>,
    models: Vec<Arc<GatedModel>>,
    load_timeout: Duration,
}

impl std::fmt::Debug for BackedContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackedContext")
            .field("loader", &self.loader)
            .field("models", &self.models.len())
            .finish()
    }
}

impl BackedContext {
    /// Create a context with the default transition policy.
    #[must_use]
    pub fn new(load_timeout: Duration) -> Self {
        Self {
            loader: Self::make_loader(false, load_timeout),
            models: Vec::new(),
            load_timeout,
        }
    }

    fn make_loader(
        has_intermediate: bool,
        load_timeout: Duration,
    ) -> BackedLoader<GatedModel, GatedFactory> {
        BackedLoader::with_config(
            GatedFactory { load_timeout },
            LoaderConfig::default()
                .with_transition(TransitionConfig::with_intermediate(has_intermediate)),
        )
    }

    /// Replace the loader and forget all models.
    ///
    /// Gates of forgotten models are opened so their workers exit.
    pub fn setup(&mut self, has_intermediate: bool) {
        for model in self.models.drain(..) {
            model.allow_load.set();
        }
        self.loader = Self::make_loader(has_intermediate, self.load_timeout);
    }

    /// Register a model and assign it.
    pub fn assign(&mut self, model: Arc<GatedModel>) {
        self.models.push(Arc::clone(&model));
        self.loader.set_model(Some(model));
        self.loader.pump();
    }

    /// Clear the model.
    pub fn clear(&mut self) {
        self.loader.set_model(None);
        self.loader.pump();
    }

    /// Open the gate of model `id`.
    pub fn allow_load(&self, id: u32) {
        if let Some(model) = self.model(id) {
            model.allow_load.set();
        }
    }

    /// A registered model by id.
    #[must_use]
    pub fn model(&self, id: u32) -> Option<&Arc<GatedModel>> {
        self.models.iter().find(|m| m.id == id)
    }

    /// Id of the model whose card is displayed.
    #[must_use]
    pub fn displayed_id(&self) -> Option<u32> {
        self.loader.displayed().map(|card| card.model_id)
    }

    /// The owned loader.
    #[must_use]
    pub fn loader(&self) -> &BackedLoader<GatedModel, GatedFactory> {
        &self.loader
    }
}

impl Drop for BackedContext {
    fn drop(&mut self) {
        for model in &self.models {
            model.allow_load.set();
        }
    }
}

// ---------------------------------------------------------------------------
// Scene helpers
// ---------------------------------------------------------------------------

/// Assert what is shown while a newer build is pending.
///
/// With the intermediate state nothing is shown; otherwise `last` is.
fn assert_intermediate_visibility(
    scene: Scene<BackedContext>,
    has_intermediate: bool,
    last: Option<u32>,
) -> Scene<BackedContext> {
    if has_intermediate {
        scene.assert("no drawable visible", |ctx| ctx.displayed_id().is_none())
    } else {
        scene.assert("last drawable visible", move |ctx| ctx.displayed_id() == last)
    }
}

/// Wait until model `id` is displayed.
fn assert_drawable_visibility(
    scene: Scene<BackedContext>,
    id: u32,
    timeout: Duration,
) -> Scene<BackedContext> {
    scene.until(format!("model {id} visible"), timeout, move |ctx| {
        ctx.loader.pump();
        ctx.displayed_id() == Some(id)
    })
}

/// Wait until no build is outstanding.
fn settle(scene: Scene<BackedContext>, timeout: Duration) -> Scene<BackedContext> {
    scene.until("builds settled", timeout, |ctx| {
        ctx.loader.pump();
        ctx.loader.outstanding() == 0
    })
}

/// Wait until `count` stale results have been discarded.
fn stale_discarded(
    scene: Scene<BackedContext>,
    count: u64,
    timeout: Duration,
) -> Scene<BackedContext> {
    scene.until(format!("{count} stale build(s) discarded"), timeout, move |ctx| {
        ctx.loader.pump();
        ctx.loader.view().stats().stale_discarded >= count
    })
}

fn variant(name: &str, has_intermediate: bool) -> String {
    format!("{name} (has_intermediate={has_intermediate})")
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// Nothing is shown before any model is assigned.
#[must_use]
pub fn empty_default_state() -> Scene<BackedContext> {
    Scene::new("empty default state")
        .step("setup", |ctx: &mut BackedContext| ctx.setup(false))
        .assert("nothing shown", |ctx| ctx.displayed_id().is_none())
}

/// A model that may load immediately ends up displayed.
#[must_use]
pub fn model_default_state(timeout: Duration) -> Scene<BackedContext> {
    let scene = Scene::new("model default state").step("setup", |ctx: &mut BackedContext| {
        ctx.setup(false);
        ctx.assign(GatedModel::ready(1));
    });
    assert_drawable_visibility(scene, 1, timeout)
}

/// Swapping to a second model.
#[must_use]
pub fn change_model(has_intermediate: bool, timeout: Duration) -> Scene<BackedContext> {
    let scene = Scene::new(variant("change model", has_intermediate)).step(
        "setup",
        move |ctx: &mut BackedContext| {
            ctx.setup(has_intermediate);
            ctx.assign(GatedModel::ready(1));
        },
    );
    let scene = assert_drawable_visibility(scene, 1, timeout)
        .step("set second model", |ctx| ctx.assign(GatedModel::new(2)));
    let scene = assert_intermediate_visibility(scene, has_intermediate, Some(1))
        .step("allow second model to load", |ctx| ctx.allow_load(2));
    assert_drawable_visibility(scene, 2, timeout)
}

/// Swapping twice before either new build finishes.
#[must_use]
pub fn change_model_during_load(has_intermediate: bool, timeout: Duration) -> Scene<BackedContext> {
    let scene = Scene::new(variant("change model during load", has_intermediate)).step(
        "setup",
        move |ctx: &mut BackedContext| {
            ctx.setup(has_intermediate);
            ctx.assign(GatedModel::ready(1));
        },
    );
    let scene = assert_drawable_visibility(scene, 1, timeout)
        .step("set second model", |ctx| ctx.assign(GatedModel::new(2)));
    let scene = assert_intermediate_visibility(scene, has_intermediate, Some(1))
        .step("set third model", |ctx| ctx.assign(GatedModel::new(3)));
    let scene = assert_intermediate_visibility(scene, has_intermediate, Some(1))
        .step("allow second model to load", |ctx| ctx.allow_load(2));
    let scene = stale_discarded(scene, 1, timeout);
    let scene = assert_intermediate_visibility(scene, has_intermediate, Some(1))
        .step("allow third model to load", |ctx| ctx.allow_load(3));
    assert_drawable_visibility(scene, 3, timeout)
}

/// The first build finishes after the second.
#[must_use]
pub fn out_of_order_load(has_intermediate: bool, timeout: Duration) -> Scene<BackedContext> {
    let scene = Scene::new(variant("out of order load", has_intermediate))
        .step("setup", move |ctx: &mut BackedContext| {
            ctx.setup(has_intermediate);
            ctx.assign(GatedModel::new(1));
        })
        .step("set second model", |ctx| ctx.assign(GatedModel::new(2)));
    let scene = assert_intermediate_visibility(scene, has_intermediate, None)
        .step("allow second model to load", |ctx| ctx.allow_load(2));
    let scene = assert_drawable_visibility(scene, 2, timeout)
        .step("allow first model to load", |ctx| ctx.allow_load(1));
    let scene = settle(scene, timeout);
    assert_drawable_visibility(scene, 2, timeout)
}

/// Clearing the model hides the representation.
#[must_use]
pub fn set_null_model(timeout: Duration) -> Scene<BackedContext> {
    let scene = Scene::new("set null model").step("setup", |ctx: &mut BackedContext| {
        ctx.setup(false);
        ctx.assign(GatedModel::ready(1));
    });
    assert_drawable_visibility(scene, 1, timeout)
        .step("set null model", BackedContext::clear)
        .assert("nothing shown", |ctx| ctx.displayed_id().is_none())
}

/// Every built-in scene, parametrised variants included.
#[must_use]
pub fn all_scenes(timeout: Duration) -> Vec<Scene<BackedContext>> {
    let mut scenes = vec![empty_default_state(), model_default_state(timeout)];
    for has_intermediate in [false, true] {
        scenes.push(change_model(has_intermediate, timeout));
        scenes.push(change_model_during_load(has_intermediate, timeout));
        scenes.push(out_of_order_load(has_intermediate, timeout));
    }
    scenes.push(set_null_model(timeout));
    scenes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gated_factory_times_out_into_a_card() {
        let factory = GatedFactory {
            load_timeout: Duration::from_millis(5),
        };
        let card = factory.create(&GatedModel::new(4)).unwrap();
        assert_eq!(card.model_id, 4);
        assert_eq!(card.text, "Model 4");
    }

    #[test]
    fn context_tracks_models() {
        let mut ctx = BackedContext::new(Duration::from_millis(50));
        ctx.assign(GatedModel::new(1));
        assert!(ctx.model(1).is_some());
        assert!(ctx.model(2).is_none());
        ctx.setup(true);
        assert!(ctx.model(1).is_none());
        assert!(ctx.loader().config().transition.transform_immediately);
    }

    #[test]
    fn scene_catalogue() {
        let scenes = all_scenes(DEFAULT_UNTIL_TIMEOUT);
        assert_eq!(scenes.len(), 9);
        assert!(
            scenes
                .iter()
                .any(|s| s.name() == "out of order load (has_intermediate=true)")
        );
    }
}
