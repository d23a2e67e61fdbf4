#![forbid(unsafe_code)]

//! Representation factories.
//!
//! A factory turns a model into the representation a view displays. The
//! loader calls it on worker threads, possibly for several models at once,
//! so implementations must be `Send + Sync` and must not assume calls arrive
//! or finish in any particular order.

use mview_core::Dispose;

use crate::error::FactoryError;

/// Builds representations for models of type `M`.
pub trait RepresentationFactory<M>: Send + Sync + 'static {
    /// What gets displayed.
    type Output: Dispose + Send + 'static;

    /// Build a representation for `model`.
    ///
    /// May block for as long as it needs; the view never waits on it.
    fn create(&self, model: &M) -> Result<Self::Output, FactoryError>;
}

/// Adapter that turns a closure into a [`RepresentationFactory`].
pub struct FnFactory<F> {
    f: F,
}

impl<F> std::fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}

impl<M, R, F> RepresentationFactory<M> for FnFactory<F>
where
    F: Fn(&M) -> Result<R, FactoryError> + Send + Sync + 'static,
    R: Dispose + Send + 'static,
{
    type Output = R;

    fn create(&self, model: &M) -> Result<R, FactoryError> {
        (self.f)(model)
    }
}

/// Wrap a closure as a factory.
///
/// ```ignore
/// let factory = factory_fn(|model: &Avatar| Ok(Sprite::load(&model.path)?));
/// ```
pub fn factory_fn<M, R, F>(f: F) -> FnFactory<F>
where
    F: Fn(&M) -> Result<R, FactoryError> + Send + Sync + 'static,
    R: Dispose + Send + 'static,
{
    FnFactory { f }
}
