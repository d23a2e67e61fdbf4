#![forbid(unsafe_code)]

//! Deterministic load simulator for testing.
//!
//! `LoadSimulator` drives a [`ModelBacked`] without threads. Tickets are
//! parked when issued and only built when the test releases them, in
//! whatever order the test chooses. The factory runs synchronously on the
//! calling thread.
//!
//! # Example
//!
//! ```ignore
//! use mview_runtime::simulator::LoadSimulator;
//!
//! let mut sim = LoadSimulator::new(factory, TransitionConfig::default());
//! let first = sim.set_model(Some(a.clone())).unwrap();
//! let second = sim.set_model(Some(b.clone())).unwrap();
//! sim.release(second);
//! sim.release(first); // stale, disposed
//! assert!(Arc::ptr_eq(sim.view().displayed_model().unwrap(), &b));
//! ```

use std::sync::Arc;

use mview_core::{BuildTicket, CompletionOutcome, Generation, ModelBacked, TransitionConfig};

use crate::error::{FactoryError, LoadError};
use crate::factory::RepresentationFactory;

/// What happened when a parked ticket was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The factory succeeded and the view promoted or discarded the result.
    Completed(CompletionOutcome),
    /// The factory returned an error.
    Failed,
    /// No parked ticket matched.
    Unknown,
}

/// Thread-free driver for a [`ModelBacked`].
pub struct LoadSimulator<M, F>
where
    F: RepresentationFactory<M>,
{
    view: ModelBacked<M, F::Output>,
    factory: F,
    parked: Vec<BuildTicket<M>>,
    errors: Vec<LoadError>,
}

impl<M, F> std::fmt::Debug for LoadSimulator<M, F>
where
    F: RepresentationFactory<M>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSimulator")
            .field("view", &self.view)
            .field("parked", &self.parked.len())
            .field("errors", &self.errors.len())
            .finish()
    }
}

impl<M, F> LoadSimulator<M, F>
where
    F: RepresentationFactory<M>,
{
    /// Create a simulator around a fresh view.
    pub fn new(factory: F, transition: TransitionConfig) -> Self {
        Self {
            view: ModelBacked::new(transition),
            factory,
            parked: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Assign a model; an issued ticket is parked until released.
    pub fn set_model(&mut self, model: Option<Arc<M>>) -> Option<Generation> {
        let ticket = self.view.set_model(model)?;
        let generation = ticket.generation();
        self.parked.push(ticket);
        Some(generation)
    }

    /// Build and report the parked ticket with `generation`.
    pub fn release(&mut self, generation: Generation) -> ReleaseOutcome {
        match self
            .parked
            .iter()
            .position(|t| t.generation() == generation)
        {
            Some(index) => {
                let ticket = self.parked.remove(index);
                self.run(ticket)
            }
            None => ReleaseOutcome::Unknown,
        }
    }

    /// Build and report the oldest parked ticket for `model` (by identity).
    pub fn release_model(&mut self, model: &Arc<M>) -> ReleaseOutcome {
        match self
            .parked
            .iter()
            .position(|t| Arc::ptr_eq(t.model(), model))
        {
            Some(index) => {
                let ticket = self.parked.remove(index);
                self.run(ticket)
            }
            None => ReleaseOutcome::Unknown,
        }
    }

    /// Report the parked ticket with `generation` as failed without building.
    pub fn fail(&mut self, generation: Generation, reason: &str) -> ReleaseOutcome {
        match self
            .parked
            .iter()
            .position(|t| t.generation() == generation)
        {
            Some(index) => {
                self.parked.remove(index);
                self.record_failure(generation, FactoryError::new(reason));
                ReleaseOutcome::Failed
            }
            None => ReleaseOutcome::Unknown,
        }
    }

    /// Release every parked ticket, oldest first.
    pub fn release_all_in_order(&mut self) -> Vec<ReleaseOutcome> {
        let tickets = std::mem::take(&mut self.parked);
        tickets.into_iter().map(|t| self.run(t)).collect()
    }

    /// Release every parked ticket, newest first.
    pub fn release_all_reversed(&mut self) -> Vec<ReleaseOutcome> {
        let tickets = std::mem::take(&mut self.parked);
        tickets.into_iter().rev().map(|t| self.run(t)).collect()
    }

    fn run(&mut self, ticket: BuildTicket<M>) -> ReleaseOutcome {
        let (generation, model) = ticket.into_parts();
        match self.factory.create(&model) {
            Ok(repr) => ReleaseOutcome::Completed(self.view.complete(generation, repr)),
            Err(source) => {
                self.record_failure(generation, source);
                ReleaseOutcome::Failed
            }
        }
    }

    fn record_failure(&mut self, generation: Generation, source: FactoryError) {
        self.view.fail(generation);
        self.errors.push(LoadError::Failed { generation, source });
    }

    /// Generations of parked tickets, oldest first.
    pub fn pending_tickets(&self) -> impl Iterator<Item = Generation> + '_ {
        self.parked.iter().map(BuildTicket::generation)
    }

    /// The simulated view.
    #[must_use]
    pub fn view(&self) -> &ModelBacked<M, F::Output> {
        &self.view
    }

    /// Mutable access to the simulated view.
    pub fn view_mut(&mut self) -> &mut ModelBacked<M, F::Output> {
        &mut self.view
    }

    /// Take recorded build errors.
    pub fn drain_errors(&mut self) -> Vec<LoadError> {
        std::mem::take(&mut self.errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::factory_fn;
    use mview_core::{BackedState, Dispose};

    #[derive(Debug, PartialEq)]
    struct Card(u32);

    impl Dispose for Card {}

    fn sim(
        has_intermediate: bool,
    ) -> LoadSimulator<u32, impl RepresentationFactory<u32, Output = Card>> {
        LoadSimulator::new(
            factory_fn(|n: &u32| {
                if *n == 0 {
                    Err(FactoryError::new("no card for zero"))
                } else {
                    Ok(Card(*n))
                }
            }),
            TransitionConfig::with_intermediate(has_intermediate),
        )
    }

    #[test]
    fn parked_until_released() {
        let mut sim = sim(false);
        let g = sim.set_model(Some(Arc::new(1))).unwrap();
        assert_eq!(sim.view().state(), BackedState::Intermediate);
        assert_eq!(sim.pending_tickets().collect::<Vec<_>>(), vec![g]);
        assert_eq!(
            sim.release(g),
            ReleaseOutcome::Completed(CompletionOutcome::Promoted)
        );
        assert_eq!(sim.view().displayed(), Some(&Card(1)));
        assert_eq!(sim.pending_tickets().count(), 0);
    }

    #[test]
    fn release_unknown_generation() {
        let mut sim = sim(false);
        assert_eq!(sim.release(Generation::new(4)), ReleaseOutcome::Unknown);
    }

    #[test]
    fn reversed_release_promotes_newest_only() {
        let mut sim = sim(false);
        for n in 1..=3 {
            sim.set_model(Some(Arc::new(n)));
        }
        let outcomes = sim.release_all_reversed();
        assert_eq!(
            outcomes,
            vec![
                ReleaseOutcome::Completed(CompletionOutcome::Promoted),
                ReleaseOutcome::Completed(CompletionOutcome::Stale),
                ReleaseOutcome::Completed(CompletionOutcome::Stale),
            ]
        );
        assert_eq!(sim.view().displayed(), Some(&Card(3)));
    }

    #[test]
    fn in_order_release_ends_on_newest() {
        let mut sim = sim(true);
        for n in 1..=3 {
            sim.set_model(Some(Arc::new(n)));
        }
        sim.release_all_in_order();
        assert_eq!(sim.view().displayed(), Some(&Card(3)));
        assert_eq!(sim.view().stats().stale_discarded, 2);
    }

    #[test]
    fn release_by_model_identity() {
        let mut sim = sim(false);
        let a = Arc::new(5);
        sim.set_model(Some(a.clone()));
        assert_eq!(
            sim.release_model(&Arc::new(5)),
            ReleaseOutcome::Unknown,
            "equal value with different identity must not match"
        );
        assert_eq!(
            sim.release_model(&a),
            ReleaseOutcome::Completed(CompletionOutcome::Promoted)
        );
    }

    #[test]
    fn factory_failure_is_recorded() {
        let mut sim = sim(false);
        let g = sim.set_model(Some(Arc::new(0))).unwrap();
        assert_eq!(sim.release(g), ReleaseOutcome::Failed);
        assert_eq!(sim.drain_errors().len(), 1);
        assert!(!sim.view().is_loading());
    }

    #[test]
    fn transition_change_through_view_mut() {
        let mut sim = sim(false);
        let g = sim.set_model(Some(Arc::new(1))).unwrap();
        sim.release(g);
        sim.view_mut().set_config(TransitionConfig::immediate());
        sim.set_model(Some(Arc::new(2)));
        assert!(sim.view().displayed().is_none());
        assert_eq!(sim.view().stats().disposed, 1);
    }

    #[test]
    fn explicit_failure() {
        let mut sim = sim(false);
        let g = sim.set_model(Some(Arc::new(2))).unwrap();
        assert_eq!(sim.fail(g, "lost"), ReleaseOutcome::Failed);
        assert_eq!(sim.view().stats().failed, 1);
        assert_eq!(sim.fail(g, "again"), ReleaseOutcome::Unknown);
    }
}
