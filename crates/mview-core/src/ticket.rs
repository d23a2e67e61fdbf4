#![forbid(unsafe_code)]

//! Build generations and the tickets that carry them to a builder.

use std::fmt;
use std::sync::Arc;

/// Recency marker for a build request.
///
/// Generations are issued in strictly increasing order by a single
/// [`ModelBacked`](crate::backed::ModelBacked). [`Generation::ZERO`] is the
/// value before any request and never names a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any request was issued.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw generation value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The generation that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A request to build a representation for one model.
///
/// Returned by [`ModelBacked::set_model`](crate::backed::ModelBacked::set_model).
/// Whoever runs the build reports back with the ticket's generation; the
/// component decides on arrival whether the result is still wanted.
#[derive(Debug)]
#[must_use = "a build ticket that is never run leaves the view in its loading state"]
pub struct BuildTicket<M> {
    generation: Generation,
    model: Arc<M>,
}

impl<M> BuildTicket<M> {
    pub(crate) fn new(generation: Generation, model: Arc<M>) -> Self {
        Self { generation, model }
    }

    /// Generation this build was issued under.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Model to build a representation for.
    #[must_use]
    pub fn model(&self) -> &Arc<M> {
        &self.model
    }

    /// Split into generation and model.
    #[must_use]
    pub fn into_parts(self) -> (Generation, Arc<M>) {
        (self.generation, self.model)
    }
}

impl<M> Clone for BuildTicket<M> {
    fn clone(&self) -> Self {
        Self {
            generation: self.generation,
            model: Arc::clone(&self.model),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_are_ordered() {
        let g = Generation::ZERO;
        assert!(g.next() > g);
        assert!(g.next().next() > g.next());
        assert_eq!(g.next().get(), 1);
    }

    #[test]
    fn generation_display() {
        assert_eq!(Generation::new(7).to_string(), "#7");
    }

    #[test]
    fn ticket_clone_shares_model() {
        let ticket = BuildTicket::new(Generation::new(3), Arc::new("model"));
        let copy = ticket.clone();
        assert_eq!(copy.generation(), Generation::new(3));
        assert!(Arc::ptr_eq(ticket.model(), copy.model()));
        let (generation, model) = copy.into_parts();
        assert_eq!(generation.get(), 3);
        assert_eq!(*model, "model");
    }
}
