use super::pass::{Pass, PassId};

/// The ordered pass set of a pipeline.
///
/// Input passes keep their declaration order; the combine pass is always last
/// and is the only pass that renders to the display. Instances come from
/// [`build_graph`](super::build_graph), which enforces these invariants.
#[derive(Debug, Clone)]
pub struct PassGraph {
    passes: Vec<Pass>,
    /// For each input pass, the combine slot sampling its output.
    combine_inputs: Vec<(PassId, usize)>,
}

impl PassGraph {
    pub(crate) fn from_passes(passes: Vec<Pass>, combine_inputs: Vec<(PassId, usize)>) -> Self {
        debug_assert!(passes.last().is_some_and(Pass::is_combine));
        debug_assert_eq!(passes.iter().filter(|p| p.is_combine()).count(), 1);
        Self {
            passes,
            combine_inputs,
        }
    }

    /// Total number of passes, including the combine pass.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// A built graph always holds at least the combine pass.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    #[must_use]
    pub fn get(&self, id: PassId) -> Option<&Pass> {
        self.passes.get(id.0)
    }

    pub fn get_mut(&mut self, id: PassId) -> Option<&mut Pass> {
        self.passes.get_mut(id.0)
    }

    /// Pass ids in execution order.
    pub fn ids(&self) -> impl Iterator<Item = PassId> + '_ {
        (0..self.passes.len()).map(PassId)
    }

    #[inline]
    #[must_use]
    pub fn combine_id(&self) -> PassId {
        PassId(self.passes.len() - 1)
    }

    #[must_use]
    pub fn combine(&self) -> &Pass {
        &self.passes[self.passes.len() - 1]
    }

    /// Input passes (everything except combine) in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = (PassId, &Pass)> {
        self.passes
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_combine())
            .map(|(i, p)| (PassId(i), p))
    }

    /// `(input pass, combine texture slot)` pairs in declaration order.
    #[inline]
    #[must_use]
    pub fn combine_inputs(&self) -> &[(PassId, usize)] {
        &self.combine_inputs
    }

    #[must_use]
    pub fn find(&self, name: &str) -> Option<PassId> {
        self.passes.iter().position(|p| p.name == name).map(PassId)
    }

    pub(crate) fn passes_mut(&mut self) -> &mut [Pass] {
        &mut self.passes
    }
}
