//! Simple random walks over the contact network

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::error::{ContagionError, Result};
use crate::core::types::NodeId;
use crate::network::adjacency::AdjacencyMatrix;
use crate::network::graph::ContactGraph;

/// Lazy walk of at most `length` nodes.
///
/// Starts at a uniformly random node and moves to a uniformly random
/// neighbor each step. Reaching a node with no neighbors yields
/// `Err(IsolatedNode)` once and ends the walk; a walk of length 1 never
/// needs to move, so it succeeds even from an isolated start.
pub struct RandomWalk<'a, R: Rng + ?Sized> {
    adjacency: &'a AdjacencyMatrix,
    rng: &'a mut R,
    length: usize,
    emitted: usize,
    current: Option<NodeId>,
    trapped: bool,
}

impl<'a, R: Rng + ?Sized> RandomWalk<'a, R> {
    pub fn new(adjacency: &'a AdjacencyMatrix, length: usize, rng: &'a mut R) -> Self {
        Self {
            adjacency,
            rng,
            length,
            emitted: 0,
            current: None,
            trapped: false,
        }
    }

    /// Start over from a fresh random node
    pub fn restart(&mut self) {
        self.emitted = 0;
        self.current = None;
        self.trapped = false;
    }
}

impl<'a, R: Rng + ?Sized> Iterator for RandomWalk<'a, R> {
    type Item = Result<NodeId>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.trapped || self.emitted >= self.length || self.adjacency.n() == 0 {
            return None;
        }

        let node = match self.current {
            None => self.rng.gen_range(0..self.adjacency.n()),
            Some(at) => match self.adjacency.neighbors(at).choose(&mut *self.rng) {
                Some(&next) => next,
                None => {
                    self.trapped = true;
                    return Some(Err(ContagionError::IsolatedNode(at)));
                }
            },
        };

        self.current = Some(node);
        self.emitted += 1;
        Some(Ok(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.length.saturating_sub(self.emitted);
        (0, Some(remaining))
    }
}
