//! Fixed adjacency structure derived once from an input graph

use rayon::prelude::*;

use crate::core::error::{ContagionError, Result};
use crate::core::types::NodeId;
use crate::network::graph::ContactGraph;

/// Sparse symmetric 0/1 adjacency matrix in compressed-row form.
///
/// Rows are sorted, contain no duplicates and no self-loops. The structure is
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjacencyMatrix {
    offsets: Vec<usize>,
    targets: Vec<NodeId>,
}

impl AdjacencyMatrix {
    /// Snapshot the adjacency of `graph`.
    ///
    /// Self-loops are dropped and one-sided edges are mirrored so the result
    /// is always symmetric. Neighbor indices outside `0..n` are rejected.
    pub fn from_graph<G: ContactGraph + ?Sized>(graph: &G) -> Result<Self> {
        let n = graph.node_count();
        let mut rows: Vec<Vec<NodeId>> = vec![Vec::new(); n];
        let mut dropped_loops = 0usize;

        for v in graph.nodes() {
            for &w in graph.neighbors(v) {
                if w >= n {
                    return Err(ContagionError::InvalidParameter(format!(
                        "node {} lists neighbor {} outside 0..{}",
                        v, w, n
                    )));
                }
                if w == v {
                    dropped_loops += 1;
                    continue;
                }
                rows[v].push(w);
                rows[w].push(v);
            }
        }

        if dropped_loops > 0 {
            tracing::warn!("Dropped {} self-loops from input graph", dropped_loops);
        }

        let mut offsets = Vec::with_capacity(n + 1);
        let mut targets = Vec::new();
        offsets.push(0);
        for mut row in rows {
            row.sort_unstable();
            row.dedup();
            targets.extend(row);
            offsets.push(targets.len());
        }

        Ok(Self { offsets, targets })
    }

    /// Number of nodes
    pub fn n(&self) -> usize {
        self.offsets.len() - 1
    }

    /// `A[i][j] == 1`
    pub fn contains(&self, i: NodeId, j: NodeId) -> bool {
        i < self.n() && self.row(i).binary_search(&j).is_ok()
    }

    #[inline]
    fn row(&self, node: NodeId) -> &[NodeId] {
        &self.targets[self.offsets[node]..self.offsets[node + 1]]
    }

    /// Number of flagged neighbors per node (`A · x` for a 0/1 vector `x`)
    pub fn mul_vec(&self, flags: &[bool]) -> Vec<u32> {
        debug_assert_eq!(flags.len(), self.n());
        (0..self.n())
            .into_par_iter()
            .map(|v| self.row(v).iter().filter(|&&w| flags[w]).count() as u32)
            .collect()
    }

    /// Degree of each neighbor of `node`
    pub fn neighbor_degrees(&self, node: NodeId) -> Vec<usize> {
        self.row(node).iter().map(|&w| self.degree(w)).collect()
    }

    /// Mean degree over the whole network
    pub fn mean_degree(&self) -> f64 {
        if self.n() == 0 {
            return 0.0;
        }
        self.targets.len() as f64 / self.n() as f64
    }
}

impl ContactGraph for AdjacencyMatrix {
    fn node_count(&self) -> usize {
        self.n()
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.row(node)
    }

    fn edge_count(&self) -> usize {
        self.targets.len() / 2
    }
}
