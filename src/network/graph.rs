//! Graph input boundary
//!
//! The engine only needs node count, neighbor lookup and a few centrality
//! measures. Anything implementing `ContactGraph` can seed a contact network.

use crate::core::error::Result;
use crate::core::types::NodeId;
use crate::network::centrality;

/// Simple undirected graph over nodes `0..node_count()`
pub trait ContactGraph: Sync {
    fn node_count(&self) -> usize;

    /// Neighbors of `node`, without self-loops or duplicates
    fn neighbors(&self, node: NodeId) -> &[NodeId];

    fn degree(&self, node: NodeId) -> usize {
        self.neighbors(node).len()
    }

    fn nodes(&self) -> std::ops::Range<NodeId> {
        0..self.node_count()
    }

    fn edge_count(&self) -> usize {
        self.nodes().map(|v| self.degree(v)).sum::<usize>() / 2
    }

    fn degree_centrality(&self) -> Vec<f64> {
        centrality::degree(self)
    }

    fn betweenness_centrality(&self) -> Vec<f64> {
        centrality::betweenness(self)
    }

    fn eigenvector_centrality(&self) -> Result<Vec<f64>> {
        centrality::eigenvector(self)
    }

    fn closeness_centrality(&self) -> Vec<f64> {
        centrality::closeness(self)
    }
}

/// Adjacency-list graph used by the generators and tests
#[derive(Debug, Clone, Default)]
pub struct Graph {
    adjacency: Vec<Vec<NodeId>>,
}

impl Graph {
    pub fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
        }
    }

    pub fn from_edges(node_count: usize, edges: &[(NodeId, NodeId)]) -> Self {
        let mut graph = Self::new(node_count);
        for &(a, b) in edges {
            graph.add_edge(a, b);
        }
        graph
    }

    /// Add an undirected edge. Self-loops and repeated edges are ignored.
    ///
    /// Panics if either endpoint is out of range.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        if a == b || self.adjacency[a].contains(&b) {
            return false;
        }
        self.adjacency[a].push(b);
        self.adjacency[b].push(a);
        true
    }

    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency.get(a).is_some_and(|row| row.contains(&b))
    }

    /// Append an isolated node and return its index
    pub fn add_node(&mut self) -> NodeId {
        self.adjacency.push(Vec::new());
        self.adjacency.len() - 1
    }
}

impl ContactGraph for Graph {
    fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    fn neighbors(&self, node: NodeId) -> &[NodeId] {
        &self.adjacency[node]
    }
}
