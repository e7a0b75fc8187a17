//! Contact network
//!
//! Graph input boundary, the fixed adjacency derived from it, and the
//! per-node population state the epidemic engine works on.

pub mod adjacency;
pub mod centrality;
pub mod generators;
pub mod graph;
pub mod population;
pub mod walk;

pub use adjacency::AdjacencyMatrix;
pub use graph::{ContactGraph, Graph};
pub use population::{CompartmentCounts, Compartments, ContactNetwork};
pub use walk::RandomWalk;
