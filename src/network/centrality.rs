//! Node centrality measures
//!
//! Normalization follows the common graph-library conventions:
//! - degree: `deg / (n - 1)`
//! - betweenness: Brandes, normalized by `1 / ((n - 1)(n - 2))`
//! - eigenvector: power iteration on `A + I`, unit L2 norm
//! - closeness: Wasserman-Faust corrected for disconnected graphs

use std::collections::VecDeque;

use rayon::prelude::*;

use crate::core::error::{ContagionError, Result};
use crate::network::graph::ContactGraph;

/// Iteration cap for eigenvector power iteration
pub const EIGENVECTOR_MAX_ITER: usize = 100;

/// Per-node tolerance for eigenvector convergence
pub const EIGENVECTOR_TOLERANCE: f64 = 1.0e-6;

pub fn degree<G: ContactGraph + ?Sized>(graph: &G) -> Vec<f64> {
    let n = graph.node_count();
    if n <= 1 {
        return vec![1.0; n];
    }
    let scale = 1.0 / (n - 1) as f64;
    graph.nodes().map(|v| graph.degree(v) as f64 * scale).collect()
}

/// BFS distances from `source`; unreachable nodes are `None`
fn bfs_distances<G: ContactGraph + ?Sized>(graph: &G, source: usize) -> Vec<Option<usize>> {
    let mut dist = vec![None; graph.node_count()];
    let mut queue = VecDeque::new();
    dist[source] = Some(0);
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        let next = dist[v].map_or(0, |d| d + 1);
        for &w in graph.neighbors(v) {
            if dist[w].is_none() {
                dist[w] = Some(next);
                queue.push_back(w);
            }
        }
    }
    dist
}

/// Dependency contributions of one source (Brandes' single-source pass)
fn brandes_source<G: ContactGraph + ?Sized>(graph: &G, source: usize) -> Vec<f64> {
    let n = graph.node_count();
    let mut stack = Vec::with_capacity(n);
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut dist: Vec<i64> = vec![-1; n];
    let mut queue = VecDeque::new();

    sigma[source] = 1.0;
    dist[source] = 0;
    queue.push_back(source);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        for &w in graph.neighbors(v) {
            if dist[w] < 0 {
                dist[w] = dist[v] + 1;
                queue.push_back(w);
            }
            if dist[w] == dist[v] + 1 {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    while let Some(w) = stack.pop() {
        let coeff = (1.0 + delta[w]) / sigma[w];
        for &v in &predecessors[w] {
            delta[v] += sigma[v] * coeff;
        }
    }
    delta[source] = 0.0;
    delta
}

pub fn betweenness<G: ContactGraph + ?Sized + Sync>(graph: &G) -> Vec<f64> {
    let n = graph.node_count();

    let mut scores = (0..n)
        .into_par_iter()
        .map(|s| brandes_source(graph, s))
        .reduce(
            || vec![0.0; n],
            |mut acc, part| {
                for (a, p) in acc.iter_mut().zip(part) {
                    *a += p;
                }
                acc
            },
        );

    if n > 2 {
        let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
        for s in &mut scores {
            *s *= scale;
        }
    }
    scores
}

pub fn eigenvector<G: ContactGraph + ?Sized>(graph: &G) -> Result<Vec<f64>> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut x = vec![1.0 / n as f64; n];
    for _ in 0..EIGENVECTOR_MAX_ITER {
        let last = x.clone();
        for v in graph.nodes() {
            for &w in graph.neighbors(v) {
                x[w] += last[v];
            }
        }

        let norm = x.iter().map(|c| c * c).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        for c in &mut x {
            *c /= norm;
        }

        let change: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
        if change < n as f64 * EIGENVECTOR_TOLERANCE {
            return Ok(x);
        }
    }

    Err(ContagionError::NoConvergence(EIGENVECTOR_MAX_ITER))
}

pub fn closeness<G: ContactGraph + ?Sized + Sync>(graph: &G) -> Vec<f64> {
    let n = graph.node_count();

    (0..n)
        .into_par_iter()
        .map(|u| {
            let dist = bfs_distances(graph, u);
            let (reachable, total) = dist
                .iter()
                .flatten()
                .fold((0usize, 0usize), |(r, t), &d| (r + 1, t + d));

            if total == 0 || n <= 1 {
                return 0.0;
            }
            let reached = (reachable - 1) as f64;
            (reached / total as f64) * (reached / (n - 1) as f64)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::graph::Graph;

    fn path(n: usize) -> Graph {
        let edges: Vec<_> = (1..n).map(|i| (i - 1, i)).collect();
        Graph::from_edges(n, &edges)
    }

    fn star(leaves: usize) -> Graph {
        let edges: Vec<_> = (1..=leaves).map(|i| (0, i)).collect();
        Graph::from_edges(leaves + 1, &edges)
    }

    #[test]
    fn test_degree_centrality_star() {
        let scores = degree(&star(4));
        assert_eq!(scores[0], 1.0);
        assert_eq!(scores[1], 0.25);
    }

    #[test]
    fn test_betweenness_path() {
        // Path 0-1-2-3-4: middle node lies on 4 of 6 leaf-excluded pairs
        let scores = betweenness(&path(5));

        assert_eq!(scores[0], 0.0);
        assert_eq!(scores[4], 0.0);
        assert!((scores[2] - 4.0 * 2.0 / 12.0).abs() < 1e-12);
        assert!((scores[1] - 3.0 * 2.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_betweenness_star_center_is_one() {
        let scores = betweenness(&star(5));
        assert!((scores[0] - 1.0).abs() < 1e-12);
        assert!(scores[1..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_closeness_path() {
        let scores = closeness(&path(3));
        assert!((scores[1] - 1.0).abs() < 1e-12);
        assert!((scores[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_closeness_isolated_node_is_zero() {
        let mut graph = path(3);
        let isolated = graph.add_node();
        let scores = closeness(&graph);

        assert_eq!(scores[isolated], 0.0);
        // Wasserman-Faust scaling: 2 reachable of 3 others
        assert!((scores[1] - 1.0 * (2.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn test_eigenvector_star_center_dominates() {
        let scores = eigenvector(&star(6)).unwrap();
        let norm: f64 = scores.iter().map(|c| c * c).sum::<f64>().sqrt();

        assert!((norm - 1.0).abs() < 1e-9);
        assert!(scores[1..].iter().all(|&s| s < scores[0]));
    }
}
