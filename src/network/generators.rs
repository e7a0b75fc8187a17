//! Random graph generators
//!
//! The engine does not care where a graph comes from; these exist so the CLI
//! and tests have realistic contact networks to run on.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::error::{ContagionError, Result};
use crate::core::types::check_probability;
use crate::network::graph::Graph;

/// Preferential-attachment graph with `n` nodes, each new node bringing `m`
/// edges.
///
/// Starts from a star on `m + 1` nodes and picks targets from a list in which
/// every node appears once per incident edge, so attachment is proportional
/// to degree.
pub fn barabasi_albert<R: Rng + ?Sized>(n: usize, m: usize, rng: &mut R) -> Result<Graph> {
    if m < 1 || m >= n {
        return Err(ContagionError::InvalidParameter(format!(
            "Barabasi-Albert needs 1 <= m < n, got m={} n={}",
            m, n
        )));
    }

    let mut graph = Graph::new(n);
    let mut repeated = Vec::with_capacity(2 * m * n);
    for leaf in 1..=m {
        graph.add_edge(0, leaf);
        repeated.push(0);
        repeated.push(leaf);
    }

    let mut targets = Vec::with_capacity(m);
    for source in (m + 1)..n {
        targets.clear();
        while targets.len() < m {
            if let Some(&candidate) = repeated.choose(rng) {
                if !targets.contains(&candidate) {
                    targets.push(candidate);
                }
            }
        }

        for &target in &targets {
            graph.add_edge(source, target);
            repeated.push(target);
            repeated.push(source);
        }
    }

    Ok(graph)
}

/// G(n, p) random graph: every pair is connected independently with
/// probability `p`
pub fn erdos_renyi<R: Rng + ?Sized>(n: usize, p: f64, rng: &mut R) -> Result<Graph> {
    check_probability("edge probability", p)?;

    let mut graph = Graph::new(n);
    for a in 0..n {
        for b in (a + 1)..n {
            if rng.gen::<f64>() < p {
                graph.add_edge(a, b);
            }
        }
    }
    Ok(graph)
}
