//! Immunization policy
//!
//! Two halves: selection algorithms that pick which nodes to target (pure
//! functions over the graph), and the `Immunization` record stored on a
//! contact network describing how the targets are treated. Vaccinated
//! targets are moved out of Susceptible by the engine; monitored targets are
//! only watched.

use std::cmp::Reverse;
use std::str::FromStr;

use ordered_float::OrderedFloat;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{ContagionError, Result};
use crate::core::types::{fires, Step};
use crate::network::graph::ContactGraph;

/// What happens to selected nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImmunizationMode {
    /// Move into Recovered
    Vaccinate,
    /// Watch as sentinels; the monitor run stops once enough are infected
    Monitor,
}

impl FromStr for ImmunizationMode {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "vaccinate" => Ok(Self::Vaccinate),
            "monitor" => Ok(Self::Monitor),
            other => Err(ContagionError::InvalidParameter(format!(
                "unknown immunization mode '{}'",
                other
            ))),
        }
    }
}

/// Parameters for `ContactNetwork::immunize`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImmunizationOptions {
    pub mode: ImmunizationMode,
    /// Step index at which vaccination takes effect
    pub starts_after: Step,
    /// Probability a vaccinated node is actually protected, in `(0, 1]`
    pub efficacy: f64,
    /// Ever-infected monitored nodes needed to stop a monitor run
    pub monitor_threshold: usize,
}

impl Default for ImmunizationOptions {
    fn default() -> Self {
        Self {
            mode: ImmunizationMode::Vaccinate,
            starts_after: 0,
            efficacy: 1.0,
            monitor_threshold: 1,
        }
    }
}

impl ImmunizationOptions {
    pub fn vaccinate() -> Self {
        Self::default()
    }

    pub fn monitor(threshold: usize) -> Self {
        Self {
            mode: ImmunizationMode::Monitor,
            monitor_threshold: threshold,
            ..Self::default()
        }
    }

    pub fn with_efficacy(mut self, efficacy: f64) -> Self {
        self.efficacy = efficacy;
        self
    }

    pub fn starting_after(mut self, step: Step) -> Self {
        self.starts_after = step;
        self
    }
}

/// Immunization attached to a contact network
#[derive(Debug, Clone, PartialEq)]
pub enum Immunization {
    Vaccinate {
        marked: Vec<bool>,
        starts_after: Step,
        efficacy: f64,
    },
    Monitor {
        marked: Vec<bool>,
        threshold: usize,
    },
}

impl Immunization {
    /// Validate `marked` against a population of `n` nodes and build the
    /// record described by `options`
    pub fn new(marked: Vec<bool>, n: usize, options: ImmunizationOptions) -> Result<Self> {
        if marked.len() != n {
            return Err(ContagionError::InvalidParameter(format!(
                "immunization vector has {} entries, network has {} nodes",
                marked.len(),
                n
            )));
        }

        match options.mode {
            ImmunizationMode::Vaccinate => {
                if !(options.efficacy > 0.0 && options.efficacy <= 1.0) {
                    return Err(ContagionError::InvalidParameter(format!(
                        "efficacy must be in (0, 1], got {}",
                        options.efficacy
                    )));
                }
                Ok(Self::Vaccinate {
                    marked,
                    starts_after: options.starts_after,
                    efficacy: options.efficacy,
                })
            }
            ImmunizationMode::Monitor => {
                if options.monitor_threshold == 0 {
                    return Err(ContagionError::InvalidParameter(
                        "monitor threshold must be positive".into(),
                    ));
                }
                Ok(Self::Monitor {
                    marked,
                    threshold: options.monitor_threshold,
                })
            }
        }
    }

    pub fn marked(&self) -> &[bool] {
        match self {
            Self::Vaccinate { marked, .. } | Self::Monitor { marked, .. } => marked,
        }
    }

    pub fn mode(&self) -> ImmunizationMode {
        match self {
            Self::Vaccinate { .. } => ImmunizationMode::Vaccinate,
            Self::Monitor { .. } => ImmunizationMode::Monitor,
        }
    }

    /// Vaccination with efficacy below one: resampled every step
    pub fn is_leaky(&self) -> bool {
        matches!(self, Self::Vaccinate { efficacy, .. } if *efficacy < 1.0)
    }

    pub fn monitor_threshold(&self) -> Option<usize> {
        match self {
            Self::Monitor { threshold, .. } => Some(*threshold),
            Self::Vaccinate { .. } => None,
        }
    }
}

/// This step's protected subset under leaky vaccination: each marked node
/// independently with probability `efficacy`
pub fn sample_protected<R: Rng + ?Sized>(marked: &[bool], efficacy: f64, rng: &mut R) -> Vec<bool> {
    marked
        .iter()
        .map(|&m| m && fires(rng.gen::<f64>(), efficacy))
        .collect()
}

/// Centrality measure used for targeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CentralityKind {
    Betweenness,
    Eigenvector,
    Closeness,
}

impl FromStr for CentralityKind {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "betweenness" => Ok(Self::Betweenness),
            "eigenvector" => Ok(Self::Eigenvector),
            "closeness" => Ok(Self::Closeness),
            other => Err(ContagionError::UnsupportedFeature(format!(
                "centrality type '{}'",
                other
            ))),
        }
    }
}

/// Whether to target the top or the bottom of a ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionOrder {
    Highest,
    Lowest,
}

impl FromStr for SelectionOrder {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "highest" => Ok(Self::Highest),
            "lowest" => Ok(Self::Lowest),
            other => Err(ContagionError::UnsupportedFeature(format!(
                "selection order '{}'",
                other
            ))),
        }
    }
}

/// Mark the first `min(q, n)` nodes of a ranking by `scores`.
///
/// The sort is stable, so equal scores keep ascending node order.
fn select_ranked(scores: &[f64], q: usize, order: SelectionOrder) -> Vec<bool> {
    let mut ranking: Vec<usize> = (0..scores.len()).collect();
    match order {
        SelectionOrder::Highest => ranking.sort_by_key(|&v| Reverse(OrderedFloat(scores[v]))),
        SelectionOrder::Lowest => ranking.sort_by_key(|&v| OrderedFloat(scores[v])),
    }

    let mut selected = vec![false; scores.len()];
    for &v in ranking.iter().take(q) {
        selected[v] = true;
    }
    selected
}

/// `min(q, n)` nodes chosen uniformly at random
pub fn random_selection<R: Rng + ?Sized>(n: usize, q: usize, rng: &mut R) -> Vec<bool> {
    let mut selected = vec![false; n];
    for v in index::sample(rng, n, q.min(n)) {
        selected[v] = true;
    }
    selected
}

pub fn degree_selection<G: ContactGraph + ?Sized>(graph: &G, q: usize, order: SelectionOrder) -> Vec<bool> {
    let degrees: Vec<f64> = graph.nodes().map(|v| graph.degree(v) as f64).collect();
    select_ranked(&degrees, q, order)
}

/// The `q` best-connected nodes
pub fn highest_degree_selection<G: ContactGraph + ?Sized>(graph: &G, q: usize) -> Vec<bool> {
    degree_selection(graph, q, SelectionOrder::Highest)
}

/// The `q` least-connected nodes
pub fn lowest_degree_selection<G: ContactGraph + ?Sized>(graph: &G, q: usize) -> Vec<bool> {
    degree_selection(graph, q, SelectionOrder::Lowest)
}

pub fn centrality_selection<G: ContactGraph + ?Sized>(
    graph: &G,
    q: usize,
    kind: CentralityKind,
    order: SelectionOrder,
) -> Result<Vec<bool>> {
    let scores = match kind {
        CentralityKind::Betweenness => graph.betweenness_centrality(),
        CentralityKind::Eigenvector => graph.eigenvector_centrality()?,
        CentralityKind::Closeness => graph.closeness_centrality(),
    };
    Ok(select_ranked(&scores, q, order))
}
