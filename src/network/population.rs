//! ContactNetwork - population state over a fixed adjacency
//!
//! Holds one Susceptible/Infected/Recovered flag per node as parallel
//! vectors, the snapshot taken right after initialization, and the
//! immunization attached to this population (if any).

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{ContagionError, Result};
use crate::core::types::{count, NodeId};
use crate::network::adjacency::AdjacencyMatrix;
use crate::network::graph::ContactGraph;
use crate::network::walk::RandomWalk;
use crate::policy::immunization::{Immunization, ImmunizationOptions};

/// Compartment membership, one entry per node.
///
/// Exactly one of the three flags is set for every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compartments {
    pub susceptible: Vec<bool>,
    pub infected: Vec<bool>,
    pub recovered: Vec<bool>,
}

/// Compartment sums at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompartmentCounts {
    pub susceptible: usize,
    pub infected: usize,
    pub recovered: usize,
}

impl Compartments {
    pub fn all_susceptible(n: usize) -> Self {
        Self {
            susceptible: vec![true; n],
            infected: vec![false; n],
            recovered: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.susceptible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.susceptible.is_empty()
    }

    pub fn counts(&self) -> CompartmentCounts {
        CompartmentCounts {
            susceptible: count(&self.susceptible),
            infected: count(&self.infected),
            recovered: count(&self.recovered),
        }
    }

    /// `Su[i] + In[i] + Re[i] == 1` for every node
    pub fn is_partition(&self) -> bool {
        (0..self.len()).all(|i| {
            let members = [self.susceptible[i], self.infected[i], self.recovered[i]];
            members.iter().filter(|&&m| m).count() == 1
        })
    }

    /// Move `node` from Susceptible to Recovered; no-op for other states
    pub(crate) fn protect(&mut self, node: NodeId) -> bool {
        if !self.susceptible[node] {
            return false;
        }
        self.susceptible[node] = false;
        self.recovered[node] = true;
        true
    }

    /// Undo `protect` for a node that is still Recovered
    pub(crate) fn unprotect(&mut self, node: NodeId) {
        if self.recovered[node] {
            self.recovered[node] = false;
            self.susceptible[node] = true;
        }
    }
}

/// Population living on a fixed contact graph
#[derive(Debug, Clone)]
pub struct ContactNetwork {
    adjacency: AdjacencyMatrix,
    fraction_infected: f64,
    fraction_recovered: f64,
    compartments: Compartments,
    initial: Compartments,
    immunization: Option<Immunization>,
}

impl ContactNetwork {
    /// Build a population over `graph` and assign initial compartments.
    ///
    /// `fraction_infected == 0` seeds exactly one infection.
    pub fn new<G, R>(graph: &G, fraction_infected: f64, fraction_recovered: f64, rng: &mut R) -> Result<Self>
    where
        G: ContactGraph + ?Sized,
        R: Rng + ?Sized,
    {
        let adjacency = AdjacencyMatrix::from_graph(graph)?;
        let n = adjacency.n();
        if n == 0 {
            return Err(ContagionError::InvalidParameter(
                "contact graph has no nodes".into(),
            ));
        }

        if fraction_infected + fraction_recovered > 1.0 {
            return Err(ContagionError::InvalidParameter(
                "combined infected and recovered fractions exceed 1".into(),
            ));
        }
        let fraction_infected = if fraction_infected == 0.0 {
            1.0 / n as f64
        } else if fraction_infected > 0.0 && fraction_infected <= 1.0 {
            fraction_infected
        } else {
            return Err(ContagionError::InvalidParameter(format!(
                "fraction infected must be between 0 and 1, got {}",
                fraction_infected
            )));
        };
        if !(0.0..=1.0).contains(&fraction_recovered) {
            return Err(ContagionError::InvalidParameter(format!(
                "fraction recovered must be between 0 and 1, got {}",
                fraction_recovered
            )));
        }

        let mut network = Self {
            adjacency,
            fraction_infected,
            fraction_recovered,
            compartments: Compartments::all_susceptible(n),
            initial: Compartments::all_susceptible(n),
            immunization: None,
        };
        network.initialize_compartments(rng);

        tracing::debug!(
            "Contact network: {} nodes, {} edges, {:?}",
            n,
            network.adjacency.edge_count(),
            network.compartments.counts()
        );

        Ok(network)
    }

    /// Randomly assign compartments and take a fresh reset snapshot.
    ///
    /// Exactly `round(fi * n)` nodes become Infected and
    /// `round((fi + fr) * n) - round(fi * n)` become Recovered. Halves round
    /// to the even count.
    pub fn initialize_compartments<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let n = self.n();
        let infected = ((self.fraction_infected * n as f64).round_ties_even() as usize).min(n);
        let seeded = ((self.fraction_infected * n as f64 + self.fraction_recovered * n as f64).round_ties_even()
            as usize)
            .clamp(infected, n);

        let mut order: Vec<NodeId> = (0..n).collect();
        order.shuffle(rng);

        let mut compartments = Compartments::all_susceptible(n);
        for (rank, &node) in order.iter().enumerate().take(seeded) {
            compartments.susceptible[node] = false;
            if rank < infected {
                compartments.infected[node] = true;
            } else {
                compartments.recovered[node] = true;
            }
        }

        self.initial = compartments.clone();
        self.compartments = compartments;
    }

    /// Restore the post-initialization snapshot
    pub fn reset(&mut self) {
        self.compartments.clone_from(&self.initial);
    }

    pub fn n(&self) -> usize {
        self.adjacency.n()
    }

    pub fn adjacency(&self) -> &AdjacencyMatrix {
        &self.adjacency
    }

    pub fn compartments(&self) -> &Compartments {
        &self.compartments
    }

    pub(crate) fn compartments_mut(&mut self) -> &mut Compartments {
        &mut self.compartments
    }

    /// Snapshot restored by `reset`
    pub fn initial_compartments(&self) -> &Compartments {
        &self.initial
    }

    pub fn fraction_infected(&self) -> f64 {
        self.fraction_infected
    }

    pub fn fraction_recovered(&self) -> f64 {
        self.fraction_recovered
    }

    pub fn immunization(&self) -> Option<&Immunization> {
        self.immunization.as_ref()
    }

    /// Attach an immunization policy, replacing any previous one.
    ///
    /// On error the network is left untouched.
    pub fn immunize(&mut self, marked: Vec<bool>, options: ImmunizationOptions) -> Result<()> {
        let immunization = Immunization::new(marked, self.n(), options)?;
        tracing::debug!(
            "Immunization attached: {:?} on {} nodes",
            immunization.mode(),
            count(immunization.marked())
        );
        self.immunization = Some(immunization);
        Ok(())
    }

    /// Lazy simple random walk of `length` nodes
    pub fn random_walk<'a, R: Rng + ?Sized>(&'a self, length: usize, rng: &'a mut R) -> RandomWalk<'a, R> {
        RandomWalk::new(&self.adjacency, length, rng)
    }

    /// Degrees of the nodes visited by a random walk
    pub fn random_walk_degree_sequence<'a, R: Rng + ?Sized>(
        &'a self,
        length: usize,
        rng: &'a mut R,
    ) -> impl Iterator<Item = Result<usize>> + 'a {
        let adjacency = &self.adjacency;
        self.random_walk(length, rng)
            .map(move |step| step.map(|node| adjacency.degree(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::generators::barabasi_albert;
    use crate::network::graph::Graph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ba_network(fi: f64, fr: f64) -> ContactNetwork {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let graph = barabasi_albert(100, 5, &mut rng).unwrap();
        ContactNetwork::new(&graph, fi, fr, &mut rng).unwrap()
    }

    #[test]
    fn test_initial_counts() {
        let network = ba_network(0.5, 0.35);
        let counts = network.compartments().counts();

        assert_eq!(counts.infected, 50);
        assert_eq!(counts.recovered, 35);
        assert_eq!(counts.susceptible, 15);
        assert!(network.compartments().is_partition());
    }

    #[test]
    fn test_zero_fraction_seeds_one_infection() {
        let network = ba_network(0.0, 0.0);
        assert_eq!(network.compartments().counts().infected, 1);
        assert_eq!(network.compartments().counts().susceptible, 99);
    }

    #[test]
    fn test_half_counts_round_to_even() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let ten = Graph::from_edges(10, &(1..10).map(|i| (i - 1, i)).collect::<Vec<_>>());
        let twelve = Graph::from_edges(12, &(1..12).map(|i| (i - 1, i)).collect::<Vec<_>>());

        let down = ContactNetwork::new(&ten, 0.25, 0.25, &mut rng).unwrap();
        let up = ContactNetwork::new(&twelve, 0.125, 0.0, &mut rng).unwrap();

        // 2.5 -> 2 infected, 5.0 seeded
        assert_eq!(down.compartments().counts().infected, 2);
        assert_eq!(down.compartments().counts().recovered, 3);
        // 1.5 -> 2 infected
        assert_eq!(up.compartments().counts().infected, 2);
    }

    #[test]
    fn test_invalid_fractions() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let graph = Graph::from_edges(4, &[(0, 1), (1, 2), (2, 3)]);

        for (fi, fr) in [(0.7, 0.4), (-0.2, 0.0), (0.2, -0.1), (1.5, -0.6)] {
            let result = ContactNetwork::new(&graph, fi, fr, &mut rng);
            assert!(
                matches!(result, Err(ContagionError::InvalidParameter(_))),
                "({}, {}) should be rejected",
                fi,
                fr
            );
        }
    }

    #[test]
    fn test_empty_graph_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(ContactNetwork::new(&Graph::new(0), 0.0, 0.0, &mut rng).is_err());
    }

    #[test]
    fn test_reset_restores_snapshot() {
        let mut network = ba_network(0.5, 0.35);
        let before = network.compartments().clone();

        for flag in network.compartments_mut().infected.iter_mut() {
            *flag = false;
        }
        network.reset();

        assert_eq!(network.compartments(), &before);
        assert_eq!(network.compartments().counts().infected, 50);
    }

    #[test]
    fn test_protect_only_moves_susceptible() {
        let mut compartments = Compartments::all_susceptible(2);
        compartments.susceptible[1] = false;
        compartments.infected[1] = true;

        assert!(compartments.protect(0));
        assert!(!compartments.protect(1));
        assert!(compartments.recovered[0]);
        assert!(compartments.infected[1]);

        compartments.unprotect(0);
        assert!(compartments.susceptible[0]);
        assert!(compartments.is_partition());
    }

    #[test]
    fn test_immunize_dimension_mismatch_leaves_state() {
        let mut network = ba_network(0.25, 0.0);
        let before = network.compartments().clone();

        let result = network.immunize(vec![true; 99], ImmunizationOptions::vaccinate());

        assert!(matches!(result, Err(ContagionError::InvalidParameter(_))));
        assert!(network.immunization().is_none());
        assert_eq!(network.compartments(), &before);
    }

    #[test]
    fn test_immunize_keeps_marked_vector() {
        let mut network = ba_network(0.5, 0.35);
        let marked = network.compartments().infected.clone();

        network
            .immunize(marked.clone(), ImmunizationOptions::vaccinate().with_efficacy(0.7))
            .unwrap();

        let immunization = network.immunization().unwrap();
        assert_eq!(count(immunization.marked()), count(&marked));
        assert!(immunization.is_leaky());
    }

    #[test]
    fn test_random_walk_lengths() {
        let network = ba_network(0.5, 0.35);
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let walk: Vec<_> = network.random_walk(10, &mut rng).collect::<Result<_>>().unwrap();
        assert_eq!(walk.len(), 10);

        let degrees: Vec<_> = network
            .random_walk_degree_sequence(10, &mut rng)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(degrees.len(), 10);
        assert!(degrees.iter().all(|&d| d >= 1));
    }
}
