//! Testing policy
//!
//! Decides which nodes are tested each step. Random testing draws each node
//! independently; contact tracing drains a FIFO queue of neighbors of
//! earlier positives and tops up with random nodes.

use std::collections::VecDeque;

use ahash::AHashSet;
use rand::seq::IteratorRandom;
use rand::Rng;

use crate::core::error::{ContagionError, Result};
use crate::core::types::{check_probability, count, NodeId, TestingType};
use crate::network::adjacency::AdjacencyMatrix;

/// Test rate, resolved once at construction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestRate {
    /// Every node tested with the same probability
    Uniform(f64),
    /// Non-symptomatic, non-recovered nodes at one rate, symptomatic nodes
    /// at another. Recovered nodes are never tested.
    Stratified { asymptomatic: f64, symptomatic: f64 },
}

impl TestRate {
    pub fn uniform(rate: f64) -> Result<Self> {
        Ok(Self::Uniform(check_probability("test rate", rate)?))
    }

    pub fn stratified(asymptomatic: f64, symptomatic: f64) -> Result<Self> {
        Ok(Self::Stratified {
            asymptomatic: check_probability("asymptomatic test rate", asymptomatic)?,
            symptomatic: check_probability("symptomatic test rate", symptomatic)?,
        })
    }

    /// One value is a uniform rate, two are `[asymptomatic, symptomatic]`
    pub fn from_slice(rates: &[f64]) -> Result<Self> {
        match rates {
            [rate] => Self::uniform(*rate),
            [asymptomatic, symptomatic] => Self::stratified(*asymptomatic, *symptomatic),
            _ => Err(ContagionError::UnsupportedFeature(format!(
                "test rate with {} values",
                rates.len()
            ))),
        }
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, Self::Uniform(_))
    }
}

/// Population state the testing policy reads
#[derive(Debug, Clone, Copy)]
pub struct TestingView<'a> {
    pub adjacency: &'a AdjacencyMatrix,
    pub infected: &'a [bool],
    pub recovered: &'a [bool],
    pub symptomatic: &'a [bool],
    pub ever_tested: &'a [bool],
    /// Positive tests in the previous step
    pub previous_positives: usize,
}

/// Result of one round of testing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub tested: Vec<bool>,
    /// Tested this step and never before
    pub newly_ever_tested: Vec<bool>,
    /// Tested this step and currently infected
    pub positive: Vec<bool>,
}

#[derive(Debug, Clone)]
pub enum TestingPolicy {
    Random { rate: TestRate },
    ContactTracing { rate: f64, queue: VecDeque<NodeId> },
}

impl TestingPolicy {
    pub fn new(testing_type: TestingType, rate: TestRate) -> Result<Self> {
        match (testing_type, rate) {
            (TestingType::Random, rate) => Ok(Self::Random { rate }),
            (TestingType::Contact, TestRate::Uniform(rate)) => Ok(Self::ContactTracing {
                rate,
                queue: VecDeque::new(),
            }),
            (TestingType::Contact, TestRate::Stratified { .. }) => Err(ContagionError::UnsupportedFeature(
                "contact tracing needs a single scalar test rate".into(),
            )),
        }
    }

    pub fn testing_type(&self) -> TestingType {
        match self {
            Self::Random { .. } => TestingType::Random,
            Self::ContactTracing { .. } => TestingType::Contact,
        }
    }

    /// Nodes waiting for a contact-tracing test, front first
    pub fn contact_queue(&self) -> Option<&VecDeque<NodeId>> {
        match self {
            Self::ContactTracing { queue, .. } => Some(queue),
            Self::Random { .. } => None,
        }
    }

    pub fn clear_queue(&mut self) {
        if let Self::ContactTracing { queue, .. } = self {
            queue.clear();
        }
    }

    /// Pick this step's tests, work out the positives and, under contact
    /// tracing, queue the neighbors of every positive node
    pub fn administer<R: Rng + ?Sized>(&mut self, view: TestingView<'_>, rng: &mut R) -> TestOutcome {
        let tested = match self {
            Self::Random { rate } => random_tests(*rate, &view, rng),
            Self::ContactTracing { rate, queue } => contact_tests(*rate, queue, &view, rng),
        };

        let newly_ever_tested = tested
            .iter()
            .zip(view.ever_tested)
            .map(|(&t, &ever)| t && !ever)
            .collect();
        let positive: Vec<bool> = tested
            .iter()
            .zip(view.infected)
            .map(|(&t, &inf)| t && inf)
            .collect();

        if let Self::ContactTracing { queue, .. } = self {
            enqueue_contacts(queue, view.adjacency, &positive);
        }

        TestOutcome {
            tested,
            newly_ever_tested,
            positive,
        }
    }
}

fn contact_tests<R: Rng + ?Sized>(
    rate: f64,
    queue: &mut VecDeque<NodeId>,
    view: &TestingView<'_>,
    rng: &mut R,
) -> Vec<bool> {
    if view.previous_positives == 0 && queue.is_empty() {
        tracing::debug!("No positives and empty contact queue, testing at random");
        return random_tests(TestRate::Uniform(rate), view, rng);
    }

    let n = view.infected.len();
    let capacity = (rate * n as f64).floor() as usize;

    let take = capacity.min(queue.len());
    let batch: Vec<NodeId> = queue.drain(..take).collect();

    let mut tested = vec![false; n];
    for &node in &batch {
        tested[node] = true;
    }

    if batch.len() < capacity {
        let queued: AHashSet<NodeId> = batch.iter().copied().collect();
        let extra = (0..n)
            .filter(|v| !queued.contains(v))
            .choose_multiple(rng, capacity - batch.len());
        for node in extra {
            tested[node] = true;
        }
    }

    tested
}

/// Append every node with at least one positive neighbor, in node order
fn enqueue_contacts(queue: &mut VecDeque<NodeId>, adjacency: &AdjacencyMatrix, positive: &[bool]) {
    if count(positive) == 0 {
        return;
    }
    let exposure = adjacency.mul_vec(positive);
    queue.extend(
        exposure
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(v, _)| v),
    );
}

fn random_tests<R: Rng + ?Sized>(rate: TestRate, view: &TestingView<'_>, rng: &mut R) -> Vec<bool> {
    let n = view.infected.len();
    match rate {
        TestRate::Uniform(p) => (0..n).map(|_| rng.gen::<f64>() < p).collect(),
        TestRate::Stratified {
            asymptomatic,
            symptomatic,
        } => (0..n)
            .map(|v| {
                let draw = rng.gen::<f64>();
                if view.symptomatic[v] {
                    draw < symptomatic
                } else if !view.recovered[v] {
                    draw < asymptomatic
                } else {
                    false
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::graph::Graph;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    struct Fixture {
        adjacency: AdjacencyMatrix,
        infected: Vec<bool>,
        recovered: Vec<bool>,
        symptomatic: Vec<bool>,
        ever_tested: Vec<bool>,
    }

    impl Fixture {
        /// Path 0-1-2-3-4-5 with node 2 infected
        fn path() -> Self {
            let edges: Vec<_> = (1..6).map(|i| (i - 1, i)).collect();
            let mut infected = vec![false; 6];
            infected[2] = true;
            Self {
                adjacency: AdjacencyMatrix::from_graph(&Graph::from_edges(6, &edges)).unwrap(),
                infected,
                recovered: vec![false; 6],
                symptomatic: vec![false; 6],
                ever_tested: vec![false; 6],
            }
        }

        fn view(&self, previous_positives: usize) -> TestingView<'_> {
            TestingView {
                adjacency: &self.adjacency,
                infected: &self.infected,
                recovered: &self.recovered,
                symptomatic: &self.symptomatic,
                ever_tested: &self.ever_tested,
                previous_positives,
            }
        }
    }

    fn with_queue(policy: TestingPolicy, nodes: &[NodeId]) -> TestingPolicy {
        match policy {
            TestingPolicy::ContactTracing { rate, mut queue } => {
                queue.extend(nodes);
                TestingPolicy::ContactTracing { rate, queue }
            }
            other => other,
        }
    }

    fn queued(policy: &TestingPolicy) -> Vec<NodeId> {
        policy
            .contact_queue()
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_rate_shapes() {
        assert_eq!(TestRate::from_slice(&[0.3]).unwrap(), TestRate::Uniform(0.3));
        assert!(!TestRate::from_slice(&[0.1, 0.9]).unwrap().is_uniform());
        assert!(matches!(
            TestRate::from_slice(&[]),
            Err(ContagionError::UnsupportedFeature(_))
        ));
        assert!(matches!(
            TestRate::from_slice(&[0.1, 0.2, 0.3]),
            Err(ContagionError::UnsupportedFeature(_))
        ));
        assert!(matches!(
            TestRate::stratified(0.1, 2.0),
            Err(ContagionError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_uniform_rate_one_tests_everyone() {
        let fixture = Fixture::path();
        let mut policy = TestingPolicy::new(TestingType::Random, TestRate::Uniform(1.0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = policy.administer(fixture.view(0), &mut rng);

        assert!(outcome.tested.iter().all(|&t| t));
        assert_eq!(outcome.positive, fixture.infected);
        assert_eq!(outcome.newly_ever_tested, outcome.tested);
    }

    #[test]
    fn test_newly_ever_tested_excludes_previous_tests() {
        let mut fixture = Fixture::path();
        fixture.ever_tested[0] = true;
        let mut policy = TestingPolicy::new(TestingType::Random, TestRate::Uniform(1.0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = policy.administer(fixture.view(0), &mut rng);

        assert!(outcome.tested[0]);
        assert!(!outcome.newly_ever_tested[0]);
        assert_eq!(count(&outcome.newly_ever_tested), 5);
    }

    #[test]
    fn test_stratified_never_tests_recovered() {
        let mut fixture = Fixture::path();
        fixture.recovered[4] = true;
        fixture.symptomatic[2] = true;
        let rate = TestRate::stratified(1.0, 1.0).unwrap();
        let mut policy = TestingPolicy::new(TestingType::Random, rate).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = policy.administer(fixture.view(0), &mut rng);

        assert!(!outcome.tested[4]);
        assert!(outcome.tested[2]);
        assert_eq!(count(&outcome.tested), 5);
    }

    #[test]
    fn test_stratified_symptomatic_only() {
        let mut fixture = Fixture::path();
        fixture.symptomatic[2] = true;
        let rate = TestRate::stratified(0.0, 1.0).unwrap();
        let mut policy = TestingPolicy::new(TestingType::Random, rate).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = policy.administer(fixture.view(0), &mut rng);

        assert_eq!(count(&outcome.tested), 1);
        assert!(outcome.positive[2]);
    }

    #[test]
    fn test_contact_rejects_stratified_rate() {
        let rate = TestRate::stratified(0.1, 0.5).unwrap();
        assert!(matches!(
            TestingPolicy::new(TestingType::Contact, rate),
            Err(ContagionError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_contact_queues_neighbors_of_positives() {
        let fixture = Fixture::path();
        // Rate 1 on an empty queue falls back to testing everyone
        let mut policy = TestingPolicy::new(TestingType::Contact, TestRate::Uniform(1.0)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = policy.administer(fixture.view(0), &mut rng);

        assert!(outcome.positive[2]);
        assert_eq!(queued(&policy), vec![1, 3]);
    }

    #[test]
    fn test_contact_drains_queue_front_first() {
        let mut fixture = Fixture::path();
        fixture.infected = vec![false; 6];
        // Capacity floor(0.34 * 6) = 2
        let mut policy = with_queue(TestingPolicy::new(TestingType::Contact, TestRate::Uniform(0.34)).unwrap(), &[5, 0, 3]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let outcome = policy.administer(fixture.view(1), &mut rng);

        assert!(outcome.tested[5] && outcome.tested[0]);
        assert_eq!(count(&outcome.tested), 2);
        assert_eq!(queued(&policy), vec![3]);
    }

    #[test]
    fn test_contact_tops_up_short_queue() {
        let mut fixture = Fixture::path();
        fixture.infected = vec![false; 6];
        // Capacity floor(0.5 * 6) = 3, queue holds one node
        let mut policy = with_queue(TestingPolicy::new(TestingType::Contact, TestRate::Uniform(0.5)).unwrap(), &[4]);
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let outcome = policy.administer(fixture.view(0), &mut rng);

        assert!(outcome.tested[4]);
        assert_eq!(count(&outcome.tested), 3);
        assert!(queued(&policy).is_empty());
    }

    #[test]
    fn test_contact_queue_keeps_duplicates() {
        let mut fixture = Fixture::path();
        fixture.infected = vec![false, true, true, true, false, false];
        // Capacity floor(0.2 * 6) = 1
        let mut policy = with_queue(TestingPolicy::new(TestingType::Contact, TestRate::Uniform(0.2)).unwrap(), &[2]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        for _ in 0..3 {
            policy.administer(fixture.view(1), &mut rng);
        }

        // Tested 2, then 1, then 3; node 2 is queued by both 1 and 3
        assert_eq!(queued(&policy), vec![0, 2, 2, 4]);
    }
}
