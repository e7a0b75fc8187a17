//! Property tests for engine invariants
//!
//! Random graphs, seeds and rates; every step must keep the compartments a
//! partition, and histories, overlays and walks must stay consistent.

use contagion::core::config::{ContagionConfig, TestRateSetting};
use contagion::core::types::{ContagionType, TestingType};
use contagion::engine::Contagion;
use contagion::network::generators::{barabasi_albert, erdos_renyi};
use contagion::network::ContactNetwork;
use contagion::policy::ImmunizationOptions;
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn contagion_type() -> impl Strategy<Value = ContagionType> {
    prop_oneof![Just(ContagionType::Sir), Just(ContagionType::Sis)]
}

fn testing() -> impl Strategy<Value = Option<(TestingType, f64)>> {
    prop_oneof![
        Just(None),
        (0.0..=1.0f64).prop_map(|rate| Some((TestingType::Random, rate))),
        (0.0..=1.0f64).prop_map(|rate| Some((TestingType::Contact, rate))),
    ]
}

fn ba_network(nodes: usize, seed: u64) -> ContactNetwork {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let graph = barabasi_albert(nodes, 2, &mut rng).unwrap();
    ContactNetwork::new(&graph, 0.1, 0.1, &mut rng).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_compartments_stay_a_partition(
        seed in any::<u64>(),
        nodes in 10usize..60,
        beta in 0.0..=1.0f64,
        gamma in 0.0..=1.0f64,
        kind in contagion_type(),
        tests in testing(),
        efficacy in 0.1..=1.0f64,
    ) {
        let mut network = ba_network(nodes, seed);
        let marked: Vec<bool> = (0..nodes).map(|v| v % 3 == 0).collect();
        network
            .immunize(marked, ImmunizationOptions::vaccinate().with_efficacy(efficacy).starting_after(2))
            .unwrap();

        let mut config = ContagionConfig::default()
            .with_rates(beta, gamma)
            .with_contagion_type(kind)
            .with_symptoms(0.5)
            .with_seed(seed);
        if let Some((testing_type, rate)) = tests {
            config = config.with_testing(testing_type, TestRateSetting::Scalar(rate));
        }
        let mut sim = Contagion::new(network, &config).unwrap();

        for _ in 0..15 {
            sim.step();
            let compartments = sim.network().compartments();
            prop_assert!(compartments.is_partition());

            let symptomatic = sim.symptomatic().unwrap();
            prop_assert!(symptomatic.iter().zip(&compartments.infected).all(|(&s, &i)| !s || i));
        }
    }

    #[test]
    fn prop_history_grows_by_one_per_step(
        seed in any::<u64>(),
        steps in 0usize..30,
        beta in 0.0..=1.0f64,
        gamma in 0.0..=1.0f64,
    ) {
        let config = ContagionConfig::default().with_rates(beta, gamma).with_seed(seed);
        let mut sim = Contagion::new(ba_network(40, seed), &config).unwrap();

        for _ in 0..steps {
            sim.step();
        }

        let history = sim.history().unwrap();
        prop_assert_eq!(history.len(), steps + 1);
        prop_assert_eq!(history.susceptible.len(), history.recovered.len());
        for i in 0..history.len() {
            prop_assert_eq!(history.susceptible[i] + history.infected[i] + history.recovered[i], 40);
        }
    }

    #[test]
    fn prop_reset_is_idempotent(seed in any::<u64>(), steps in 1usize..20) {
        let config = ContagionConfig::default()
            .with_rates(0.4, 0.2)
            .with_testing(TestingType::Contact, TestRateSetting::Scalar(0.2))
            .with_seed(seed);
        let mut sim = Contagion::new(ba_network(30, seed), &config).unwrap();
        let initial = sim.network().initial_compartments().clone();

        for _ in 0..steps {
            sim.step();
        }
        sim.reset();
        let once = (sim.network().compartments().clone(), sim.history().cloned());
        sim.reset();
        let twice = (sim.network().compartments().clone(), sim.history().cloned());

        prop_assert_eq!(&once.0, &initial);
        prop_assert_eq!(once, twice);
        prop_assert_eq!(sim.steps_elapsed(), 0);
    }

    #[test]
    fn prop_ever_tested_never_decreases(seed in any::<u64>(), rate in 0.0..=0.5f64) {
        let config = ContagionConfig::default()
            .with_rates(0.3, 0.1)
            .with_testing(TestingType::Random, TestRateSetting::List(vec![rate, 2.0 * rate]))
            .with_seed(seed);
        let mut sim = Contagion::new(ba_network(50, seed), &config).unwrap();

        let mut previous = vec![false; 50];
        for _ in 0..10 {
            sim.step();
            let ever = sim.ever_tested().unwrap();
            prop_assert!(previous.iter().zip(ever).all(|(&before, &now)| !before || now));
            previous = ever.to_vec();
        }
    }

    #[test]
    fn prop_random_walk_follows_edges(seed in any::<u64>(), length in 1usize..40) {
        let network = ba_network(50, seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x5eed);

        let walk: Vec<usize> = network
            .random_walk(length, &mut rng)
            .collect::<Result<_, _>>()
            .unwrap();

        prop_assert_eq!(walk.len(), length);
        for pair in walk.windows(2) {
            prop_assert!(network.adjacency().contains(pair[0], pair[1]));
        }
    }

    #[test]
    fn prop_mismatched_immunization_changes_nothing(seed in any::<u64>(), extra in 1usize..5) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let graph = erdos_renyi(30, 0.2, &mut rng).unwrap();
        let mut network = ContactNetwork::new(&graph, 0.2, 0.0, &mut rng).unwrap();
        let before = network.compartments().clone();

        let result = network.immunize(vec![true; 30 + extra], ImmunizationOptions::vaccinate());

        prop_assert!(result.is_err());
        prop_assert!(network.immunization().is_none());
        prop_assert_eq!(network.compartments(), &before);
    }
}
