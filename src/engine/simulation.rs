//! Scenario runner: graph, population, immunization and engine from one
//! `ScenarioConfig`

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::core::config::{GraphConfig, ImmunizationConfig, ScenarioConfig, SelectionStrategy};
use crate::core::error::{ContagionError, Result};
use crate::engine::contagion::Contagion;
use crate::engine::output::SimulationOutput;
use crate::network::generators::{barabasi_albert, erdos_renyi};
use crate::network::graph::{ContactGraph, Graph};
use crate::network::population::ContactNetwork;
use crate::policy::immunization::{
    centrality_selection, highest_degree_selection, lowest_degree_selection, random_selection,
    CentralityKind, ImmunizationMode, ImmunizationOptions, SelectionOrder,
};

/// Generate the scenario's contact graph
pub fn build_graph(config: &GraphConfig, rng: &mut ChaCha8Rng) -> Result<Graph> {
    match *config {
        GraphConfig::BarabasiAlbert { nodes, m } => barabasi_albert(nodes, m, rng),
        GraphConfig::ErdosRenyi { nodes, p } => erdos_renyi(nodes, p, rng),
    }
}

/// Pick immunization targets on `graph` and attach them to `network`
pub fn apply_immunization(
    network: &mut ContactNetwork,
    graph: &Graph,
    config: &ImmunizationConfig,
    rng: &mut ChaCha8Rng,
) -> Result<()> {
    let n = graph.node_count();
    let marked = match config.strategy {
        SelectionStrategy::Random => random_selection(n, config.count, rng),
        SelectionStrategy::HighestDegree => highest_degree_selection(graph, config.count),
        SelectionStrategy::LowestDegree => lowest_degree_selection(graph, config.count),
        SelectionStrategy::Centrality => {
            let kind: CentralityKind = config.centrality.parse()?;
            let order: SelectionOrder = config.order.parse()?;
            centrality_selection(graph, config.count, kind, order)?
        }
    };

    let options = match config.mode.parse::<ImmunizationMode>()? {
        ImmunizationMode::Vaccinate => ImmunizationOptions::vaccinate()
            .with_efficacy(config.efficacy)
            .starting_after(config.starts_after),
        ImmunizationMode::Monitor => ImmunizationOptions::monitor(config.monitor_threshold),
    };
    network.immunize(marked, options)
}

/// Run one scenario end to end.
///
/// Graph generation, seeding, target selection and the epidemic itself all
/// draw from one generator seeded with `config.contagion.seed`.
pub fn simulate(config: &ScenarioConfig) -> Result<SimulationOutput> {
    let start = Instant::now();
    let mut rng = ChaCha8Rng::seed_from_u64(config.contagion.seed);

    let graph = build_graph(&config.graph, &mut rng)?;
    let mut network = ContactNetwork::new(
        &graph,
        config.population.fraction_infected,
        config.population.fraction_recovered,
        &mut rng,
    )?;
    if let Some(immunization) = &config.immunization {
        apply_immunization(&mut network, &graph, immunization, &mut rng)?;
    }

    tracing::info!(
        "Starting scenario: {} nodes, {} edges, {}",
        graph.node_count(),
        graph.edge_count(),
        config.contagion.contagion_type
    );

    let monitored = network
        .immunization()
        .is_some_and(|i| i.mode() == ImmunizationMode::Monitor);
    let mut engine = Contagion::with_rng(network, &config.contagion, rng)?;
    let termination = if monitored {
        engine.run_until_monitor_threshold(config.max_steps)?
    } else {
        engine.run(config.max_steps)
    };

    let nodes = engine.network().n();
    let final_counts = engine.network().compartments().counts();
    let history = engine
        .history()
        .cloned()
        .ok_or_else(|| ContagionError::PreconditionViolation("run finished without a history".into()))?;

    let output = SimulationOutput::new(history, nodes, final_counts, termination, start.elapsed());
    tracing::info!(
        "Scenario finished after {} steps: {:?}",
        output.statistics.steps_elapsed,
        termination
    );
    Ok(output)
}
