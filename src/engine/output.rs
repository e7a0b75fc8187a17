//! Simulation output and serialization

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::types::Step;
use crate::engine::contagion::Termination;
use crate::engine::history::History;
use crate::network::population::CompartmentCounts;

/// Complete output of one scenario run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub history: History,
    pub statistics: SimulationStats,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationStats {
    pub nodes: usize,
    pub steps_elapsed: Step,
    pub peak_infected: usize,
    pub peak_infected_index: Step,
    pub final_counts: CompartmentCounts,
    pub termination: Termination,
    pub simulation_time_ms: u64,
}

impl SimulationOutput {
    pub fn new(
        history: History,
        nodes: usize,
        final_counts: CompartmentCounts,
        termination: Termination,
        elapsed: Duration,
    ) -> Self {
        let statistics = SimulationStats {
            nodes,
            steps_elapsed: history.len().saturating_sub(1),
            peak_infected: history.peak_infected().unwrap_or(0),
            peak_infected_index: history.peak_infected_index().unwrap_or(0),
            final_counts,
            termination,
            simulation_time_ms: elapsed.as_millis() as u64,
        };
        Self { history, statistics }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn summary(&self) -> String {
        let stats = &self.statistics;
        format!(
            "Simulated {} steps on {} nodes in {}ms ({:?})\n\
             Peak of {} infected at step {}\n\
             Final: {} susceptible, {} infected, {} recovered",
            stats.steps_elapsed,
            stats.nodes,
            stats.simulation_time_ms,
            stats.termination,
            stats.peak_infected,
            stats.peak_infected_index,
            stats.final_counts.susceptible,
            stats.final_counts.infected,
            stats.final_counts.recovered,
        )
    }
}
