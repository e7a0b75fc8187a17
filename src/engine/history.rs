//! Per-step compartment history

use serde::{Deserialize, Serialize};

use crate::core::types::Step;
use crate::network::population::CompartmentCounts;

/// Compartment sums at one step, including the optional overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistorySample {
    pub counts: CompartmentCounts,
    pub symptomatic: Option<usize>,
    pub ever_tested: Option<usize>,
    pub new_positive_tests: Option<usize>,
}

/// Append-only count sequences, one entry per step (index 0 = starting
/// state). Overlay sequences exist only when the overlay is tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub susceptible: Vec<usize>,
    pub infected: Vec<usize>,
    pub recovered: Vec<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptomatic: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ever_tested: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_positive_tests: Option<Vec<usize>>,
}

impl History {
    /// Start a history whose first entry is `sample`
    pub fn start(sample: HistorySample) -> Self {
        let mut history = Self {
            symptomatic: sample.symptomatic.map(|_| Vec::new()),
            ever_tested: sample.ever_tested.map(|_| Vec::new()),
            new_positive_tests: sample.new_positive_tests.map(|_| Vec::new()),
            ..Self::default()
        };
        history.record(sample);
        history
    }

    pub fn record(&mut self, sample: HistorySample) {
        self.susceptible.push(sample.counts.susceptible);
        self.infected.push(sample.counts.infected);
        self.recovered.push(sample.counts.recovered);

        push_overlay(&mut self.symptomatic, sample.symptomatic);
        push_overlay(&mut self.ever_tested, sample.ever_tested);
        push_overlay(&mut self.new_positive_tests, sample.new_positive_tests);
    }

    /// Number of recorded entries
    pub fn len(&self) -> usize {
        self.infected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infected.is_empty()
    }

    pub fn last_infected(&self) -> Option<usize> {
        self.infected.last().copied()
    }

    pub fn peak_infected(&self) -> Option<usize> {
        self.infected.iter().copied().max()
    }

    /// Index of the first entry holding the infected peak
    pub fn peak_infected_index(&self) -> Option<Step> {
        let peak = self.peak_infected()?;
        self.infected.iter().position(|&i| i == peak)
    }

    /// Infected but not symptomatic, per step
    pub fn asymptomatic_infected(&self) -> Option<Vec<usize>> {
        let symptomatic = self.symptomatic.as_ref()?;
        Some(
            self.infected
                .iter()
                .zip(symptomatic)
                .map(|(&i, &s)| i.saturating_sub(s))
                .collect(),
        )
    }
}

fn push_overlay(sequence: &mut Option<Vec<usize>>, value: Option<usize>) {
    if let (Some(sequence), Some(value)) = (sequence.as_mut(), value) {
        sequence.push(value);
    }
}
