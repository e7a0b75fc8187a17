//! Epidemic engine
//!
//! Each step runs in a fixed order:
//! 1. Due vaccination side effects (full efficacy once, leaky every step)
//! 2. New transmissions among susceptible nodes with an infected neighbor
//! 3. New recoveries among infected nodes
//! 4. New symptomatic nodes (when tracked)
//! 5. Testing and contact-queue refill (when enabled)
//! 6. Commit all deltas at once
//! 7. Append compartment sums to the history
//!
//! Steps 2-5 read the state left by step 1 and never write to it; only the
//! commit mutates compartments.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::core::config::ContagionConfig;
use crate::core::error::{ContagionError, Result};
use crate::core::types::{count, fires, ContagionType, Step};
use crate::engine::history::{History, HistorySample};
use crate::network::adjacency::AdjacencyMatrix;
use crate::network::population::{Compartments, ContactNetwork};
use crate::policy::immunization::{sample_protected, Immunization};
use crate::policy::testing::{TestOutcome, TestingPolicy, TestingView};

/// Early stopping only kicks in once the history holds more entries than this
pub const EARLY_STOP_MIN_HISTORY: usize = 5;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Termination {
    /// No infected nodes left
    Extinguished,
    /// Every node infected
    Saturated,
    StepBudgetExhausted,
    MonitorThresholdReached,
}

/// Changes computed for one step, applied together by `commit`
#[derive(Debug, Clone, PartialEq, Eq)]
struct StepDelta {
    new_transmissions: Vec<bool>,
    new_recoveries: Vec<bool>,
    new_symptomatic: Option<Vec<bool>>,
    tests: Option<TestOutcome>,
}

/// Event totals of one committed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StepSummary {
    pub step: Step,
    pub new_transmissions: usize,
    pub new_recoveries: usize,
    pub new_symptomatic: usize,
    pub new_positive_tests: usize,
}

/// Testing overlays and the policy that drives them
#[derive(Debug, Clone)]
struct TestingState {
    policy: TestingPolicy,
    ever_tested: Vec<bool>,
    new_positive_tests: Vec<bool>,
}

/// Susceptible nodes with an infected neighbor, each transmitting with
/// probability `beta`
pub fn new_transmissions<R: Rng + ?Sized>(
    adjacency: &AdjacencyMatrix,
    compartments: &Compartments,
    beta: f64,
    rng: &mut R,
) -> Vec<bool> {
    let exposure = adjacency.mul_vec(&compartments.infected);
    exposure
        .iter()
        .enumerate()
        .map(|(v, &infected_neighbors)| {
            compartments.susceptible[v]
                && infected_neighbors > 0
                && fires(rng.gen::<f64>(), beta)
        })
        .collect()
}

/// Infected nodes recovering with probability `gamma`
pub fn new_recoveries<R: Rng + ?Sized>(infected: &[bool], gamma: f64, rng: &mut R) -> Vec<bool> {
    infected
        .iter()
        .map(|&inf| inf && fires(rng.gen::<f64>(), gamma))
        .collect()
}

/// Asymptomatic infected nodes turning symptomatic with probability `psi`
pub fn new_symptomatic<R: Rng + ?Sized>(
    infected: &[bool],
    symptomatic: &[bool],
    psi: f64,
    rng: &mut R,
) -> Vec<bool> {
    infected
        .iter()
        .zip(symptomatic)
        .map(|(&inf, &sy)| inf && !sy && fires(rng.gen::<f64>(), psi))
        .collect()
}

/// Discrete-time compartmental simulation on one contact network.
///
/// The engine owns the network, the overlays, the histories and the random
/// generator, so independent replications never share state.
#[derive(Debug, Clone)]
pub struct Contagion {
    network: ContactNetwork,
    contagion_type: ContagionType,
    beta: f64,
    gamma: f64,
    psi: f64,
    symptomatic: Option<Vec<bool>>,
    testing: Option<TestingState>,
    /// Nodes moved to Recovered by this step's leaky vaccination sample
    protected: Vec<bool>,
    history: Option<History>,
    steps: Step,
    rng: ChaCha8Rng,
}

impl Contagion {
    /// Build an engine seeded from `config.seed`
    pub fn new(network: ContactNetwork, config: &ContagionConfig) -> Result<Self> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(network, config, rng)
    }

    /// Build an engine drawing from `rng`
    pub fn with_rng(network: ContactNetwork, config: &ContagionConfig, rng: ChaCha8Rng) -> Result<Self> {
        let test_rate = config.validate()?;
        let n = network.n();

        let testing = match test_rate {
            Some(rate) => Some(TestingState {
                policy: TestingPolicy::new(config.testing_type, rate)?,
                ever_tested: vec![false; n],
                new_positive_tests: vec![false; n],
            }),
            None => None,
        };
        let track_symptomatic = config.track_symptomatic || testing.is_some();

        let mut engine = Self {
            network,
            contagion_type: config.contagion_type,
            beta: config.beta,
            gamma: config.gamma,
            psi: config.psi,
            symptomatic: track_symptomatic.then(|| vec![false; n]),
            testing,
            protected: vec![false; n],
            history: None,
            steps: 0,
            rng,
        };
        if config.save_history {
            engine.ensure_history();
        }

        tracing::debug!(
            "Contagion engine: {} beta={} gamma={} symptoms={} testing={:?}",
            engine.contagion_type,
            engine.beta,
            engine.gamma,
            track_symptomatic,
            engine.testing.as_ref().map(|t| t.policy.testing_type())
        );

        Ok(engine)
    }

    pub fn network(&self) -> &ContactNetwork {
        &self.network
    }

    /// Immunization changes go through the network; the engine picks them
    /// up on the next step
    pub fn network_mut(&mut self) -> &mut ContactNetwork {
        &mut self.network
    }

    pub fn history(&self) -> Option<&History> {
        self.history.as_ref()
    }

    pub fn steps_elapsed(&self) -> Step {
        self.steps
    }

    pub fn contagion_type(&self) -> ContagionType {
        self.contagion_type
    }

    pub fn symptomatic(&self) -> Option<&[bool]> {
        self.symptomatic.as_deref()
    }

    pub fn ever_tested(&self) -> Option<&[bool]> {
        self.testing.as_ref().map(|t| t.ever_tested.as_slice())
    }

    pub fn new_positive_tests(&self) -> Option<&[bool]> {
        self.testing.as_ref().map(|t| t.new_positive_tests.as_slice())
    }

    /// Contact-tracing queue, front first
    pub fn contact_queue(&self) -> Option<Vec<usize>> {
        let queue = self.testing.as_ref()?.policy.contact_queue()?;
        Some(queue.iter().copied().collect())
    }

    /// Restore the network snapshot and clear overlays, queue, history and
    /// step counter
    pub fn reset(&mut self) {
        let n = self.network.n();
        self.network.reset();
        self.protected = vec![false; n];
        if let Some(symptomatic) = self.symptomatic.as_mut() {
            symptomatic.fill(false);
        }
        if let Some(testing) = self.testing.as_mut() {
            testing.policy.clear_queue();
            testing.ever_tested.fill(false);
            testing.new_positive_tests.fill(false);
        }
        self.steps = 0;
        if self.history.is_some() {
            self.history = Some(History::start(self.sample()));
        }
    }

    fn sample(&self) -> HistorySample {
        HistorySample {
            counts: self.network.compartments().counts(),
            symptomatic: self.symptomatic.as_deref().map(count),
            ever_tested: self.testing.as_ref().map(|t| count(&t.ever_tested)),
            new_positive_tests: self.testing.as_ref().map(|t| count(&t.new_positive_tests)),
        }
    }

    /// Start recording from the current state if not already recording
    pub fn ensure_history(&mut self) {
        if self.history.is_none() {
            self.history = Some(History::start(self.sample()));
        }
    }

    /// Vaccination due at the current step. Runs before any transmission is
    /// computed, so a node whose leaky protection lapses is susceptible
    /// again for this very step.
    fn apply_immunization(&mut self) {
        // Last step's leaky sample never outlives the step, whatever policy
        // is attached now
        self.release_protected();

        let Some(Immunization::Vaccinate {
            marked,
            starts_after,
            efficacy,
        }) = self.network.immunization()
        else {
            return;
        };
        let (starts_after, efficacy) = (*starts_after, *efficacy);

        if efficacy >= 1.0 {
            if self.steps != starts_after {
                return;
            }
            let targets: Vec<usize> = (0..marked.len()).filter(|&v| marked[v]).collect();
            let compartments = self.network.compartments_mut();
            let moved = targets.into_iter().filter(|&v| compartments.protect(v)).count();
            tracing::debug!("Step {}: vaccinated {} nodes", self.steps, moved);
            return;
        }

        if self.steps < starts_after {
            return;
        }
        let sampled = sample_protected(marked, efficacy, &mut self.rng);

        let compartments = self.network.compartments_mut();
        for (v, &chosen) in sampled.iter().enumerate() {
            if chosen && compartments.protect(v) {
                self.protected[v] = true;
            }
        }
        tracing::trace!(
            "Step {}: leaky vaccination protects {} nodes",
            self.steps,
            count(&self.protected)
        );
    }

    /// Return the current leaky sample to Susceptible (nodes still Recovered)
    fn release_protected(&mut self) {
        let compartments = self.network.compartments_mut();
        for (v, was) in self.protected.iter_mut().enumerate() {
            if *was {
                compartments.unprotect(v);
                *was = false;
            }
        }
    }

    /// Compute every change for this step from the current state
    fn compute_delta(&mut self) -> StepDelta {
        let compartments = self.network.compartments();
        let adjacency = self.network.adjacency();

        let new_transmissions = new_transmissions(adjacency, compartments, self.beta, &mut self.rng);
        let new_recoveries = new_recoveries(&compartments.infected, self.gamma, &mut self.rng);
        let new_symptomatic = self
            .symptomatic
            .as_deref()
            .map(|sy| new_symptomatic(&compartments.infected, sy, self.psi, &mut self.rng));

        let tests = match (self.testing.as_mut(), self.symptomatic.as_deref()) {
            (Some(testing), Some(symptomatic)) => {
                let view = TestingView {
                    adjacency,
                    infected: &compartments.infected,
                    recovered: &compartments.recovered,
                    symptomatic,
                    ever_tested: &testing.ever_tested,
                    previous_positives: count(&testing.new_positive_tests),
                };
                Some(testing.policy.administer(view, &mut self.rng))
            }
            _ => None,
        };

        StepDelta {
            new_transmissions,
            new_recoveries,
            new_symptomatic,
            tests,
        }
    }

    /// Apply a step's deltas to compartments and overlays
    fn commit(&mut self, delta: &StepDelta) {
        let contagion_type = self.contagion_type;
        let compartments = self.network.compartments_mut();

        for v in 0..compartments.len() {
            if delta.new_transmissions[v] {
                compartments.susceptible[v] = false;
                compartments.infected[v] = true;
            }
            if delta.new_recoveries[v] {
                compartments.infected[v] = false;
                match contagion_type {
                    ContagionType::Sir => compartments.recovered[v] = true,
                    ContagionType::Sis => compartments.susceptible[v] = true,
                }
            }
        }

        if let (Some(symptomatic), Some(new_symptomatic)) =
            (self.symptomatic.as_mut(), delta.new_symptomatic.as_ref())
        {
            for (v, sy) in symptomatic.iter_mut().enumerate() {
                *sy = (*sy || new_symptomatic[v]) && compartments.infected[v];
            }
        }

        if let (Some(testing), Some(tests)) = (self.testing.as_mut(), delta.tests.as_ref()) {
            for (ever, &newly) in testing.ever_tested.iter_mut().zip(&tests.newly_ever_tested) {
                *ever |= newly;
            }
            testing.new_positive_tests.clone_from(&tests.positive);
        }
    }

    /// Advance the simulation by one step
    pub fn step(&mut self) -> StepSummary {
        self.apply_immunization();
        let delta = self.compute_delta();
        self.commit(&delta);
        self.steps += 1;

        if self.history.is_some() {
            let sample = self.sample();
            if let Some(history) = self.history.as_mut() {
                history.record(sample);
            }
        }

        let summary = StepSummary {
            step: self.steps,
            new_transmissions: count(&delta.new_transmissions),
            new_recoveries: count(&delta.new_recoveries),
            new_symptomatic: delta.new_symptomatic.as_deref().map_or(0, count),
            new_positive_tests: delta.tests.as_ref().map_or(0, |t| count(&t.positive)),
        };
        tracing::trace!("{:?}", summary);
        summary
    }

    /// Extinction or saturation, once enough history has accumulated
    fn resolved(&self) -> Option<Termination> {
        let history = self.history.as_ref()?;
        if history.len() <= EARLY_STOP_MIN_HISTORY {
            return None;
        }
        match history.last_infected()? {
            0 => Some(Termination::Extinguished),
            infected if infected == self.network.n() => Some(Termination::Saturated),
            _ => None,
        }
    }

    /// Step until the budget runs out or the epidemic is clearly over.
    ///
    /// `None` means no step budget. Starts recording history if it was off.
    pub fn run(&mut self, max_steps: Option<usize>) -> Termination {
        self.ensure_history();
        let mut taken = 0;
        let termination = loop {
            if let Some(reason) = self.resolved() {
                break reason;
            }
            if max_steps.is_some_and(|budget| taken >= budget) {
                break Termination::StepBudgetExhausted;
            }
            self.step();
            taken += 1;
        };

        tracing::debug!("Run stopped after {} steps: {:?}", self.steps, termination);
        termination
    }

    /// Run and return the largest infected count in the history
    pub fn run_get_max_infected(&mut self, max_steps: Option<usize>) -> usize {
        self.run(max_steps);
        self.history
            .as_ref()
            .and_then(History::peak_infected)
            .unwrap_or(0)
    }

    /// Run and return the first history index holding the infected peak
    pub fn run_get_max_infected_index(&mut self, max_steps: Option<usize>) -> Step {
        self.run(max_steps);
        self.history
            .as_ref()
            .and_then(History::peak_infected_index)
            .unwrap_or(0)
    }

    /// Step until the monitor threshold is reached, the early-stop check
    /// fires, or the budget runs out.
    ///
    /// Monitored nodes already infected at the start count toward the
    /// threshold.
    pub fn run_until_monitor_threshold(&mut self, max_steps: Option<usize>) -> Result<Termination> {
        let Some(Immunization::Monitor { marked, threshold }) = self.network.immunization() else {
            return Err(ContagionError::PreconditionViolation(
                "monitor run needs a monitor immunization".into(),
            ));
        };
        let (marked, threshold) = (marked.clone(), *threshold);
        self.ensure_history();

        let mut ever_infected = vec![false; marked.len()];
        let mut taken = 0;
        let termination = loop {
            let infected = &self.network.compartments().infected;
            for (v, ever) in ever_infected.iter_mut().enumerate() {
                *ever |= marked[v] && infected[v];
            }

            if count(&ever_infected) >= threshold {
                break Termination::MonitorThresholdReached;
            }
            if let Some(reason) = self.resolved() {
                break reason;
            }
            if max_steps.is_some_and(|budget| taken >= budget) {
                break Termination::StepBudgetExhausted;
            }
            self.step();
            taken += 1;
        };

        tracing::debug!(
            "Monitor run stopped after {} steps with {} monitored infections: {:?}",
            self.steps,
            count(&ever_infected),
            termination
        );
        Ok(termination)
    }

    /// Run until the monitor threshold is reached or the epidemic is over;
    /// returns the number of elapsed steps
    pub fn run_monitor_notification(&mut self) -> Result<Step> {
        self.run_monitor_notification_within(None)
    }

    /// `run_monitor_notification` with an optional step budget
    pub fn run_monitor_notification_within(&mut self, max_steps: Option<usize>) -> Result<Step> {
        self.run_until_monitor_threshold(max_steps)?;
        Ok(self.steps)
    }
}
