//! Simulation configuration
//!
//! `ContagionConfig` carries the engine parameters and is validated eagerly
//! when an engine is built. `ScenarioConfig` bundles everything the CLI needs
//! for one run (graph generator, seeding, immunization, engine) and loads from
//! TOML.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ContagionError, Result};
use crate::core::types::{check_probability, ContagionType, TestingType};
use crate::policy::testing::TestRate;

/// Test rate as written in a config file: a scalar or a list of rates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestRateSetting {
    Scalar(f64),
    List(Vec<f64>),
}

impl Default for TestRateSetting {
    fn default() -> Self {
        Self::Scalar(0.0)
    }
}

impl TestRateSetting {
    /// Resolve into a typed rate, checking shape and range
    pub fn resolve(&self) -> Result<TestRate> {
        match self {
            Self::Scalar(rate) => TestRate::uniform(*rate),
            Self::List(rates) => TestRate::from_slice(rates),
        }
    }
}

/// Engine parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContagionConfig {
    /// SIR (permanent recovery) or SIS (recovered nodes become susceptible)
    pub contagion_type: ContagionType,

    /// Per-step transmission probability for a susceptible node with at
    /// least one infected neighbor
    pub beta: f64,

    /// Per-step recovery probability for an infected node
    pub gamma: f64,

    /// Per-step probability that an asymptomatic infected node turns
    /// symptomatic. Only used when symptoms are tracked.
    pub psi: f64,

    /// Record compartment sums after every step
    pub save_history: bool,

    /// Track the symptomatic overlay. Forced on when testing is enabled.
    pub track_symptomatic: bool,

    /// Administer tests every step
    pub implement_testing: bool,

    pub testing_type: TestingType,

    /// One rate for everyone, or `[asymptomatic, symptomatic]`
    pub test_rate: TestRateSetting,

    /// Seed for the engine's ChaCha8 generator
    pub seed: u64,
}

impl Default for ContagionConfig {
    fn default() -> Self {
        Self {
            contagion_type: ContagionType::Sir,
            beta: 1.0,
            gamma: 1.0,
            psi: 1.0,
            save_history: true,
            track_symptomatic: false,
            implement_testing: false,
            testing_type: TestingType::Random,
            test_rate: TestRateSetting::default(),
            seed: 12345,
        }
    }
}

impl ContagionConfig {
    pub fn with_rates(mut self, beta: f64, gamma: f64) -> Self {
        self.beta = beta;
        self.gamma = gamma;
        self
    }

    pub fn with_contagion_type(mut self, contagion_type: ContagionType) -> Self {
        self.contagion_type = contagion_type;
        self
    }

    pub fn with_symptoms(mut self, psi: f64) -> Self {
        self.track_symptomatic = true;
        self.psi = psi;
        self
    }

    pub fn with_testing(mut self, testing_type: TestingType, test_rate: TestRateSetting) -> Self {
        self.implement_testing = true;
        self.testing_type = testing_type;
        self.test_rate = test_rate;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn without_history(mut self) -> Self {
        self.save_history = false;
        self
    }

    /// Check every rate and resolve the test rate.
    ///
    /// Returns the resolved test rate when testing is enabled.
    pub fn validate(&self) -> Result<Option<TestRate>> {
        check_probability("beta", self.beta)?;
        check_probability("gamma", self.gamma)?;
        check_probability("psi", self.psi)?;

        if !self.implement_testing {
            return Ok(None);
        }

        let rate = self.test_rate.resolve()?;
        if self.testing_type == TestingType::Contact && !rate.is_uniform() {
            return Err(ContagionError::UnsupportedFeature(
                "contact tracing needs a single scalar test rate".into(),
            ));
        }
        Ok(Some(rate))
    }
}

/// Graph generator used by a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "generator", rename_all = "snake_case")]
pub enum GraphConfig {
    BarabasiAlbert { nodes: usize, m: usize },
    ErdosRenyi { nodes: usize, p: f64 },
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self::BarabasiAlbert { nodes: 100, m: 5 }
    }
}

/// Initial compartment fractions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    /// 0 means "exactly one seed infection"
    pub fraction_infected: f64,
    pub fraction_recovered: f64,
}

/// How immunization targets are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    #[default]
    Random,
    HighestDegree,
    LowestDegree,
    Centrality,
}

/// Immunization section of a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImmunizationConfig {
    pub strategy: SelectionStrategy,
    /// Number of nodes to select
    pub count: usize,
    /// `betweenness`, `eigenvector` or `closeness` (centrality strategy only)
    pub centrality: String,
    /// `highest` or `lowest` (centrality strategy only)
    pub order: String,
    /// `vaccinate` or `monitor`
    pub mode: String,
    pub starts_after: usize,
    pub efficacy: f64,
    pub monitor_threshold: usize,
}

impl Default for ImmunizationConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::Random,
            count: 1,
            centrality: "betweenness".into(),
            order: "highest".into(),
            mode: "vaccinate".into(),
            starts_after: 0,
            efficacy: 1.0,
            monitor_threshold: 1,
        }
    }
}

/// Everything needed for one simulation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub graph: GraphConfig,
    pub population: PopulationConfig,
    pub immunization: Option<ImmunizationConfig>,
    pub contagion: ContagionConfig,
    /// Step budget; unbounded when absent
    pub max_steps: Option<usize>,
}

impl ScenarioConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Load a scenario from a TOML file
pub fn load_scenario(path: &Path) -> Result<ScenarioConfig> {
    let content = fs::read_to_string(path)?;
    ScenarioConfig::from_toml_str(&content)
}
