//! Core type definitions used throughout the codebase

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{ContagionError, Result};

/// Index of a node in the contact network (`0..n`)
pub type NodeId = usize;

/// Simulation step counter
pub type Step = usize;

/// Which compartment recovered nodes return to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContagionType {
    /// Recovery is permanent
    #[default]
    Sir,
    /// Recovered nodes are susceptible again
    Sis,
}

impl FromStr for ContagionType {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sir" => Ok(Self::Sir),
            "sis" => Ok(Self::Sis),
            other => Err(ContagionError::InvalidParameter(format!(
                "unknown contagion type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ContagionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sir => write!(f, "sir"),
            Self::Sis => write!(f, "sis"),
        }
    }
}

/// How nodes are picked for testing each step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestingType {
    #[default]
    Random,
    /// Neighbors of positive nodes are tested first
    Contact,
}

impl FromStr for TestingType {
    type Err = ContagionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "contact" => Ok(Self::Contact),
            other => Err(ContagionError::InvalidParameter(format!(
                "unknown testing type '{}'",
                other
            ))),
        }
    }
}

/// Check that `value` is a probability in `[0, 1]`
pub fn check_probability(name: &str, value: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ContagionError::InvalidParameter(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        )))
    }
}

/// Event draw against a rate: fires iff `draw` lies in `(0, rate]`.
///
/// A draw of exactly zero never fires.
#[inline]
pub fn fires(draw: f64, rate: f64) -> bool {
    draw > 0.0 && draw <= rate
}

/// Number of set flags in a 0/1 vector
#[inline]
pub fn count(flags: &[bool]) -> usize {
    flags.iter().filter(|&&f| f).count()
}
