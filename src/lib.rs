//! Contagion - epidemic spread on contact networks
//!
//! SIR/SIS dynamics on a fixed undirected graph, with optional vaccination
//! or sentinel monitoring, symptom tracking, and random or contact-tracing
//! testing.

pub mod core;
pub mod engine;
pub mod network;
pub mod policy;

pub use crate::core::{ContagionConfig, ContagionError, ContagionType, Result, ScenarioConfig, TestingType};
pub use crate::engine::{Contagion, History, SimulationOutput, Termination};
pub use crate::network::{ContactGraph, ContactNetwork, Graph};
