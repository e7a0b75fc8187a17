//! Epidemic engine, per-step history and scenario runner

pub mod contagion;
pub mod history;
pub mod output;
pub mod simulation;

pub use contagion::{Contagion, StepSummary, Termination};
pub use history::History;
pub use output::{SimulationOutput, SimulationStats};
pub use simulation::simulate;
