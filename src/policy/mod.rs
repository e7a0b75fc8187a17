//! Intervention policies
//!
//! Immunization picks and treats target nodes once per network; testing
//! picks nodes to test every step.

pub mod immunization;
pub mod testing;

pub use immunization::{
    centrality_selection, highest_degree_selection, lowest_degree_selection, random_selection,
    CentralityKind, Immunization, ImmunizationMode, ImmunizationOptions, SelectionOrder,
};
pub use testing::{TestOutcome, TestRate, TestingPolicy, TestingView};
