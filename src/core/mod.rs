pub mod config;
pub mod error;
pub mod types;

pub use config::{ContagionConfig, ScenarioConfig, TestRateSetting};
pub use error::{ContagionError, Result};
pub use types::{ContagionType, NodeId, Step, TestingType};
