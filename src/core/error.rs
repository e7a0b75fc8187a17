use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContagionError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Random walk reached isolated node {0}")]
    IsolatedNode(usize),

    #[error("Power iteration did not converge in {0} iterations")]
    NoConvergence(usize),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config error: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ContagionError>;
