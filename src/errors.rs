use thiserror::Error;

/// Error type that captures common wizard failures.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
