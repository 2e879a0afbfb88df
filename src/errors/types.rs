use thiserror::Error;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Backend call failed: {0}")]
    Backend(String),

    #[error("Network error: {0}")]
    Network(String),

    /// The findings server reported that it could not process the artifact.
    #[error("Processing error: {0}")]
    Processing(String),

    /// Polling deadline exceeded. The build is "not completed", not failed.
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
