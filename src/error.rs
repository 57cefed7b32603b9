use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid preference weights: {0}")]
    InvalidPreference(String),

    #[error("Malformed route: {0}")]
    MalformedRoute(String),

    #[error("Corrupt profile record: {0}")]
    CorruptProfile(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
