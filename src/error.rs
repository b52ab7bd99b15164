use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogTriageError {
    #[error("Pattern catalog error: {0}")]
    Patterns(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LogTriageError>;
