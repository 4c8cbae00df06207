use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("task title must not be empty")]
    EmptyTitle,

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
