use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Simulation cancelled after {completed_weeks} of {total_weeks} weeks")]
    Cancelled { completed_weeks: u64, total_weeks: u64 },

    #[error("Preference count mismatch: expected {expected} preferences, got {actual}")]
    PreferenceCountMismatch { expected: usize, actual: usize },

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Cannot sample preferences from an empty sample")]
    EmptyPreferenceSample,

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;
