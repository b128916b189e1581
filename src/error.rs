use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid intensity transform: {0}")]
    InvalidTransform(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Random number generation error")]
    Random,

    #[error("Simulation cancelled")]
    Cancelled,
}

pub type ChResult<T> = Result<T, ChError>;
