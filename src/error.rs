use thiserror::Error;

#[derive(Error, Debug)]
pub enum PKError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),

    #[error("Invalid dosing configuration: {0}")]
    InvalidDosing(String),

    #[error("Parameter validation error: {0}")]
    Validation(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(#[from] chrono::ParseError),
}

pub type PKResult<T> = Result<T, PKError>;
