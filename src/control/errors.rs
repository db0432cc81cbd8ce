use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("invalid observation length: expected {expected}, got {actual}")]
    InvalidObservation { expected: usize, actual: usize },

    #[error("Control error")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}
