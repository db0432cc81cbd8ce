use thiserror::Error;

use crate::control::ControlError;
use crate::env::EnvError;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("controller returned {0}, which is not a valid action")]
    InvalidAction(i64),

    #[error("observation has {actual} values, expected {expected}")]
    ObservationShape { expected: usize, actual: usize },

    #[error("driver was not started")]
    NotStarted,
}
