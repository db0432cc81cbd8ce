use super::errors::ControlError;

/// Maps an observation to the next discrete action.
///
/// The driver hands over the observation as a plain slice of numbers and
/// coerces the returned integer into the environment's action type, so any
/// decision rule (hand-written, tabular, learned) can sit behind this trait
/// without the driver knowing about it.
pub trait Controller: Send + Sync {
    fn get_action(&self, obs: &[f64]) -> Result<i64, ControlError>;
}

impl<F> Controller for F
where
    F: Fn(&[f64]) -> Result<i64, ControlError> + Send + Sync,
{
    fn get_action(&self, obs: &[f64]) -> Result<i64, ControlError> {
        self(obs)
    }
}
