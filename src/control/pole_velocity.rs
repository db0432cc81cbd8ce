use super::errors::ControlError;
use super::traits::Controller;

const OBS_LEN: usize = 4;

/// Pushes the cart toward the side the pole is swinging to.
///
/// Returns 1 (push right) while the pole's angular velocity is positive and
/// 0 (push left) otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoleVelocityController;

impl PoleVelocityController {
    pub fn new() -> Self {
        Self
    }
}

impl Controller for PoleVelocityController {
    fn get_action(&self, obs: &[f64]) -> Result<i64, ControlError> {
        let &[_cart_pos, _cart_vel, _pole_angle, pole_vel] = obs else {
            return Err(ControlError::InvalidObservation {
                expected: OBS_LEN,
                actual: obs.len(),
            });
        };

        if pole_vel > 0.0 { Ok(1) } else { Ok(0) }
    }
}
