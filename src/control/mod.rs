mod errors;
mod platform_velocity;
mod pole_velocity;
mod traits;

pub use errors::ControlError;
pub use platform_velocity::{
    MAX_PLATFORM_VEL, PLATFORM_VEL, TARGET_ANGLE_DEG, clamp_platform_velocity, platform_velocity,
};
pub use pole_velocity::PoleVelocityController;
pub use traits::Controller;
