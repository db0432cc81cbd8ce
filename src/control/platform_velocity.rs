//! Bang-bang velocity rule for a pendulum hinged on a sliding platform.
//!
//! Angles are in degrees, measured so that 180 (or -180) is the balanced
//! position. The platform is driven toward the side the pendulum leans to.

/// Angle, in degrees, at which the pendulum is balanced.
pub const TARGET_ANGLE_DEG: f64 = 180.0;

/// Speed commanded while the pendulum is off target.
pub const PLATFORM_VEL: f64 = 50.0;

/// Largest platform speed the rig accepts, in either direction.
pub const MAX_PLATFORM_VEL: f64 = 1000.0;

/// Platform velocity for pendulum angle `theta_deg`.
///
/// `(-180, 0]` drives left, `(0, 180)` drives right, anything else
/// (including exactly +/-180 and NaN) holds still.
pub fn platform_velocity(theta_deg: f64) -> f64 {
    if -TARGET_ANGLE_DEG < theta_deg && theta_deg <= 0.0 {
        -PLATFORM_VEL
    } else if 0.0 < theta_deg && theta_deg < TARGET_ANGLE_DEG {
        PLATFORM_VEL
    } else {
        0.0
    }
}

/// Caps `vel` to `MAX_PLATFORM_VEL` in magnitude, keeping its sign.
pub fn clamp_platform_velocity(vel: f64) -> f64 {
    if vel.abs() > MAX_PLATFORM_VEL {
        MAX_PLATFORM_VEL.copysign(vel)
    } else {
        vel
    }
}
