pub mod config;
pub mod control;
pub mod driver;
pub mod env;
#[cfg(feature = "python")]
mod python;

pub use config::{CartPoleConfig, ConfigError, DriverConfig, Integrator, ResetAction};
pub use control::{
    ControlError, Controller, PoleVelocityController, clamp_platform_velocity, platform_velocity,
};
pub use driver::{Driver, DriverError, RunSummary, StopReason, Tick, build_env};
pub use env::{CartPole, Env, EnvError, RenderMode, Space, TimeLimit};
