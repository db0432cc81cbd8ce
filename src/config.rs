use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::env::RenderMode;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Numerical scheme used to advance the cart-pole state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    #[default]
    Euler,
    SemiImplicitEuler,
}

/// What the driver applies as the first action of a new episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetAction {
    /// Keep the action that was in effect when the previous episode ended.
    #[default]
    CarryOver,
    /// Draw a fresh action from the action space.
    Resample,
}

/// Physical constants of the cart-pole system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartPoleConfig {
    pub gravity: f64,
    pub mass_cart: f64,
    pub mass_pole: f64,
    /// Half the pole length.
    pub length: f64,
    pub force_mag: f64,
    /// Seconds between state updates.
    pub tau: f64,
    pub theta_threshold_radians: f64,
    pub x_threshold: f64,
    pub integrator: Integrator,
    pub render_fps: u32,
}

impl Default for CartPoleConfig {
    fn default() -> Self {
        Self {
            gravity: 9.8,
            mass_cart: 1.0,
            mass_pole: 0.1,
            length: 0.5,
            force_mag: 10.0,
            tau: 0.02,
            theta_threshold_radians: 12.0 * 2.0 * std::f64::consts::PI / 360.0,
            x_threshold: 2.4,
            integrator: Integrator::Euler,
            render_fps: 50,
        }
    }
}

impl CartPoleConfig {
    pub fn total_mass(&self) -> f64 {
        self.mass_pole + self.mass_cart
    }

    pub fn pole_mass_length(&self) -> f64 {
        self.mass_pole * self.length
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("gravity", self.gravity),
            ("mass_cart", self.mass_cart),
            ("mass_pole", self.mass_pole),
            ("length", self.length),
            ("force_mag", self.force_mag),
            ("tau", self.tau),
            ("theta_threshold_radians", self.theta_threshold_radians),
            ("x_threshold", self.x_threshold),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be a positive finite number, got {value}"
                )));
            }
        }
        if self.render_fps == 0 {
            return Err(ConfigError::Invalid("render_fps must be non-zero".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub seed: Option<u64>,
    pub render_mode: RenderMode,
    /// Stop after this many steps in total. `None` runs until cancelled.
    pub max_steps: Option<u64>,
    /// Stop after this many finished episodes.
    pub max_episodes: Option<u64>,
    /// Step cap per episode; reaching it sets `truncated`.
    pub max_episode_steps: u64,
    pub reset_action: ResetAction,
    pub cartpole: CartPoleConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            seed: None,
            render_mode: RenderMode::Human,
            max_steps: None,
            max_episodes: None,
            max_episode_steps: 500,
            reset_action: ResetAction::CarryOver,
            cartpole: CartPoleConfig::default(),
        }
    }
}

impl DriverConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_episode_steps == 0 {
            return Err(ConfigError::Invalid(
                "max_episode_steps must be non-zero".into(),
            ));
        }
        self.cartpole.validate()
    }
}
