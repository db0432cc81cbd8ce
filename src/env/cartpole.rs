//! Classic cart-pole balancing task.
//!
//! A pole is hinged to a cart moving along a frictionless track. Each step
//! pushes the cart left (action 0) or right (action 1) with a fixed force.
//! The episode terminates once the pole tilts past the angle threshold or the
//! cart leaves the track. Every step up to and including the terminating one
//! yields a reward of 1.
//!
//! Observation: `[cart_pos, cart_vel, pole_angle, pole_angular_vel]`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::errors::EnvError;
use super::render::{HumanRenderer, RenderMode, ascii_frame};
use super::spaces::{BoxSpace, Discrete, Space};
use super::traits::Env;
use super::types::Step;
use crate::config::{CartPoleConfig, ConfigError, Integrator};

pub const OBS_DIM: usize = 4;

pub type Observation = [f64; OBS_DIM];

// Half-width of the uniform initial-state draw.
const RESET_BOUND: f64 = 0.05;

pub struct CartPole {
    cfg: CartPoleConfig,
    state: Option<Observation>,
    steps_beyond_terminated: Option<u64>,
    rng: StdRng,
    action_space: Discrete,
    observation_space: BoxSpace<OBS_DIM>,
    render_mode: RenderMode,
    renderer: HumanRenderer,
}

impl CartPole {
    pub fn new(cfg: CartPoleConfig, render_mode: RenderMode) -> Result<Self, EnvError> {
        cfg.validate().map_err(|e: ConfigError| EnvError::Other(Box::new(e)))?;

        let high = [
            cfg.x_threshold * 2.0,
            f64::MAX,
            cfg.theta_threshold_radians * 2.0,
            f64::MAX,
        ];

        Ok(Self {
            observation_space: BoxSpace::symmetric(high)?,
            action_space: Discrete::new(2)?,
            cfg,
            state: None,
            steps_beyond_terminated: None,
            rng: StdRng::from_entropy(),
            render_mode,
            renderer: HumanRenderer::new(),
        })
    }

    /// Seed the initial-state draw and the action sampler.
    pub fn seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.action_space.seed(seed);
        self.observation_space.seed(seed);
    }

    pub fn state(&self) -> Option<&Observation> {
        self.state.as_ref()
    }

    pub fn config(&self) -> &CartPoleConfig {
        &self.cfg
    }

    pub fn observation_space(&self) -> &BoxSpace<OBS_DIM> {
        &self.observation_space
    }

    pub fn render_mode(&self) -> RenderMode {
        self.render_mode
    }

    fn is_terminal(&self, state: &Observation) -> bool {
        let [x, _, theta, _] = *state;
        x < -self.cfg.x_threshold
            || x > self.cfg.x_threshold
            || theta < -self.cfg.theta_threshold_radians
            || theta > self.cfg.theta_threshold_radians
    }

    fn integrate(&self, state: Observation, action: usize) -> Observation {
        let [mut x, mut x_dot, mut theta, mut theta_dot] = state;
        let cfg = &self.cfg;

        let force = if action == 1 { cfg.force_mag } else { -cfg.force_mag };
        let cos_theta = theta.cos();
        let sin_theta = theta.sin();

        let temp = (force + cfg.pole_mass_length() * theta_dot * theta_dot * sin_theta)
            / cfg.total_mass();
        let theta_acc = (cfg.gravity * sin_theta - cos_theta * temp)
            / (cfg.length
                * (4.0 / 3.0 - cfg.mass_pole * cos_theta * cos_theta / cfg.total_mass()));
        let x_acc = temp - cfg.pole_mass_length() * theta_acc * cos_theta / cfg.total_mass();

        match cfg.integrator {
            Integrator::Euler => {
                x += cfg.tau * x_dot;
                x_dot += cfg.tau * x_acc;
                theta += cfg.tau * theta_dot;
                theta_dot += cfg.tau * theta_acc;
            }
            Integrator::SemiImplicitEuler => {
                x_dot += cfg.tau * x_acc;
                x += cfg.tau * x_dot;
                theta_dot += cfg.tau * theta_acc;
                theta += cfg.tau * theta_dot;
            }
        }

        [x, x_dot, theta, theta_dot]
    }

    fn draw_if_human(&mut self) -> Result<(), EnvError> {
        if self.render_mode == RenderMode::Human {
            self.render()?;
        }
        Ok(())
    }
}

impl Env for CartPole {
    type Obs = Observation;
    type Act = usize;
    type Info = Value;
    type ActSpace = Discrete;

    fn reset(&mut self) -> Result<(Self::Obs, Self::Info), EnvError> {
        let mut state = [0.0; OBS_DIM];
        for v in state.iter_mut() {
            *v = self.rng.gen_range(-RESET_BOUND..RESET_BOUND);
        }
        self.state = Some(state);
        self.steps_beyond_terminated = None;

        self.draw_if_human()?;
        Ok((state, Value::Object(Map::new())))
    }

    fn step(&mut self, act: Self::Act) -> Result<Step<Self::Obs, Self::Info>, EnvError> {
        if !self.action_space.contains(&act) {
            return Err(EnvError::InvalidAction(format!(
                "{act} is not in Discrete({})",
                self.action_space.n()
            )));
        }
        let state = self.state.ok_or(EnvError::NotReset)?;

        let next = self.integrate(state, act);
        self.state = Some(next);
        let terminated = self.is_terminal(&next);

        let reward = if !terminated {
            1.0
        } else if self.steps_beyond_terminated.is_none() {
            // Pole just fell.
            self.steps_beyond_terminated = Some(0);
            1.0
        } else {
            let beyond = self.steps_beyond_terminated.map_or(1, |n| n + 1);
            if beyond == 1 {
                warn!(
                    "step() called on a terminated episode; call reset() first. \
                     Further steps are undefined behavior."
                );
            }
            self.steps_beyond_terminated = Some(beyond);
            0.0
        };

        debug!(action = act, ?next, terminated, reward, "cartpole step");

        self.draw_if_human()?;
        Ok(Step {
            obs: next,
            reward,
            terminated,
            truncated: false,
            info: Value::Object(Map::new()),
        })
    }

    fn action_space(&self) -> &Self::ActSpace {
        &self.action_space
    }

    fn action_space_mut(&mut self) -> &mut Self::ActSpace {
        &mut self.action_space
    }

    fn render(&mut self) -> Result<Option<String>, EnvError> {
        let Some([x, _, theta, _]) = self.state else {
            return Ok(None);
        };
        let frame = ascii_frame(x, theta, self.cfg.x_threshold);

        match self.render_mode {
            RenderMode::Human => {
                self.renderer.draw(&frame)?;
                Ok(None)
            }
            RenderMode::Ansi => Ok(Some(frame)),
            RenderMode::None => Ok(None),
        }
    }

    fn render_fps(&self) -> Option<u32> {
        match self.render_mode {
            RenderMode::Human => Some(self.cfg.render_fps),
            _ => None,
        }
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.renderer.finish()?;
        Ok(())
    }
}
