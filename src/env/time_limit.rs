use serde_json::Value;

use super::errors::EnvError;
use super::traits::Env;
use super::types::Step;

/// Truncates episodes of the wrapped environment after a fixed step count.
pub struct TimeLimit<E> {
    env: E,
    max_episode_steps: u64,
    elapsed_steps: Option<u64>,
}

impl<E: Env<Info = Value>> TimeLimit<E> {
    pub fn new(env: E, max_episode_steps: u64) -> Self {
        Self {
            env,
            max_episode_steps,
            elapsed_steps: None,
        }
    }

    pub fn inner(&self) -> &E {
        &self.env
    }

    pub fn max_episode_steps(&self) -> u64 {
        self.max_episode_steps
    }

    /// Steps taken since the last reset, or `None` before the first reset.
    pub fn elapsed_steps(&self) -> Option<u64> {
        self.elapsed_steps
    }
}

impl<E: Env<Info = Value>> Env for TimeLimit<E> {
    type Obs = E::Obs;
    type Act = E::Act;
    type Info = Value;
    type ActSpace = E::ActSpace;

    fn reset(&mut self) -> Result<(Self::Obs, Self::Info), EnvError> {
        let out = self.env.reset()?;
        self.elapsed_steps = Some(0);
        Ok(out)
    }

    fn step(&mut self, act: Self::Act) -> Result<Step<Self::Obs, Self::Info>, EnvError> {
        let elapsed = self.elapsed_steps.ok_or(EnvError::NotReset)? + 1;
        let mut step = self.env.step(act)?;
        self.elapsed_steps = Some(elapsed);

        if elapsed >= self.max_episode_steps {
            step.truncated = true;
        }
        if let Value::Object(map) = &mut step.info {
            map.insert("elapsed_steps".to_string(), Value::from(elapsed));
        }
        Ok(step)
    }

    fn action_space(&self) -> &Self::ActSpace {
        self.env.action_space()
    }

    fn action_space_mut(&mut self) -> &mut Self::ActSpace {
        self.env.action_space_mut()
    }

    fn render(&mut self) -> Result<Option<String>, EnvError> {
        self.env.render()
    }

    fn render_fps(&self) -> Option<u32> {
        self.env.render_fps()
    }

    fn close(&mut self) -> Result<(), EnvError> {
        self.env.close()
    }
}
